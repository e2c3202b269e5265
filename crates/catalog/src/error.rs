#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Token exchange failed, or the catalog rejected the bearer token.
    UpstreamAuth(String),
    NotFound(String),
    Upstream { status: u16, message: String },
    /// Connect failure or timeout before any response arrived.
    Unavailable(String),
    MalformedPayload(String),
}

impl CatalogError {
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::UpstreamAuth(_) => "upstream_auth",
            CatalogError::NotFound(_) => "not_found",
            CatalogError::Upstream { .. } => "upstream",
            CatalogError::Unavailable(_) => "unavailable",
            CatalogError::MalformedPayload(_) => "malformed_payload",
        }
    }
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::UpstreamAuth(message) => write!(f, "upstream auth error: {}", message),
            CatalogError::NotFound(resource) => write!(f, "not found: {}", resource),
            CatalogError::Upstream { status, message } => {
                write!(f, "upstream http {}: {}", status, message)
            }
            CatalogError::Unavailable(message) => write!(f, "upstream unavailable: {}", message),
            CatalogError::MalformedPayload(message) => {
                write!(f, "malformed upstream payload: {}", message)
            }
        }
    }
}

impl std::error::Error for CatalogError {}
