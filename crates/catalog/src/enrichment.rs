/// Outcome of an optional lookup that must never abort the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Enrichment<T> {
    Ready(T),
    /// The provider answered but had nothing for us.
    Absent,
    /// The provider failed; the reason is kept for logs and tests.
    Degraded(String),
}

impl<T> Enrichment<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Enrichment::Ready(value) => Some(value),
            Enrichment::Absent | Enrichment::Degraded(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Enrichment::Degraded(_))
    }
}

impl<T: Default> Enrichment<T> {
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}
