use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Pt,
    Es,
}

impl Locale {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Locale::En),
            "pt" => Some(Locale::Pt),
            "es" => Some(Locale::Es),
            _ => None,
        }
    }

    /// Absent or unsupported codes fall back to English.
    pub fn from_query(value: Option<&str>) -> Self {
        value.and_then(Locale::parse).unwrap_or_default()
    }

    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Pt => "pt",
            Locale::Es => "es",
        }
    }

    /// Locales to try in order: the preferred one, then English.
    pub fn fallback_chain(self) -> Vec<Locale> {
        let mut chain = vec![self];
        if self != Locale::En {
            chain.push(Locale::En);
        }
        chain
    }
}
