pub mod client;
pub mod description;
pub mod detail;
pub mod enrichment;
pub mod error;
pub mod locale;
pub mod normalize;
pub mod raw;
pub mod token;

mod retry;
#[cfg(test)]
mod test_support;

pub use client::{CatalogClient, CatalogSettings};
pub use description::DescriptionEnricher;
pub use detail::artist_detail;
pub use enrichment::Enrichment;
pub use error::CatalogError;
pub use locale::Locale;
pub use token::{CachedToken, Credentials, TokenCache};
