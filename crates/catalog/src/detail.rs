use common::ArtistSummary;

use crate::client::CatalogClient;
use crate::description::DescriptionEnricher;
use crate::error::CatalogError;
use crate::locale::Locale;
use crate::normalize::artist_summary;

/// Artist lookup plus biography and similar artists.
///
/// The catalog lookup is required. The two biography-provider calls run
/// concurrently once the artist name is known and only ever degrade to
/// `null` / `[]`.
pub async fn artist_detail(
    catalog: &CatalogClient,
    enricher: &DescriptionEnricher,
    artist_id: &str,
    locale: Locale,
) -> Result<ArtistSummary, CatalogError> {
    let raw = catalog.artist(artist_id).await?;
    let (description, related) = tokio::join!(
        enricher.description(&raw.name, locale),
        enricher.similar_artists(&raw.name),
    );
    Ok(artist_summary(
        raw,
        description.into_option(),
        related.unwrap_or_default(),
    ))
}
