//! Content-derived hash ids used as campaign idempotency keys

use sha2::{Digest, Sha256};

use shared::CampaignRequest;

use crate::core::country::normalize_country;

const SEPARATOR: &str = "\u{1f}";
const HASH_ID_LEN: usize = 16;

/// Stable id for a logical row: same topic, country, query and media set
/// always give the same id, regardless of media order, country spelling or
/// run time.
pub fn derive_hash_id(topic: &str, country: &str, query: &str, media_urls: &[String]) -> String {
    let mut urls: Vec<&str> = media_urls.iter().map(|url| url.trim()).collect();
    urls.sort_unstable();

    let topic = topic.trim().to_lowercase();
    let country = normalize_country(country).unwrap_or_else(|| country.trim().to_uppercase());
    let mut parts: Vec<&str> = vec![topic.as_str(), country.as_str(), query.trim()];
    parts.extend(urls);

    let digest = Sha256::digest(parts.join(SEPARATOR).as_bytes());
    let hex = format!("{digest:x}");
    hex[..HASH_ID_LEN].to_string()
}

/// The row's explicit hash id, or one derived from its content
pub fn hash_id_for(request: &CampaignRequest) -> String {
    match request.hash_id.as_deref().map(str::trim) {
        Some(explicit) if !explicit.is_empty() => explicit.to_string(),
        _ => derive_hash_id(&request.topic, &request.country, &request.query, &request.media_urls),
    }
}
