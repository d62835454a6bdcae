//! Row validation: raw sheet cells to a typed `CampaignRequest`

use url::Url;

use shared::{CampaignRequest, DeviceTargeting, RawRow};

use crate::error::ValidationError;

pub mod columns {
    pub const UPLOAD: &str = "Upload";
    pub const PLATFORM: &str = "Platform";
    pub const TOPIC: &str = "Topic";
    pub const COUNTRY: &str = "Country";
    pub const DEVICE_TARGETING: &str = "Device Targeting";
    pub const TITLE: &str = "Title";
    pub const BODY: &str = "Body";
    pub const QUERY: &str = "Query";
    pub const MEDIA_PATH: &str = "Media Path";
    pub const SPECIAL_AD_CATEGORY: &str = "Special Ad Category";
    pub const HASH_ID: &str = "Hash ID";
    pub const STATUS: &str = "Status";
    pub const ERROR: &str = "Error";
}

/// True when the row is marked for upload
pub fn is_marked_for_upload(row: &RawRow) -> bool {
    row.get(columns::UPLOAD).eq_ignore_ascii_case("yes")
}

/// Split a media cell on whitespace and `|`
pub fn split_media_urls(value: &str) -> Vec<String> {
    value
        .split(|c: char| c.is_whitespace() || c == '|')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_well_formed_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Validate a row.
///
/// `Ok(None)` means the row is not marked for upload and should be skipped.
/// Errors carry every problem found, not just the first.
pub fn validate_row(row: &RawRow) -> Result<Option<CampaignRequest>, ValidationError> {
    if !is_marked_for_upload(row) {
        return Ok(None);
    }

    let mut problems = ValidationError::default();

    let mut required = |column: &str| -> String {
        let value = row.get(column);
        if value.is_empty() {
            problems.push(column, "is required");
        }
        value.to_string()
    };

    let platform = required(columns::PLATFORM);
    let topic = required(columns::TOPIC);
    let country = required(columns::COUNTRY);
    let title = required(columns::TITLE);
    let body = required(columns::BODY);
    let query = required(columns::QUERY);

    let media_urls = split_media_urls(row.get(columns::MEDIA_PATH));
    if media_urls.is_empty() {
        problems.push(columns::MEDIA_PATH, "at least one media URL is required");
    }
    for url in media_urls.iter().filter(|url| !is_well_formed_url(url)) {
        problems.push(columns::MEDIA_PATH, format!("not a valid http(s) URL: {url}"));
    }

    let device_targeting = match row.get(columns::DEVICE_TARGETING).parse::<DeviceTargeting>() {
        Ok(mode) => mode,
        Err(_) => {
            problems.push(
                columns::DEVICE_TARGETING,
                format!(
                    "'{}' is not one of all, android_only, ios_only",
                    row.get(columns::DEVICE_TARGETING)
                ),
            );
            DeviceTargeting::All
        }
    };

    if !problems.is_empty() {
        return Err(problems);
    }

    let optional = |column: &str| Some(row.get(column).to_string()).filter(|v| !v.is_empty());

    Ok(Some(CampaignRequest {
        topic,
        country,
        device_targeting,
        title,
        body,
        query,
        media_urls,
        special_ad_category: optional(columns::SPECIAL_AD_CATEGORY),
        hash_id: optional(columns::HASH_ID),
        platform,
    }))
}
