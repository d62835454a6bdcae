//! Payload and free-text hints for the programmatic entry point

use serde::{Deserialize, Serialize};
use tracing::debug;

use shared::RawRow;

use crate::core::registry::DEFAULT_PLATFORM;
use crate::core::validator::columns;

/// A single campaign request as sent by an assistant bridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignPayload {
    pub topic: String,
    pub country: String,
    pub title: String,
    pub body: String,
    pub query: String,
    /// `|` or whitespace separated media URLs
    #[serde(alias = "media_urls")]
    pub media_path: String,
    pub platform: Option<String>,
    pub device_targeting: Option<String>,
    pub special_ad_category: Option<String>,
    pub hash_id: Option<String>,
}

/// Targeting hints, e.g. `platform: fb api 2, device: ios_only`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetingHints {
    pub platform: Option<String>,
    pub device: Option<String>,
    pub special_ad_category: Option<String>,
    pub hash_id: Option<String>,
}

impl TargetingHints {
    /// Parse comma separated `key: value` pairs; unknown keys are ignored
    pub fn parse(text: &str) -> Self {
        let mut hints = Self::default();

        for pair in text.split(',') {
            let Some((key, value)) = pair.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            let key = key.trim().to_lowercase().replace([' ', '-'], "_");
            match key.as_str() {
                "platform" => hints.platform = Some(value.to_string()),
                "device" | "device_targeting" | "devices" => hints.device = Some(value.to_lowercase()),
                "special_ad_category" | "category" => hints.special_ad_category = Some(value.to_string()),
                "hash_id" | "hash" => hints.hash_id = Some(value.to_string()),
                other => debug!("Ignoring unknown hint '{}'", other),
            }
        }
        hints
    }
}

impl CampaignPayload {
    /// Sheet-shaped row for the validator; hints win over payload fields
    pub fn to_row(&self, hints: &TargetingHints) -> RawRow {
        let pick = |hint: &Option<String>, field: &Option<String>| -> String {
            hint.clone().or_else(|| field.clone()).unwrap_or_default()
        };

        let platform = pick(&hints.platform, &self.platform);
        let platform = if platform.trim().is_empty() {
            DEFAULT_PLATFORM.to_string()
        } else {
            platform
        };

        RawRow::from_pairs(
            0,
            [
                (columns::UPLOAD, "yes".to_string()),
                (columns::PLATFORM, platform),
                (columns::TOPIC, self.topic.clone()),
                (columns::COUNTRY, self.country.clone()),
                (columns::DEVICE_TARGETING, pick(&hints.device, &self.device_targeting)),
                (columns::TITLE, self.title.clone()),
                (columns::BODY, self.body.clone()),
                (columns::QUERY, self.query.clone()),
                (columns::MEDIA_PATH, self.media_path.clone()),
                (columns::SPECIAL_AD_CATEGORY, pick(&hints.special_ad_category, &self.special_ad_category)),
                (columns::HASH_ID, pick(&hints.hash_id, &self.hash_id)),
            ],
        )
    }
}
