//! Application configuration
//!
//! Settings are read from a YAML file (`defaults.yaml` by default) and then
//! overlaid with environment variables, which take precedence. A `.env` file
//! in the working directory is loaded first by the binary, so values placed
//! there behave exactly like exported variables.
//!
//! ## Environment overrides
//! - `FB_APP_ID`, `FB_APP_SECRET`, `FB_ACCESS_TOKEN`, `FB_AD_ACCOUNT_ID`,
//!   `FB_PAGE_ID`, `FB_PIXEL_ID`, `FB_API_VERSION`, `FB_PBIA`: the default
//!   `fb api` platform used when no platforms file exists
//! - `GOOGLE_SPREADSHEET_ID`, `GOOGLE_SHEETS_ACCESS_TOKEN`
//! - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_FROM_NUMBER`,
//!   `TWILIO_TO_NUMBER`

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

use crate::core::registry::PlatformEntry;
use crate::error::{UploaderError, UploaderResult};

/// Environment lookup, injectable for tests
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Lookup backed by the process environment
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CampaignDefaults {
    pub objective: String,
    pub buying_type: String,
    pub status: String,
}

impl Default for CampaignDefaults {
    fn default() -> Self {
        Self {
            objective: "OUTCOME_SALES".to_string(),
            buying_type: "AUCTION".to_string(),
            status: "ACTIVE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdSetDefaults {
    pub daily_budget: u64,
    pub billing_event: String,
    pub bid_strategy: String,
    pub optimization_goal: String,
    /// Copied into every ad set; `pixel_id` is filled from the platform
    pub promoted_object: Option<Value>,
    /// Extra targeting fields merged under the per-row geo and device fields
    pub targeting: Map<String, Value>,
}

impl Default for AdSetDefaults {
    fn default() -> Self {
        Self {
            daily_budget: 1000,
            billing_event: "IMPRESSIONS".to_string(),
            bid_strategy: "LOWEST_COST_WITHOUT_CAP".to_string(),
            optimization_goal: "OFFSITE_CONVERSIONS".to_string(),
            promoted_object: None,
            targeting: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdDefaults {
    pub status: String,
    pub call_to_action_type: String,
}

impl Default for AdDefaults {
    fn default() -> Self {
        Self {
            status: "ACTIVE".to_string(),
            call_to_action_type: "LEARN_MORE".to_string(),
        }
    }
}

/// Landing page template, e.g. `https://lp.example/s?token=T&channel=YYY&oxd=1&q=`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LandingPageConfig {
    pub template: String,
    /// Channel prefix; defaults to the template's channel with trailing digits removed
    pub base_channel: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub access_token: String,
    pub base_url: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            access_token: String::new(),
            base_url: "https://sheets.googleapis.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
    pub base_url: Option<String>,
}

impl TwilioConfig {
    pub fn is_complete(&self) -> bool {
        !self.account_sid.is_empty()
            && !self.auth_token.is_empty()
            && !self.from_number.is_empty()
            && !self.to_number.is_empty()
    }
}

/// Retry, timeout and concurrency knobs for platform calls
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubmissionSettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Rows in flight per platform label (one quota pool each)
    pub per_platform_concurrency: usize,
    /// Rows in flight across all platforms
    pub max_concurrent_rows: usize,
    /// Read creatives back once to check the identity override echo
    pub verify_identity: bool,
    pub graph_base_url: String,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            request_timeout_secs: 30,
            per_platform_concurrency: 2,
            max_concurrent_rows: 6,
            verify_identity: false,
            graph_base_url: "https://graph.facebook.com".to_string(),
        }
    }
}

impl SubmissionSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThumbnailSettings {
    pub ffmpeg_path: String,
    pub static_fallback_url: String,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            static_fallback_url: String::new(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Credentials for the implicit `fb api` platform
    pub facebook: PlatformEntry,
    pub campaign: CampaignDefaults,
    pub ad_set: AdSetDefaults,
    pub ad: AdDefaults,
    pub landing_page: LandingPageConfig,
    pub google_sheets: SheetsConfig,
    pub twilio: Option<TwilioConfig>,
    pub submission: SubmissionSettings,
    pub thumbnails: ThumbnailSettings,
}

impl AppConfig {
    /// Load YAML from `path`, overlay the process environment, and validate
    pub fn load(path: &Path) -> UploaderResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            UploaderError::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides(&process_env);
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> UploaderResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Environment values take precedence over file values
    pub fn apply_env_overrides(&mut self, lookup: EnvLookup<'_>) {
        let facebook = &mut self.facebook;
        let overrides: [(&str, &mut Option<String>); 8] = [
            ("FB_APP_ID", &mut facebook.app_id),
            ("FB_APP_SECRET", &mut facebook.app_secret),
            ("FB_ACCESS_TOKEN", &mut facebook.access_token),
            ("FB_AD_ACCOUNT_ID", &mut facebook.ad_account_id),
            ("FB_PAGE_ID", &mut facebook.page_id),
            ("FB_PIXEL_ID", &mut facebook.pixel_id),
            ("FB_API_VERSION", &mut facebook.api_version),
            ("FB_PBIA", &mut facebook.pbia),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key) {
                *slot = Some(value);
            }
        }

        if let Some(value) = lookup("GOOGLE_SPREADSHEET_ID") {
            self.google_sheets.spreadsheet_id = value;
        }
        if let Some(value) = lookup("GOOGLE_SHEETS_ACCESS_TOKEN") {
            self.google_sheets.access_token = value;
        }

        let twilio_keys = [
            "TWILIO_ACCOUNT_SID",
            "TWILIO_AUTH_TOKEN",
            "TWILIO_FROM_NUMBER",
            "TWILIO_TO_NUMBER",
        ];
        if twilio_keys.iter().any(|key| lookup(key).is_some()) {
            let twilio = self.twilio.get_or_insert_with(TwilioConfig::default);
            let slots: [&mut String; 4] = [
                &mut twilio.account_sid,
                &mut twilio.auth_token,
                &mut twilio.from_number,
                &mut twilio.to_number,
            ];
            for (key, slot) in twilio_keys.iter().zip(slots) {
                if let Some(value) = lookup(key) {
                    *slot = value;
                }
            }
        }
    }

    /// Fail fast on settings every run needs
    pub fn validate(&self) -> UploaderResult<()> {
        let mut problems = Vec::new();

        if self.landing_page.template.trim().is_empty() {
            problems.push("landing_page.template is not configured".to_string());
        } else if url::Url::parse(&self.landing_page.template).is_err() {
            problems.push(format!(
                "landing_page.template is not a valid URL: {}",
                self.landing_page.template
            ));
        }

        if url::Url::parse(&self.thumbnails.static_fallback_url).is_err() {
            problems.push("thumbnails.static_fallback_url must be a valid URL".to_string());
        }

        if self.submission.max_attempts == 0 {
            problems.push("submission.max_attempts must be at least 1".to_string());
        }
        if self.submission.per_platform_concurrency == 0 || self.submission.max_concurrent_rows == 0 {
            problems.push("submission concurrency limits must be at least 1".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(UploaderError::config(problems.join("; ")))
        }
    }

    /// Spreadsheet settings are only needed for sheet runs
    pub fn validate_sheets(&self) -> UploaderResult<()> {
        if self.google_sheets.spreadsheet_id.is_empty() || self.google_sheets.access_token.is_empty() {
            return Err(UploaderError::config(
                "google_sheets.spreadsheet_id and access token (GOOGLE_SHEETS_ACCESS_TOKEN) are required",
            ));
        }
        Ok(())
    }
}
