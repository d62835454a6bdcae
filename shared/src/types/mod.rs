//! Core types used throughout the uploader

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::SharedError;

pub mod outcome;

pub use outcome::*;

/// Spreadsheet row as read from the sheet, keyed by normalized column name.
///
/// Column names are trimmed and lower-cased on insert so lookups are
/// case-insensitive (`Media Path`, `media path` and ` MEDIA PATH ` are the
/// same column).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    number: usize,
    cells: BTreeMap<String, String>,
}

impl RawRow {
    /// Create an empty row for the given 1-based sheet row number
    pub fn new(number: usize) -> Self {
        Self {
            number,
            cells: BTreeMap::new(),
        }
    }

    /// Build a row from column/value pairs
    pub fn from_pairs<I, K, V>(number: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut row = Self::new(number);
        for (column, value) in pairs {
            row.insert(column.as_ref(), value);
        }
        row
    }

    pub fn insert(&mut self, column: &str, value: impl Into<String>) {
        self.cells.insert(Self::normalize_key(column), value.into());
    }

    /// Trimmed cell value, empty when the column is missing
    pub fn get(&self, column: &str) -> &str {
        self.cells
            .get(&Self::normalize_key(column))
            .map(|v| v.trim())
            .unwrap_or("")
    }

    pub fn number(&self) -> usize {
        self.number
    }

    fn normalize_key(column: &str) -> String {
        column.trim().to_lowercase()
    }
}

/// Device targeting mode requested by a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTargeting {
    #[default]
    All,
    AndroidOnly,
    IosOnly,
}

impl DeviceTargeting {
    /// Ad-set segments this mode expands into, in plan order
    pub fn segments(&self) -> Vec<DeviceSegment> {
        match self {
            DeviceTargeting::All => vec![DeviceSegment::Android, DeviceSegment::Ios],
            DeviceTargeting::AndroidOnly => vec![DeviceSegment::Android],
            DeviceTargeting::IosOnly => vec![DeviceSegment::Ios],
        }
    }
}

impl fmt::Display for DeviceTargeting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTargeting::All => write!(f, "all"),
            DeviceTargeting::AndroidOnly => write!(f, "android_only"),
            DeviceTargeting::IosOnly => write!(f, "ios_only"),
        }
    }
}

impl std::str::FromStr for DeviceTargeting {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(DeviceTargeting::All),
            "android_only" => Ok(DeviceTargeting::AndroidOnly),
            "ios_only" => Ok(DeviceTargeting::IosOnly),
            _ => Err(SharedError::invalid("Device Targeting", s)),
        }
    }
}

/// One operating-system segment; each becomes its own ad set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceSegment {
    Android,
    Ios,
}

impl DeviceSegment {
    /// Value for the platform's `user_os` targeting field
    pub fn user_os(&self) -> &'static str {
        match self {
            DeviceSegment::Android => "Android",
            DeviceSegment::Ios => "iOS",
        }
    }
}

impl fmt::Display for DeviceSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSegment::Android => write!(f, "android"),
            DeviceSegment::Ios => write!(f, "ios"),
        }
    }
}

/// Creative type of a media asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    const VIDEO_EXTENSIONS: &'static [&'static str] = &["mp4", "mov", "m4v", "avi", "webm", "mkv"];

    /// Classify a media URL by the extension of its path
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let extension = path
            .rsplit('/')
            .next()
            .and_then(|file| file.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase());

        match extension {
            Some(ext) if Self::VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// A validated spreadsheet row, ready for planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRequest {
    pub topic: String,
    pub country: String,
    pub device_targeting: DeviceTargeting,
    pub title: String,
    pub body: String,
    pub query: String,
    pub media_urls: Vec<String>,
    pub special_ad_category: Option<String>,
    /// Explicit idempotency key from the sheet; derived from content when absent
    pub hash_id: Option<String>,
    pub platform: String,
}

/// Fully resolved credential bundle for one platform label.
///
/// Values are immutable once resolved and are passed explicitly to every
/// platform call; there is no shared client state to mutate per row.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub label: String,
    /// Always carries the `act_` prefix
    pub ad_account_id: String,
    pub page_id: String,
    pub pixel_id: Option<String>,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub access_token: String,
    pub api_version: String,
    /// Page-backed Instagram account used for the identity override
    pub instagram_actor_id: Option<String>,
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("label", &self.label)
            .field("ad_account_id", &self.ad_account_id)
            .field("page_id", &self.page_id)
            .field("pixel_id", &self.pixel_id)
            .field("app_id", &self.app_id)
            .field("app_secret", &self.app_secret.as_ref().map(|_| "<redacted>"))
            .field("access_token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("instagram_actor_id", &self.instagram_actor_id)
            .finish()
    }
}
