//! Uploader-specific data types: the campaign plan, the creative payload sent
//! to the platform, platform call failures, and spreadsheet transport values.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::PathBuf;

use shared::{DeviceSegment, FailureKind, IdentityCheck, MediaKind, RawRow};

/// Why a single platform call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    RateLimited,
    Timeout,
    ServerError,
    Network,
    InvalidCredential,
    InvalidMedia,
    PolicyRejected,
    InvalidRequest,
}

impl FailureCategory {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureCategory::RateLimited
                | FailureCategory::Timeout
                | FailureCategory::ServerError
                | FailureCategory::Network
        )
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCategory::RateLimited => write!(f, "rate limited"),
            FailureCategory::Timeout => write!(f, "timeout"),
            FailureCategory::ServerError => write!(f, "server error"),
            FailureCategory::Network => write!(f, "network error"),
            FailureCategory::InvalidCredential => write!(f, "invalid credential"),
            FailureCategory::InvalidMedia => write!(f, "invalid media"),
            FailureCategory::PolicyRejected => write!(f, "policy rejected"),
            FailureCategory::InvalidRequest => write!(f, "invalid request"),
        }
    }
}

/// Failure of one platform API call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFailure {
    pub category: FailureCategory,
    pub message: String,
}

impl PlatformFailure {
    pub fn new(category: FailureCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.category.is_transient()
    }

    pub fn kind(&self) -> FailureKind {
        if self.is_transient() {
            FailureKind::Transient
        } else {
            FailureKind::Permanent
        }
    }
}

impl fmt::Display for PlatformFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

/// An object that already exists on the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub id: String,
    pub name: String,
}

/// Campaign-level parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignSpec {
    pub name: String,
    pub objective: String,
    pub buying_type: String,
    pub status: String,
    pub special_ad_categories: Vec<String>,
}

/// Identity override applied to every creative when a PBIA actor is configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityOverride {
    pub instagram_actor_id: String,
}

/// Creative fields fixed at planning time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreativeTemplate {
    pub name: String,
    pub page_id: String,
    pub message: String,
    pub headline: String,
    pub call_to_action_type: String,
    pub identity: Option<IdentityOverride>,
}

/// One ad (one media asset) inside an ad set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdLayerSpec {
    /// 1-based, used for naming and the channel suffix
    pub index: u32,
    pub name: String,
    pub media_url: String,
    pub kind: MediaKind,
    pub landing_url: String,
    pub ad_status: String,
    pub creative: CreativeTemplate,
}

/// One ad set per device segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdSetSpec {
    pub segment: DeviceSegment,
    pub name: String,
    pub daily_budget: u64,
    pub billing_event: String,
    pub bid_strategy: String,
    pub optimization_goal: String,
    pub status: String,
    pub targeting: Value,
    pub promoted_object: Option<Value>,
    pub layers: Vec<AdLayerSpec>,
}

/// Deterministic description of everything a row will create
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignPlan {
    pub platform_label: String,
    pub hash_id: String,
    pub campaign: CampaignSpec,
    pub ad_sets: Vec<AdSetSpec>,
}

impl CampaignPlan {
    pub fn layer_count(&self) -> usize {
        self.ad_sets.iter().map(|ad_set| ad_set.layers.len()).sum()
    }
}

/// Reference to an image usable by a creative
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Url(String),
    /// Hash of an image already uploaded to the ad account
    Hash(String),
    /// Local file that still has to be uploaded
    File(PathBuf),
}

/// Media part of a creative, resolved at submission time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreativeMedia {
    Image { picture_url: String },
    Video { video_id: String, thumbnail: ImageRef },
}

/// Creative payload sent to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreativeSpec {
    pub template: CreativeTemplate,
    pub link: String,
    pub media: CreativeMedia,
}

impl CreativeSpec {
    pub fn for_layer(layer: &AdLayerSpec, media: CreativeMedia) -> Self {
        Self {
            template: layer.creative.clone(),
            link: layer.landing_url.clone(),
            media,
        }
    }

    /// `object_story_spec` body for the creative create call
    pub fn object_story_spec(&self) -> Value {
        let template = &self.template;
        let call_to_action = json!({
            "type": template.call_to_action_type,
            "value": { "link": self.link },
        });

        let mut spec = match &self.media {
            CreativeMedia::Image { picture_url } => json!({
                "page_id": template.page_id,
                "link_data": {
                    "message": template.message,
                    "name": template.headline,
                    "link": self.link,
                    "picture": picture_url,
                    "call_to_action": call_to_action,
                },
            }),
            CreativeMedia::Video { video_id, thumbnail } => {
                let mut video_data = json!({
                    "video_id": video_id,
                    "title": template.headline,
                    "message": template.message,
                    "call_to_action": call_to_action,
                });
                match thumbnail {
                    ImageRef::Url(url) => video_data["image_url"] = json!(url),
                    ImageRef::Hash(hash) => video_data["image_hash"] = json!(hash),
                    ImageRef::File(_) => {}
                }
                json!({ "page_id": template.page_id, "video_data": video_data })
            }
        };

        if let Some(identity) = &template.identity {
            spec["use_page_actor_override"] = json!(true);
            spec["instagram_user_id"] = json!(identity.instagram_actor_id);
        }

        spec
    }
}

/// Identity fields as echoed back by the platform when a creative is read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEcho {
    pub instagram_actor_id: Option<String>,
    pub use_page_actor_override: Option<bool>,
}

impl IdentityEcho {
    pub fn check(&self, expected_actor_id: &str) -> IdentityCheck {
        let actor_matches = self.instagram_actor_id.as_deref() == Some(expected_actor_id);
        match (actor_matches, self.use_page_actor_override) {
            (true, Some(true)) => IdentityCheck::Confirmed,
            (true, None) => IdentityCheck::VerificationGap,
            _ => IdentityCheck::Unconfirmed,
        }
    }
}

/// Raw contents of one spreadsheet tab
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTab {
    pub header: Vec<String>,
    /// Data rows in sheet order, starting at sheet row 2
    pub rows: Vec<Vec<String>>,
}

impl SheetTab {
    pub const FIRST_DATA_ROW: usize = 2;

    /// Data rows keyed by header, numbered as they appear in the sheet
    pub fn raw_rows(&self) -> Vec<RawRow> {
        self.rows
            .iter()
            .enumerate()
            .map(|(offset, values)| {
                let pairs = self
                    .header
                    .iter()
                    .enumerate()
                    .map(|(col, name)| (name.as_str(), values.get(col).cloned().unwrap_or_default()));
                RawRow::from_pairs(Self::FIRST_DATA_ROW + offset, pairs)
            })
            .collect()
    }
}

/// A single cell write, 1-based row and column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub row: usize,
    pub column: usize,
    pub value: String,
}
