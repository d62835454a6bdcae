//! Per-layer submission results and the row-level rollup written to the sheet

use serde::{Deserialize, Serialize};
use std::fmt;

use super::DeviceSegment;

/// Which stage of the pipeline produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    UnknownPlatform,
    Planning,
    Transient,
    Permanent,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Validation => write!(f, "validation"),
            FailureKind::UnknownPlatform => write!(f, "unknown platform"),
            FailureKind::Planning => write!(f, "planning"),
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// How the platform echoed an identity override back when read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityCheck {
    /// Actor id and override flag both echoed
    Confirmed,
    /// Actor id echoed but the override flag omitted. Image creatives do
    /// this even when the override is applied.
    VerificationGap,
    /// Actor id missing or different in the echo
    Unconfirmed,
}

/// Outcome of one ad layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LayerStatus {
    /// `creative_id` is unknown when an existing ad was adopted
    Succeeded { ad_id: String, creative_id: Option<String> },
    Failed { kind: FailureKind, message: String },
}

/// Result for a single ad layer inside one ad set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerResult {
    pub segment: DeviceSegment,
    /// 1-based layer index within the ad set
    pub index: u32,
    pub media_url: String,
    pub status: LayerStatus,
    pub identity: Option<IdentityCheck>,
}

impl LayerResult {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, LayerStatus::Succeeded { .. })
    }

    pub fn ad_id(&self) -> Option<&str> {
        match &self.status {
            LayerStatus::Succeeded { ad_id, .. } => Some(ad_id),
            LayerStatus::Failed { .. } => None,
        }
    }

    /// Tag used in error details, e.g. `ios#2`
    pub fn tag(&self) -> String {
        format!("{}#{}", self.segment, self.index)
    }
}

/// Row-level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    AllSucceeded,
    Partial,
    AllFailed,
}

impl OutcomeStatus {
    /// Value written into the sheet's `Status` column
    pub fn sheet_value(&self) -> &'static str {
        match self {
            OutcomeStatus::AllSucceeded => "SUCCESS",
            OutcomeStatus::Partial => "PARTIAL",
            OutcomeStatus::AllFailed => "FAILED",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::AllSucceeded => write!(f, "ALL_SUCCEEDED"),
            OutcomeStatus::Partial => write!(f, "PARTIAL"),
            OutcomeStatus::AllFailed => write!(f, "ALL_FAILED"),
        }
    }
}

/// Everything known about one row after submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub status: OutcomeStatus,
    pub campaign_id: Option<String>,
    /// True when an existing campaign tagged with the hash-id was adopted
    pub campaign_reused: bool,
    pub hash_id: Option<String>,
    /// Single string for the sheet's `Error` column
    pub error_detail: String,
    pub layers: Vec<LayerResult>,
}

impl RowOutcome {
    /// Outcome for a row that failed before anything reached the platform
    pub fn rejected(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::AllFailed,
            campaign_id: None,
            campaign_reused: false,
            hash_id: None,
            error_detail: format!("{kind} error: {}", message.into()),
            layers: Vec::new(),
        }
    }

    pub fn succeeded_ad_ids(&self) -> Vec<&str> {
        self.layers.iter().filter_map(|layer| layer.ad_id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_sheet_values() {
        assert_eq!(OutcomeStatus::AllSucceeded.sheet_value(), "SUCCESS");
        assert_eq!(OutcomeStatus::Partial.sheet_value(), "PARTIAL");
        assert_eq!(OutcomeStatus::AllFailed.sheet_value(), "FAILED");
    }

    #[test]
    fn test_rejected_outcome() {
        let outcome = RowOutcome::rejected(FailureKind::UnknownPlatform, "no platform 'tiktok'");

        assert_eq!(outcome.status, OutcomeStatus::AllFailed);
        assert!(outcome.campaign_id.is_none());
        assert_eq!(outcome.error_detail, "unknown platform error: no platform 'tiktok'");
    }

    #[test]
    fn test_layer_result_tag_and_ad_id() {
        let layer = LayerResult {
            segment: DeviceSegment::Ios,
            index: 2,
            media_url: "https://x/b.jpg".to_string(),
            status: LayerStatus::Succeeded {
                ad_id: "ad-9".to_string(),
                creative_id: Some("cr-9".to_string()),
            },
            identity: None,
        };

        assert_eq!(layer.tag(), "ios#2");
        assert_eq!(layer.ad_id(), Some("ad-9"));
        assert!(layer.succeeded());
    }

    #[test]
    fn test_outcome_serializes_status_in_screaming_case() {
        let json = serde_json::to_value(OutcomeStatus::AllSucceeded).unwrap();
        assert_eq!(json, serde_json::json!("ALL_SUCCEEDED"));
    }
}
