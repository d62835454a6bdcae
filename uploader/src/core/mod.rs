//! Uploader core: the row-to-campaign pipeline

pub mod aggregator;
pub mod country;
pub mod engine;
pub mod hints;
pub mod idempotency;
pub mod landing;
pub mod planner;
pub mod registry;
pub mod retry;
pub mod validator;
pub mod writeback;

pub use aggregator::{aggregate, summary_message, RunTally};
pub use engine::{SubmissionEngine, SubmissionReport, SubmissionStage};
pub use hints::{CampaignPayload, TargetingHints};
pub use idempotency::{derive_hash_id, hash_id_for};
pub use landing::LandingTemplate;
pub use planner::CampaignPlanner;
pub use registry::{PlatformEntry, PlatformRegistry, DEFAULT_PLATFORM};
pub use retry::RetryPolicy;
pub use validator::validate_row;
pub use writeback::ColumnLayout;
