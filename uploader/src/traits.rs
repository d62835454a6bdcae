//! Collaborator trait definitions for dependency injection
//!
//! Every external system the engine touches sits behind one of these traits:
//! the ad platform, the spreadsheet, the SMS notifier and the thumbnail
//! sources. Real implementations live in `services`; tests use the generated
//! mocks or in-memory fakes.

use std::path::Path;
use async_trait::async_trait;

use shared::PlatformConfig;
use crate::error::UploaderResult;
use crate::types::{
    AdSetSpec, CampaignSpec, CellUpdate, CreativeSpec, IdentityEcho, ImageRef, PlatformFailure,
    RemoteObject, SheetTab,
};

/// Ad platform API.
///
/// Every call receives the resolved credentials explicitly so that rows on
/// different accounts never share mutable client state.
#[mockall::automock]
#[async_trait]
pub trait AdPlatform: Send + Sync {
    /// Find a campaign whose name carries the given hash-id tag
    async fn find_campaign(&self, platform: &PlatformConfig, hash_id: &str) -> Result<Option<RemoteObject>, PlatformFailure>;

    async fn create_campaign(&self, platform: &PlatformConfig, spec: &CampaignSpec) -> Result<String, PlatformFailure>;

    async fn list_ad_sets(&self, platform: &PlatformConfig, campaign_id: &str) -> Result<Vec<RemoteObject>, PlatformFailure>;

    async fn create_ad_set(&self, platform: &PlatformConfig, campaign_id: &str, spec: &AdSetSpec) -> Result<String, PlatformFailure>;

    async fn list_ads(&self, platform: &PlatformConfig, ad_set_id: &str) -> Result<Vec<RemoteObject>, PlatformFailure>;

    /// Register a video by URL and return its platform id
    async fn upload_video(&self, platform: &PlatformConfig, media_url: &str) -> Result<String, PlatformFailure>;

    /// Upload a local image and return its image hash
    async fn upload_image(&self, platform: &PlatformConfig, path: &Path) -> Result<String, PlatformFailure>;

    async fn create_creative(&self, platform: &PlatformConfig, spec: &CreativeSpec) -> Result<String, PlatformFailure>;

    /// Read back the identity fields of a creative's story spec
    async fn read_creative_identity(&self, platform: &PlatformConfig, creative_id: &str) -> Result<IdentityEcho, PlatformFailure>;

    async fn create_ad(
        &self,
        platform: &PlatformConfig,
        ad_set_id: &str,
        name: &str,
        creative_id: &str,
        status: &str,
    ) -> Result<String, PlatformFailure>;
}

/// Thumbnail capability used for video creatives
#[mockall::automock]
#[async_trait]
pub trait ThumbnailProvider: Send + Sync {
    async fn thumbnail_for(&self, media_url: &str) -> UploaderResult<ImageRef>;
}

/// One step of a thumbnail fallback chain
#[mockall::automock]
#[async_trait]
pub trait ThumbnailSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn produce(&self, media_url: &str) -> UploaderResult<ImageRef>;
}

/// Spreadsheet transport
#[mockall::automock]
#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn read_tab(&self, tab: &str) -> UploaderResult<SheetTab>;

    async fn write_cells(&self, tab: &str, updates: Vec<CellUpdate>) -> UploaderResult<()>;
}

/// Run summary delivery
#[mockall::automock]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> UploaderResult<()>;
}
