//! In-memory collaborators with real state
//!
//! The fake platform remembers every object it creates so idempotency and
//! partial-failure behaviour can be checked across runs.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use shared::PlatformConfig;
use uploader::traits::{AdPlatform, Notifier, SheetStore, ThumbnailProvider};
use uploader::types::{
    AdSetSpec, CampaignSpec, CellUpdate, CreativeMedia, CreativeSpec, FailureCategory, IdentityEcho, ImageRef,
    PlatformFailure, RemoteObject, SheetTab,
};
use uploader::UploaderResult;

#[derive(Debug, Default)]
struct PlatformState {
    next_id: u64,
    campaigns: Vec<(String, RemoteObject)>,
    ad_sets: HashMap<String, Vec<RemoteObject>>,
    ads: HashMap<String, Vec<RemoteObject>>,
    campaign_specs: Vec<CampaignSpec>,
    ad_set_specs: Vec<AdSetSpec>,
    creatives: Vec<CreativeSpec>,
    campaign_creates: usize,
    ad_creates: usize,
    /// Remaining transient failures per operation name
    flaky: HashMap<&'static str, u32>,
    /// Creates that land remotely but report a timeout
    lost_responses: HashMap<&'static str, u32>,
}

/// Stateful ad platform; objects are kept per ad account
#[derive(Debug, Default)]
pub struct FakeAdPlatform {
    state: Mutex<PlatformState>,
    rejected_media: HashSet<String>,
    unauthorized_accounts: HashSet<String>,
    /// Campaign creates on this account wait for a permit
    gate: Option<(String, Arc<Semaphore>)>,
}

impl FakeAdPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creative and video calls for this media URL are rejected as policy violations
    pub fn rejecting_media(mut self, media_url: &str) -> Self {
        self.rejected_media.insert(media_url.to_string());
        self
    }

    /// Every call on this ad account fails with an invalid token
    pub fn rejecting_account(mut self, ad_account_id: &str) -> Self {
        self.unauthorized_accounts.insert(ad_account_id.to_string());
        self
    }

    /// Campaign creates on this ad account block until `gate` has permits
    pub fn gated(mut self, ad_account_id: &str, gate: Arc<Semaphore>) -> Self {
        self.gate = Some((ad_account_id.to_string(), gate));
        self
    }

    /// The next `times` calls of `operation` fail with a rate limit
    pub fn flaky(self, operation: &'static str, times: u32) -> Self {
        self.state.lock().unwrap().flaky.insert(operation, times);
        self
    }

    /// The next `times` creates of `operation` succeed remotely but time out locally
    pub fn losing_responses(self, operation: &'static str, times: u32) -> Self {
        self.state.lock().unwrap().lost_responses.insert(operation, times);
        self
    }

    pub fn campaign_creates(&self) -> usize {
        self.state.lock().unwrap().campaign_creates
    }

    pub fn campaign_count(&self) -> usize {
        self.state.lock().unwrap().campaigns.len()
    }

    pub fn ad_creates(&self) -> usize {
        self.state.lock().unwrap().ad_creates
    }

    pub fn campaign_specs(&self) -> Vec<CampaignSpec> {
        self.state.lock().unwrap().campaign_specs.clone()
    }

    pub fn ad_set_specs(&self) -> Vec<AdSetSpec> {
        self.state.lock().unwrap().ad_set_specs.clone()
    }

    pub fn creatives(&self) -> Vec<CreativeSpec> {
        self.state.lock().unwrap().creatives.clone()
    }

    /// Campaigns created on one ad account
    pub fn campaigns_on(&self, ad_account_id: &str) -> Vec<RemoteObject> {
        self.state
            .lock()
            .unwrap()
            .campaigns
            .iter()
            .filter(|(account, _)| account == ad_account_id)
            .map(|(_, campaign)| campaign.clone())
            .collect()
    }

    fn guard(&self, platform: &PlatformConfig, operation: &'static str) -> Result<(), PlatformFailure> {
        if self.unauthorized_accounts.contains(&platform.ad_account_id) {
            return Err(PlatformFailure::new(
                FailureCategory::InvalidCredential,
                "Invalid OAuth access token (code 190)",
            ));
        }
        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = state.flaky.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(PlatformFailure::new(FailureCategory::RateLimited, "User request limit reached (code 17)"));
            }
        }
        Ok(())
    }

    fn allocate(state: &mut PlatformState, prefix: &str) -> String {
        state.next_id += 1;
        format!("{}-{}", prefix, state.next_id)
    }

    fn lose_response(state: &mut PlatformState, operation: &'static str) -> Result<(), PlatformFailure> {
        if let Some(remaining) = state.lost_responses.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(PlatformFailure::new(FailureCategory::Timeout, "request timed out"));
            }
        }
        Ok(())
    }

    fn reject_media(&self, media_url: &str) -> Result<(), PlatformFailure> {
        if self.rejected_media.contains(media_url) {
            return Err(PlatformFailure::new(
                FailureCategory::PolicyRejected,
                "Ad creative violates advertising policies (code 1487)",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AdPlatform for FakeAdPlatform {
    async fn find_campaign(&self, platform: &PlatformConfig, hash_id: &str) -> Result<Option<RemoteObject>, PlatformFailure> {
        self.guard(platform, "find_campaign")?;
        // Network round trip
        tokio::task::yield_now().await;
        let suffix = format!("_{hash_id}");
        let state = self.state.lock().unwrap();
        let found = state
            .campaigns
            .iter()
            .find(|(account, campaign)| account == &platform.ad_account_id && campaign.name.ends_with(&suffix))
            .map(|(_, campaign)| campaign.clone());
        Ok(found)
    }

    async fn create_campaign(&self, platform: &PlatformConfig, spec: &CampaignSpec) -> Result<String, PlatformFailure> {
        self.guard(platform, "create_campaign")?;
        if let Some((account, gate)) = &self.gate {
            if *account == platform.ad_account_id {
                let _ = gate.acquire().await;
            }
        }
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        state.campaign_creates += 1;
        let id = Self::allocate(&mut state, "cmp");
        state.campaigns.push((
            platform.ad_account_id.clone(),
            RemoteObject {
                id: id.clone(),
                name: spec.name.clone(),
            },
        ));
        state.campaign_specs.push(spec.clone());
        Self::lose_response(&mut state, "create_campaign")?;
        Ok(id)
    }

    async fn list_ad_sets(&self, platform: &PlatformConfig, campaign_id: &str) -> Result<Vec<RemoteObject>, PlatformFailure> {
        self.guard(platform, "list_ad_sets")?;
        Ok(self.state.lock().unwrap().ad_sets.get(campaign_id).cloned().unwrap_or_default())
    }

    async fn create_ad_set(&self, platform: &PlatformConfig, campaign_id: &str, spec: &AdSetSpec) -> Result<String, PlatformFailure> {
        self.guard(platform, "create_ad_set")?;
        let mut state = self.state.lock().unwrap();
        let id = Self::allocate(&mut state, "as");
        state.ad_sets.entry(campaign_id.to_string()).or_default().push(RemoteObject {
            id: id.clone(),
            name: spec.name.clone(),
        });
        state.ad_set_specs.push(spec.clone());
        Self::lose_response(&mut state, "create_ad_set")?;
        Ok(id)
    }

    async fn list_ads(&self, platform: &PlatformConfig, ad_set_id: &str) -> Result<Vec<RemoteObject>, PlatformFailure> {
        self.guard(platform, "list_ads")?;
        Ok(self.state.lock().unwrap().ads.get(ad_set_id).cloned().unwrap_or_default())
    }

    async fn upload_video(&self, platform: &PlatformConfig, media_url: &str) -> Result<String, PlatformFailure> {
        self.guard(platform, "upload_video")?;
        self.reject_media(media_url)?;
        let mut state = self.state.lock().unwrap();
        Ok(Self::allocate(&mut state, "vid"))
    }

    async fn upload_image(&self, platform: &PlatformConfig, _path: &Path) -> Result<String, PlatformFailure> {
        self.guard(platform, "upload_image")?;
        let mut state = self.state.lock().unwrap();
        Ok(Self::allocate(&mut state, "imghash"))
    }

    async fn create_creative(&self, platform: &PlatformConfig, spec: &CreativeSpec) -> Result<String, PlatformFailure> {
        self.guard(platform, "create_creative")?;
        if let CreativeMedia::Image { picture_url } = &spec.media {
            self.reject_media(picture_url)?;
        }
        let mut state = self.state.lock().unwrap();
        state.creatives.push(spec.clone());
        Ok(Self::allocate(&mut state, "cr"))
    }

    async fn read_creative_identity(&self, platform: &PlatformConfig, _creative_id: &str) -> Result<IdentityEcho, PlatformFailure> {
        self.guard(platform, "read_creative_identity")?;
        Ok(IdentityEcho {
            instagram_actor_id: platform.instagram_actor_id.clone(),
            use_page_actor_override: Some(true),
        })
    }

    async fn create_ad(
        &self,
        platform: &PlatformConfig,
        ad_set_id: &str,
        name: &str,
        _creative_id: &str,
        _status: &str,
    ) -> Result<String, PlatformFailure> {
        self.guard(platform, "create_ad")?;
        let mut state = self.state.lock().unwrap();
        state.ad_creates += 1;
        let id = Self::allocate(&mut state, "ad");
        state.ads.entry(ad_set_id.to_string()).or_default().push(RemoteObject {
            id: id.clone(),
            name: name.to_string(),
        });
        Self::lose_response(&mut state, "create_ad")?;
        Ok(id)
    }
}

/// Thumbnail provider that always returns a hosted image
pub struct HostedThumbnails;

#[async_trait]
impl ThumbnailProvider for HostedThumbnails {
    async fn thumbnail_for(&self, _media_url: &str) -> UploaderResult<ImageRef> {
        Ok(ImageRef::Url("https://cdn.example/thumb.jpg".to_string()))
    }
}

/// Single-tab sheet that records every batch write
#[derive(Debug, Default)]
pub struct InMemorySheet {
    tab: SheetTab,
    writes: Mutex<Vec<(String, Vec<CellUpdate>)>>,
}

impl InMemorySheet {
    pub fn new(tab: SheetTab) -> Self {
        Self {
            tab,
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn writes(&self) -> Vec<(String, Vec<CellUpdate>)> {
        self.writes.lock().unwrap().clone()
    }

    /// Last value written to a cell, across all batches
    pub fn cell(&self, row: usize, column: usize) -> Option<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, updates)| updates.iter())
            .filter(|update| update.row == row && update.column == column)
            .last()
            .map(|update| update.value.clone())
    }
}

#[async_trait]
impl SheetStore for InMemorySheet {
    async fn read_tab(&self, _tab: &str) -> UploaderResult<SheetTab> {
        Ok(self.tab.clone())
    }

    async fn write_cells(&self, tab: &str, updates: Vec<CellUpdate>) -> UploaderResult<()> {
        self.writes.lock().unwrap().push((tab.to_string(), updates));
        Ok(())
    }
}

/// Notifier that keeps every message
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> UploaderResult<()> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}
