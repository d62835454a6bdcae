//! Submission engine: turns a `CampaignPlan` into platform objects.
//!
//! The campaign is a hard prerequisite; once it exists ad sets are created
//! concurrently, and inside each ad set the ad layers are created
//! concurrently. A failure is recorded on the smallest unit that failed and
//! never stops its siblings.

use futures_util::future::join_all;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

use shared::{row_debug, row_error, row_info, row_warn};
use shared::{DeviceSegment, FailureKind, IdentityCheck, LayerResult, LayerStatus, MediaKind, PlatformConfig};

use crate::core::planner::has_hash_tag;
use crate::core::retry::RetryPolicy;
use crate::traits::{AdPlatform, ThumbnailProvider};
use crate::types::{
    AdLayerSpec, AdSetSpec, CampaignPlan, CreativeMedia, CreativeSpec, ImageRef, PlatformFailure,
    RemoteObject,
};

/// Per-row submission state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    Planned,
    CampaignCreating,
    AdSetsCreating,
    AdsCreating,
    Done,
    Failed,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStage::Planned => write!(f, "PLANNED"),
            SubmissionStage::CampaignCreating => write!(f, "CAMPAIGN_CREATING"),
            SubmissionStage::AdSetsCreating => write!(f, "ADSETS_CREATING"),
            SubmissionStage::AdsCreating => write!(f, "ADS_CREATING"),
            SubmissionStage::Done => write!(f, "DONE"),
            SubmissionStage::Failed => write!(f, "FAILED"),
        }
    }
}

/// Uploaded video and thumbnail per media URL, shared by every ad set of a row
type VideoMedia = HashMap<String, OnceCell<Result<CreativeMedia, PlatformFailure>>>;

/// Raw result of submitting one plan, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub campaign_id: Option<String>,
    pub campaign_reused: bool,
    /// Set when the campaign itself could not be found or created
    pub campaign_failure: Option<PlatformFailure>,
    pub layers: Vec<LayerResult>,
    pub stage: SubmissionStage,
}

/// Submission engine with injected platform and thumbnail collaborators
pub struct SubmissionEngine<P, T>
where
    P: AdPlatform,
    T: ThumbnailProvider,
{
    platform_api: Arc<P>,
    thumbnails: Arc<T>,
    retry: RetryPolicy,
    verify_identity: bool,
    static_fallback_url: String,
}

impl<P, T> SubmissionEngine<P, T>
where
    P: AdPlatform,
    T: ThumbnailProvider,
{
    pub fn new(
        platform_api: Arc<P>,
        thumbnails: Arc<T>,
        retry: RetryPolicy,
        static_fallback_url: impl Into<String>,
    ) -> Self {
        Self {
            platform_api,
            thumbnails,
            retry,
            verify_identity: false,
            static_fallback_url: static_fallback_url.into(),
        }
    }

    /// Read creatives back once to check the identity override echo
    pub fn with_identity_verification(mut self, enabled: bool) -> Self {
        self.verify_identity = enabled;
        self
    }

    pub async fn submit(&self, row: usize, plan: &CampaignPlan, platform: &PlatformConfig) -> SubmissionReport {
        let mut stage = SubmissionStage::Planned;
        self.advance(row, &mut stage, SubmissionStage::CampaignCreating);

        let (campaign_id, reused) = match self.ensure_campaign(row, plan, platform).await {
            Ok(found) => found,
            Err(failure) => {
                row_error!(row, "❌ Campaign '{}' failed: {}", plan.campaign.name, failure);
                self.advance(row, &mut stage, SubmissionStage::Failed);
                return SubmissionReport {
                    campaign_id: None,
                    campaign_reused: false,
                    campaign_failure: Some(failure),
                    layers: Vec::new(),
                    stage,
                };
            }
        };

        self.advance(row, &mut stage, SubmissionStage::AdSetsCreating);
        let api = &self.platform_api;
        let known_ad_sets = if reused {
            self.list_existing(row, "ad sets", |_| api.list_ad_sets(platform, &campaign_id))
                .await
        } else {
            Ok(Vec::new())
        };

        let ad_set_ids = join_all(
            plan.ad_sets
                .iter()
                .map(|spec| self.ensure_ad_set(row, platform, &campaign_id, spec, &known_ad_sets)),
        )
        .await;

        self.advance(row, &mut stage, SubmissionStage::AdsCreating);
        let videos: VideoMedia = plan
            .ad_sets
            .iter()
            .flat_map(|spec| spec.layers.iter())
            .filter(|layer| matches!(layer.kind, MediaKind::Video))
            .map(|layer| (layer.media_url.clone(), OnceCell::new()))
            .collect();
        let videos = &videos;

        let per_ad_set = join_all(plan.ad_sets.iter().zip(ad_set_ids).map(|(spec, ad_set)| async move {
            match ad_set {
                Ok((ad_set_id, ad_set_reused)) => {
                    self.submit_layers(row, platform, &ad_set_id, ad_set_reused, spec, videos).await
                }
                Err(failure) => {
                    row_error!(row, "❌ Ad set '{}' failed: {}", spec.name, failure);
                    spec.layers
                        .iter()
                        .map(|layer| Self::failed_layer(spec.segment, layer, failure.kind(), format!("ad set {failure}")))
                        .collect()
                }
            }
        }))
        .await;

        let layers: Vec<LayerResult> = per_ad_set.into_iter().flatten().collect();
        let next = if layers.iter().any(LayerResult::succeeded) {
            SubmissionStage::Done
        } else {
            SubmissionStage::Failed
        };
        self.advance(row, &mut stage, next);

        SubmissionReport {
            campaign_id: Some(campaign_id),
            campaign_reused: reused,
            campaign_failure: None,
            layers,
            stage,
        }
    }

    fn advance(&self, row: usize, stage: &mut SubmissionStage, next: SubmissionStage) {
        row_debug!(row, "Stage {} -> {}", stage, next);
        *stage = next;
    }

    /// Find the campaign tagged with the plan's hash id, or create it.
    /// The lookup runs before every attempt so a create that landed remotely
    /// but failed locally is adopted on retry.
    async fn ensure_campaign(
        &self,
        row: usize,
        plan: &CampaignPlan,
        platform: &PlatformConfig,
    ) -> Result<(String, bool), PlatformFailure> {
        let api = &self.platform_api;
        let result = self
            .retry
            .run("campaign create", |_| async move {
                if let Some(existing) = api.find_campaign(platform, &plan.hash_id).await? {
                    if has_hash_tag(&existing.name, &plan.hash_id) {
                        return Ok((existing.id, true));
                    }
                }
                let id = api.create_campaign(platform, &plan.campaign).await?;
                Ok::<_, PlatformFailure>((id, false))
            })
            .await?;

        if result.1 {
            row_info!(row, "♻️ Reusing campaign {} for hash id {}", result.0, plan.hash_id);
        } else {
            row_info!(row, "✅ Created campaign {} ({})", result.0, plan.campaign.name);
        }
        Ok(result)
    }

    async fn ensure_ad_set(
        &self,
        row: usize,
        platform: &PlatformConfig,
        campaign_id: &str,
        spec: &AdSetSpec,
        known: &Result<Vec<RemoteObject>, PlatformFailure>,
    ) -> Result<(String, bool), PlatformFailure> {
        let known = known.as_ref().map_err(|failure| failure.clone())?;
        if let Some(existing) = find_by_name(known, &spec.name) {
            row_info!(row, "♻️ Reusing ad set {} ({})", existing.id, spec.name);
            return Ok((existing.id.clone(), true));
        }

        let api = &self.platform_api;
        let id = self
            .retry
            .run("ad set create", |attempt| async move {
                if attempt > 1 {
                    let existing = api.list_ad_sets(platform, campaign_id).await?;
                    if let Some(found) = find_by_name(&existing, &spec.name) {
                        return Ok(found.id.clone());
                    }
                }
                api.create_ad_set(platform, campaign_id, spec).await
            })
            .await?;

        row_info!(row, "✅ Created ad set {} ({})", id, spec.name);
        Ok((id, false))
    }

    async fn submit_layers(
        &self,
        row: usize,
        platform: &PlatformConfig,
        ad_set_id: &str,
        ad_set_reused: bool,
        spec: &AdSetSpec,
        videos: &VideoMedia,
    ) -> Vec<LayerResult> {
        let api = &self.platform_api;
        let known_ads = if ad_set_reused {
            self.list_existing(row, "ads", |_| api.list_ads(platform, ad_set_id)).await
        } else {
            Ok(Vec::new())
        };
        let known_ads = match known_ads {
            Ok(ads) => ads,
            Err(failure) => {
                return spec
                    .layers
                    .iter()
                    .map(|layer| Self::failed_layer(spec.segment, layer, failure.kind(), format!("ad listing {failure}")))
                    .collect();
            }
        };

        join_all(
            spec.layers
                .iter()
                .map(|layer| self.submit_layer(row, platform, ad_set_id, spec.segment, layer, &known_ads, videos)),
        )
        .await
    }

    async fn submit_layer(
        &self,
        row: usize,
        platform: &PlatformConfig,
        ad_set_id: &str,
        segment: DeviceSegment,
        layer: &AdLayerSpec,
        known_ads: &[RemoteObject],
        videos: &VideoMedia,
    ) -> LayerResult {
        if let Some(existing) = find_by_name(known_ads, &layer.name) {
            row_info!(row, "♻️ Reusing ad {} ({} {})", existing.id, segment, layer.name);
            return LayerResult {
                segment,
                index: layer.index,
                media_url: layer.media_url.clone(),
                status: LayerStatus::Succeeded {
                    ad_id: existing.id.clone(),
                    creative_id: None,
                },
                identity: None,
            };
        }

        match self.create_layer(row, platform, ad_set_id, layer, videos).await {
            Ok((ad_id, creative_id, identity)) => {
                row_info!(row, "✅ Created ad {} ({}#{})", ad_id, segment, layer.index);
                LayerResult {
                    segment,
                    index: layer.index,
                    media_url: layer.media_url.clone(),
                    status: LayerStatus::Succeeded {
                        ad_id,
                        creative_id: Some(creative_id),
                    },
                    identity,
                }
            }
            Err(failure) => {
                row_warn!(row, "❌ Ad {}#{} failed: {}", segment, layer.index, failure);
                Self::failed_layer(segment, layer, failure.kind(), failure.to_string())
            }
        }
    }

    async fn create_layer(
        &self,
        row: usize,
        platform: &PlatformConfig,
        ad_set_id: &str,
        layer: &AdLayerSpec,
        videos: &VideoMedia,
    ) -> Result<(String, String, Option<IdentityCheck>), PlatformFailure> {
        let api = &self.platform_api;

        let media = match layer.kind {
            MediaKind::Image => CreativeMedia::Image {
                picture_url: layer.media_url.clone(),
            },
            MediaKind::Video => match videos.get(&layer.media_url) {
                Some(cell) => {
                    cell.get_or_init(|| self.prepare_video(row, platform, &layer.media_url))
                        .await
                        .clone()?
                }
                None => self.prepare_video(row, platform, &layer.media_url).await?,
            },
        };

        let creative = CreativeSpec::for_layer(layer, media);
        let creative_id = self
            .retry
            .run("creative create", |_| api.create_creative(platform, &creative))
            .await?;

        let identity = match (&layer.creative.identity, self.verify_identity) {
            (Some(expected), true) => self.verify(row, platform, &creative_id, &expected.instagram_actor_id).await,
            _ => None,
        };

        let creative_ref = creative_id.as_str();
        let ad_id = self
            .retry
            .run("ad create", |attempt| async move {
                if attempt > 1 {
                    let existing = api.list_ads(platform, ad_set_id).await?;
                    if let Some(found) = find_by_name(&existing, &layer.name) {
                        return Ok(found.id.clone());
                    }
                }
                api.create_ad(platform, ad_set_id, &layer.name, creative_ref, &layer.ad_status)
                    .await
            })
            .await?;

        Ok((ad_id, creative_id, identity))
    }

    async fn prepare_video(&self, row: usize, platform: &PlatformConfig, media_url: &str) -> Result<CreativeMedia, PlatformFailure> {
        let api = &self.platform_api;
        let video_id = self
            .retry
            .run("video upload", |_| api.upload_video(platform, media_url))
            .await?;
        let thumbnail = self.thumbnail_for(row, platform, media_url).await;
        Ok(CreativeMedia::Video { video_id, thumbnail })
    }

    /// Thumbnail for a video creative; never fails, falling back to the
    /// configured static image.
    async fn thumbnail_for(&self, row: usize, platform: &PlatformConfig, media_url: &str) -> ImageRef {
        let fallback = ImageRef::Url(self.static_fallback_url.clone());

        match self.thumbnails.thumbnail_for(media_url).await {
            Ok(ImageRef::File(path)) => {
                let api = &self.platform_api;
                let path = path.as_path();
                match self.retry.run("thumbnail upload", |_| api.upload_image(platform, path)).await {
                    Ok(hash) => ImageRef::Hash(hash),
                    Err(failure) => {
                        row_warn!(row, "Thumbnail upload failed for {}: {}; using fallback", media_url, failure);
                        fallback
                    }
                }
            }
            Ok(reference) => reference,
            Err(e) => {
                row_warn!(row, "Thumbnail unavailable for {}: {}; using fallback", media_url, e);
                fallback
            }
        }
    }

    async fn verify(
        &self,
        row: usize,
        platform: &PlatformConfig,
        creative_id: &str,
        expected_actor_id: &str,
    ) -> Option<IdentityCheck> {
        match self.platform_api.read_creative_identity(platform, creative_id).await {
            Ok(echo) => {
                let check = echo.check(expected_actor_id);
                match check {
                    IdentityCheck::Confirmed => {
                        row_debug!(row, "Identity override confirmed on creative {}", creative_id);
                    }
                    IdentityCheck::VerificationGap => {
                        row_info!(
                            row,
                            "Creative {} echoed the actor id without the override flag; treating as applied",
                            creative_id
                        );
                    }
                    IdentityCheck::Unconfirmed => {
                        row_warn!(row, "Identity override not echoed for creative {}", creative_id);
                    }
                }
                Some(check)
            }
            Err(failure) => {
                row_warn!(row, "Could not read back creative {}: {}", creative_id, failure);
                None
            }
        }
    }

    /// Children of a reused parent. A listing that still fails after retries
    /// fails every unit under that parent; nothing is created blind.
    async fn list_existing<F, Fut>(&self, row: usize, what: &str, listing: F) -> Result<Vec<RemoteObject>, PlatformFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Vec<RemoteObject>, PlatformFailure>>,
    {
        let result = self.retry.run(&format!("list {what}"), listing).await;
        if let Err(failure) = &result {
            row_error!(row, "❌ Listing existing {} failed: {}", what, failure);
        }
        result
    }

    fn failed_layer(segment: DeviceSegment, layer: &AdLayerSpec, kind: FailureKind, message: String) -> LayerResult {
        LayerResult {
            segment,
            index: layer.index,
            media_url: layer.media_url.clone(),
            status: LayerStatus::Failed { kind, message },
            identity: None,
        }
    }
}

fn find_by_name<'a>(objects: &'a [RemoteObject], name: &str) -> Option<&'a RemoteObject> {
    objects.iter().find(|object| object.name == name)
}
