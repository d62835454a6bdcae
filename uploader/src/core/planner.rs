//! Campaign planning: a validated request plus platform credentials become a
//! complete, deterministic description of the objects to create.
//!
//! Planning is pure. Nothing here touches the network, so every failure
//! (unknown country, unknown special category, no media) costs no quota.

use serde_json::{json, Map, Value};

use shared::{CampaignRequest, DeviceSegment, MediaKind, PlatformConfig};

use crate::config::{AdDefaults, AdSetDefaults, AppConfig, CampaignDefaults};
use crate::core::country::{is_worldwide, normalize_country};
use crate::core::idempotency::hash_id_for;
use crate::core::landing::LandingTemplate;
use crate::error::{UploaderError, UploaderResult};
use crate::types::{
    AdLayerSpec, AdSetSpec, CampaignPlan, CampaignSpec, CreativeTemplate, IdentityOverride,
};

const SPECIAL_AD_CATEGORIES: &[&str] = &[
    "NONE",
    "EMPLOYMENT",
    "HOUSING",
    "CREDIT",
    "ISSUES_ELECTIONS_POLITICS",
    "ONLINE_GAMBLING_AND_GAMING",
    "FINANCIAL_PRODUCTS_SERVICES",
];

/// Parse a special-ad-category cell into platform values.
///
/// Comma separated, case-insensitive; `NONE` alone yields no categories.
pub fn parse_special_categories(value: Option<&str>) -> UploaderResult<Vec<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(Vec::new());
    };

    let mut categories = Vec::new();
    for raw in value.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let category = raw.to_uppercase().replace([' ', '-'], "_");
        if !SPECIAL_AD_CATEGORIES.contains(&category.as_str()) {
            return Err(UploaderError::planning(format!(
                "unrecognised special ad category '{raw}'"
            )));
        }
        if category != "NONE" && !categories.contains(&category) {
            categories.push(category);
        }
    }
    Ok(categories)
}

/// Campaign name; ends with `_{hash_id}`, which is the idempotency tag
pub fn campaign_name(topic: &str, country: &str, categories: &[String], hash_id: &str) -> String {
    let mut name = format!("{}_{}", topic.trim(), country);
    if !categories.is_empty() {
        name.push('_');
        name.push_str(&categories.join("-"));
    }
    name.push('_');
    name.push_str(hash_id);
    name
}

pub fn ad_set_name(campaign_name: &str, segment: DeviceSegment) -> String {
    format!("{} {}", campaign_name, segment.user_os())
}

pub fn ad_name(topic: &str, index: u32) -> String {
    format!("{} Ad {}", topic.trim(), index)
}

/// Does `name` carry the tag for `hash_id`
pub fn has_hash_tag(name: &str, hash_id: &str) -> bool {
    name.ends_with(&format!("_{hash_id}"))
}

/// Pure planner over fixed defaults
#[derive(Debug, Clone)]
pub struct CampaignPlanner {
    campaign: CampaignDefaults,
    ad_set: AdSetDefaults,
    ad: AdDefaults,
    landing: LandingTemplate,
}

impl CampaignPlanner {
    pub fn new(
        campaign: CampaignDefaults,
        ad_set: AdSetDefaults,
        ad: AdDefaults,
        landing: LandingTemplate,
    ) -> Self {
        Self {
            campaign,
            ad_set,
            ad,
            landing,
        }
    }

    pub fn from_config(config: &AppConfig) -> UploaderResult<Self> {
        let landing = LandingTemplate::parse(
            &config.landing_page.template,
            config.landing_page.base_channel.as_deref(),
        )?;
        Ok(Self::new(
            config.campaign.clone(),
            config.ad_set.clone(),
            config.ad.clone(),
            landing,
        ))
    }

    pub fn plan(&self, request: &CampaignRequest, platform: &PlatformConfig) -> UploaderResult<CampaignPlan> {
        let country = normalize_country(&request.country)
            .ok_or_else(|| UploaderError::planning(format!("unrecognised country '{}'", request.country)))?;
        if request.media_urls.is_empty() {
            return Err(UploaderError::planning("row has no media URLs"));
        }
        let categories = parse_special_categories(request.special_ad_category.as_deref())?;

        let hash_id = hash_id_for(request);
        let name = campaign_name(&request.topic, &country, &categories, &hash_id);

        let campaign = CampaignSpec {
            name: name.clone(),
            objective: self.campaign.objective.clone(),
            buying_type: self.campaign.buying_type.clone(),
            status: self.campaign.status.clone(),
            special_ad_categories: categories,
        };

        let identity = platform.instagram_actor_id.as_ref().map(|actor| IdentityOverride {
            instagram_actor_id: actor.clone(),
        });

        let layers: Vec<AdLayerSpec> = request
            .media_urls
            .iter()
            .zip(1u32..)
            .map(|(media_url, index)| AdLayerSpec {
                index,
                name: ad_name(&request.topic, index),
                media_url: media_url.clone(),
                kind: MediaKind::from_url(media_url),
                landing_url: self.landing.render(&request.query, index),
                ad_status: self.ad.status.clone(),
                creative: CreativeTemplate {
                    name: format!("{} Creative {}", request.topic.trim(), index),
                    page_id: platform.page_id.clone(),
                    message: request.body.clone(),
                    headline: request.title.clone(),
                    call_to_action_type: self.ad.call_to_action_type.clone(),
                    identity: identity.clone(),
                },
            })
            .collect();

        let promoted_object = self.promoted_object(platform);
        let ad_sets = request
            .device_targeting
            .segments()
            .into_iter()
            .map(|segment| AdSetSpec {
                segment,
                name: ad_set_name(&name, segment),
                daily_budget: self.ad_set.daily_budget,
                billing_event: self.ad_set.billing_event.clone(),
                bid_strategy: self.ad_set.bid_strategy.clone(),
                optimization_goal: self.ad_set.optimization_goal.clone(),
                status: self.campaign.status.clone(),
                targeting: self.targeting(&country, segment),
                promoted_object: promoted_object.clone(),
                layers: layers.clone(),
            })
            .collect();

        Ok(CampaignPlan {
            platform_label: platform.label.clone(),
            hash_id,
            campaign,
            ad_sets,
        })
    }

    fn targeting(&self, country: &str, segment: DeviceSegment) -> Value {
        let mut targeting: Map<String, Value> = self.ad_set.targeting.clone();
        if !is_worldwide(country) {
            targeting.insert("geo_locations".to_string(), json!({ "countries": [country] }));
        }
        targeting.insert("device_platforms".to_string(), json!(["mobile"]));
        targeting.insert("user_os".to_string(), json!([segment.user_os()]));
        Value::Object(targeting)
    }

    fn promoted_object(&self, platform: &PlatformConfig) -> Option<Value> {
        match (&self.ad_set.promoted_object, &platform.pixel_id) {
            (Some(Value::Object(template)), Some(pixel)) => {
                let mut object = template.clone();
                object.insert("pixel_id".to_string(), json!(pixel));
                Some(Value::Object(object))
            }
            (Some(template), _) => Some(template.clone()),
            (None, Some(pixel)) => Some(json!({ "pixel_id": pixel, "custom_event_type": "PURCHASE" })),
            (None, None) => None,
        }
    }
}
