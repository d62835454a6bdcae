//! Marketing Graph API client implementing `AdPlatform`

use async_trait::async_trait;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use shared::PlatformConfig;

use crate::core::planner::has_hash_tag;
use crate::error::UploaderResult;
use crate::traits::AdPlatform;
use crate::types::{
    AdSetSpec, CampaignSpec, CreativeSpec, FailureCategory, IdentityEcho, PlatformFailure, RemoteObject,
};

const LIST_LIMIT: &str = "100";

/// Real Graph API client.
///
/// Holds no per-account state: credentials come with every call.
pub struct RealGraphClient {
    client: reqwest::Client,
    base_url: String,
}

impl RealGraphClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> UploaderResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, platform: &PlatformConfig, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, platform.api_version, path)
    }

    fn auth_params(platform: &PlatformConfig) -> Vec<(String, String)> {
        let mut params = vec![("access_token".to_string(), platform.access_token.clone())];
        if let Some(proof) = platform
            .app_secret
            .as_deref()
            .and_then(|secret| appsecret_proof(secret, &platform.access_token))
        {
            params.push(("appsecret_proof".to_string(), proof));
        }
        params
    }

    async fn get(&self, platform: &PlatformConfig, path: &str, query: &[(&str, String)]) -> Result<Value, PlatformFailure> {
        let mut params = Self::auth_params(platform);
        params.extend(query.iter().map(|(k, v)| (k.to_string(), v.clone())));

        debug!("GET {}", path);
        let response = self
            .client
            .get(self.endpoint(platform, path))
            .query(&params)
            .send()
            .await
            .map_err(transport_failure)?;
        Self::read_response(response).await
    }

    async fn post(&self, platform: &PlatformConfig, path: &str, form: Vec<(&str, String)>) -> Result<Value, PlatformFailure> {
        let mut params = Self::auth_params(platform);
        params.extend(form.into_iter().map(|(k, v)| (k.to_string(), v)));

        debug!("POST {}", path);
        let response = self
            .client
            .post(self.endpoint(platform, path))
            .form(&params)
            .send()
            .await
            .map_err(transport_failure)?;
        Self::read_response(response).await
    }

    async fn read_response(response: reqwest::Response) -> Result<Value, PlatformFailure> {
        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_failure)?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if status >= 400 || body.get("error").is_some() {
            return Err(classify_error(status, &body));
        }
        if body.is_null() {
            return Err(PlatformFailure::new(
                FailureCategory::ServerError,
                format!("unreadable response body (HTTP {status})"),
            ));
        }
        Ok(body)
    }

    async fn create(&self, platform: &PlatformConfig, path: &str, form: Vec<(&str, String)>) -> Result<String, PlatformFailure> {
        let body = self.post(platform, path, form).await?;
        id_of(&body)
    }

    async fn list(&self, platform: &PlatformConfig, path: &str) -> Result<Vec<RemoteObject>, PlatformFailure> {
        let body = self
            .get(platform, path, &[("fields", "id,name".to_string()), ("limit", LIST_LIMIT.to_string())])
            .await?;
        Ok(remote_objects(&body))
    }
}

#[async_trait]
impl AdPlatform for RealGraphClient {
    async fn find_campaign(&self, platform: &PlatformConfig, hash_id: &str) -> Result<Option<RemoteObject>, PlatformFailure> {
        let filtering = json!([{ "field": "name", "operator": "CONTAIN", "value": hash_id }]);
        let body = self
            .get(
                platform,
                &format!("{}/campaigns", platform.ad_account_id),
                &[
                    ("fields", "id,name".to_string()),
                    ("filtering", filtering.to_string()),
                    ("limit", LIST_LIMIT.to_string()),
                ],
            )
            .await?;

        Ok(remote_objects(&body)
            .into_iter()
            .find(|campaign| has_hash_tag(&campaign.name, hash_id)))
    }

    async fn create_campaign(&self, platform: &PlatformConfig, spec: &CampaignSpec) -> Result<String, PlatformFailure> {
        self.create(
            platform,
            &format!("{}/campaigns", platform.ad_account_id),
            vec![
                ("name", spec.name.clone()),
                ("objective", spec.objective.clone()),
                ("buying_type", spec.buying_type.clone()),
                ("status", spec.status.clone()),
                ("special_ad_categories", json!(spec.special_ad_categories).to_string()),
            ],
        )
        .await
    }

    async fn list_ad_sets(&self, platform: &PlatformConfig, campaign_id: &str) -> Result<Vec<RemoteObject>, PlatformFailure> {
        self.list(platform, &format!("{campaign_id}/adsets")).await
    }

    async fn create_ad_set(&self, platform: &PlatformConfig, campaign_id: &str, spec: &AdSetSpec) -> Result<String, PlatformFailure> {
        let mut form = vec![
            ("name", spec.name.clone()),
            ("campaign_id", campaign_id.to_string()),
            ("daily_budget", spec.daily_budget.to_string()),
            ("billing_event", spec.billing_event.clone()),
            ("bid_strategy", spec.bid_strategy.clone()),
            ("optimization_goal", spec.optimization_goal.clone()),
            ("status", spec.status.clone()),
            ("targeting", spec.targeting.to_string()),
        ];
        if let Some(promoted) = &spec.promoted_object {
            form.push(("promoted_object", promoted.to_string()));
        }
        self.create(platform, &format!("{}/adsets", platform.ad_account_id), form)
            .await
    }

    async fn list_ads(&self, platform: &PlatformConfig, ad_set_id: &str) -> Result<Vec<RemoteObject>, PlatformFailure> {
        self.list(platform, &format!("{ad_set_id}/ads")).await
    }

    async fn upload_video(&self, platform: &PlatformConfig, media_url: &str) -> Result<String, PlatformFailure> {
        self.create(
            platform,
            &format!("{}/advideos", platform.ad_account_id),
            vec![("file_url", media_url.to_string())],
        )
        .await
    }

    async fn upload_image(&self, platform: &PlatformConfig, path: &Path) -> Result<String, PlatformFailure> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PlatformFailure::new(
                FailureCategory::InvalidMedia,
                format!("cannot read {}: {}", path.display(), e),
            )
        })?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

        let body = self
            .post(platform, &format!("{}/adimages", platform.ad_account_id), vec![("bytes", encoded)])
            .await?;

        body.get("images")
            .and_then(Value::as_object)
            .and_then(|images| images.values().find_map(|image| image.get("hash")))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PlatformFailure::new(FailureCategory::InvalidRequest, "image upload returned no hash"))
    }

    async fn create_creative(&self, platform: &PlatformConfig, spec: &CreativeSpec) -> Result<String, PlatformFailure> {
        self.create(
            platform,
            &format!("{}/adcreatives", platform.ad_account_id),
            vec![
                ("name", spec.template.name.clone()),
                ("object_story_spec", spec.object_story_spec().to_string()),
            ],
        )
        .await
    }

    async fn read_creative_identity(&self, platform: &PlatformConfig, creative_id: &str) -> Result<IdentityEcho, PlatformFailure> {
        let body = self
            .get(platform, creative_id, &[("fields", "object_story_spec".to_string())])
            .await?;
        let story = body.get("object_story_spec").cloned().unwrap_or(Value::Null);

        Ok(IdentityEcho {
            instagram_actor_id: story
                .get("instagram_user_id")
                .or_else(|| story.get("instagram_actor_id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            use_page_actor_override: story.get("use_page_actor_override").and_then(Value::as_bool),
        })
    }

    async fn create_ad(
        &self,
        platform: &PlatformConfig,
        ad_set_id: &str,
        name: &str,
        creative_id: &str,
        status: &str,
    ) -> Result<String, PlatformFailure> {
        self.create(
            platform,
            &format!("{}/ads", platform.ad_account_id),
            vec![
                ("name", name.to_string()),
                ("adset_id", ad_set_id.to_string()),
                ("creative", json!({ "creative_id": creative_id }).to_string()),
                ("status", status.to_string()),
            ],
        )
        .await
    }
}

/// hex(HMAC-SHA256(app_secret, access_token))
pub fn appsecret_proof(app_secret: &str, access_token: &str) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()).ok()?;
    mac.update(access_token.as_bytes());
    Some(format!("{:x}", mac.finalize().into_bytes()))
}

fn transport_failure(error: reqwest::Error) -> PlatformFailure {
    if error.is_timeout() {
        PlatformFailure::new(FailureCategory::Timeout, error.to_string())
    } else {
        PlatformFailure::new(FailureCategory::Network, error.to_string())
    }
}

/// Map an HTTP status and Graph error body to a failure category
pub fn classify_error(status: u16, body: &Value) -> PlatformFailure {
    let error = body.get("error");
    let field = |name: &str| error.and_then(|e| e.get(name));
    let code = field("code").and_then(Value::as_i64);
    let subcode = field("error_subcode").and_then(Value::as_i64).unwrap_or(0);
    let is_transient = field("is_transient").and_then(Value::as_bool).unwrap_or(false);
    let message = field("error_user_msg")
        .or_else(|| field("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"));

    let mentions_media = {
        let lower = message.to_lowercase();
        ["video", "image", "media", "thumbnail"].iter().any(|word| lower.contains(word))
    };

    let category = if status == 429 || matches!(code, Some(4 | 17 | 32 | 613 | 80004)) {
        FailureCategory::RateLimited
    } else if status >= 500 || matches!(code, Some(1 | 2)) || is_transient {
        FailureCategory::ServerError
    } else if status == 401 || matches!(code, Some(190 | 102)) {
        FailureCategory::InvalidCredential
    } else if code == Some(368) || (1_487_000..1_488_000).contains(&subcode) || (2_446_000..2_447_000).contains(&subcode) {
        FailureCategory::PolicyRejected
    } else if code == Some(352) || (1_885_000..1_886_000).contains(&subcode) || mentions_media {
        FailureCategory::InvalidMedia
    } else {
        FailureCategory::InvalidRequest
    };

    let message = match code {
        Some(code) => format!("{message} (code {code})"),
        None => message,
    };
    PlatformFailure::new(category, message)
}

fn id_of(body: &Value) -> Result<String, PlatformFailure> {
    body.get("id")
        .and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .ok_or_else(|| PlatformFailure::new(FailureCategory::InvalidRequest, "response carried no id"))
}

fn remote_objects(body: &Value) -> Vec<RemoteObject> {
    body.get("data")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(RemoteObject {
                        id: id_of(item).ok()?,
                        name: item.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
