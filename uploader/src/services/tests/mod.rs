//! Tests for uploader services
//!
//! HTTP clients are exercised against wiremock servers; the thumbnail chain
//! uses generated mocks and temp directories.

pub mod sheets_client;
pub mod thumbnail;

use shared::PlatformConfig;

/// Credentials pointing at a test server
pub fn test_platform(app_secret: Option<&str>, pbia: Option<&str>) -> PlatformConfig {
    PlatformConfig {
        label: "fb api".to_string(),
        ad_account_id: "act_42".to_string(),
        page_id: "page-1".to_string(),
        pixel_id: None,
        app_id: None,
        app_secret: app_secret.map(str::to_string),
        access_token: "test-token".to_string(),
        api_version: "v22.0".to_string(),
        instagram_actor_id: pbia.map(str::to_string),
    }
}
