//! Standard rows, platforms and configuration for uploader tests

use std::collections::BTreeMap;

use uploader::config::{AdDefaults, AdSetDefaults, CampaignDefaults, SubmissionSettings};
use uploader::core::{CampaignPlanner, LandingTemplate, PlatformEntry, PlatformRegistry};
use uploader::types::SheetTab;

pub struct TestFixtures;

impl TestFixtures {
    pub const TAB: &'static str = "19/10";
    pub const LANDING_TEMPLATE: &'static str = "https://lp.example/s?token=Ab%2Fc9&channel=YYY&oxd=1&q=";
    pub const PRIMARY_ACCOUNT: &'static str = "act_111";
    pub const SECONDARY_ACCOUNT: &'static str = "act_222";

    pub const HEADER: [&'static str; 13] = [
        "Upload",
        "Platform",
        "Topic",
        "Country",
        "Device Targeting",
        "Title",
        "Body",
        "Query",
        "Media Path",
        "Special Ad Category",
        "Hash ID",
        "Status",
        "Error",
    ];

    pub const STATUS_COLUMN: usize = 12;
    pub const ERROR_COLUMN: usize = 13;
    pub const HASH_ID_COLUMN: usize = 11;

    pub fn planner() -> CampaignPlanner {
        let landing = LandingTemplate::parse(Self::LANDING_TEMPLATE, None).unwrap();
        CampaignPlanner::new(
            CampaignDefaults::default(),
            AdSetDefaults::default(),
            AdDefaults::default(),
            landing,
        )
    }

    /// `fb api` on the primary account, `fb api 2` on the secondary one
    pub fn registry() -> PlatformRegistry {
        let entry = |account: &str, page: &str| PlatformEntry {
            ad_account_id: Some(account.to_string()),
            page_id: Some(page.to_string()),
            access_token: Some(format!("token-{account}")),
            ..Default::default()
        };
        let mut entries = BTreeMap::new();
        entries.insert("fb api".to_string(), entry(Self::PRIMARY_ACCOUNT, "page-1"));
        entries.insert("FB API 2".to_string(), entry(Self::SECONDARY_ACCOUNT, "page-2"));

        let no_env = |_: &str| None::<String>;
        PlatformRegistry::from_entries(entries, &no_env).unwrap()
    }

    pub fn settings() -> SubmissionSettings {
        SubmissionSettings {
            max_attempts: 3,
            base_delay_ms: 0,
            max_delay_ms: 0,
            ..Default::default()
        }
    }

    /// The documented example: two images, all devices
    pub fn summer_sale() -> RowBuilder {
        RowBuilder::new()
            .set("Upload", "yes")
            .set("Platform", "fb api")
            .set("Topic", "Summer Sale")
            .set("Country", "US")
            .set("Device Targeting", "all")
            .set("Title", "50% Off")
            .set("Body", "Shop now")
            .set("Query", "summer sale")
            .set("Media Path", "https://x/a.jpg | https://x/b.jpg")
    }

    pub fn tab(rows: Vec<RowBuilder>) -> SheetTab {
        SheetTab {
            header: Self::HEADER.iter().map(|name| name.to_string()).collect(),
            rows: rows.into_iter().map(RowBuilder::build).collect(),
        }
    }
}

/// One sheet row in header order
#[derive(Debug, Clone, Default)]
pub struct RowBuilder {
    cells: BTreeMap<&'static str, String>,
}

impl RowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &'static str, value: &str) -> Self {
        self.cells.insert(column, value.to_string());
        self
    }

    pub fn build(self) -> Vec<String> {
        TestFixtures::HEADER
            .iter()
            .map(|column| self.cells.get(column).cloned().unwrap_or_default())
            .collect()
    }
}
