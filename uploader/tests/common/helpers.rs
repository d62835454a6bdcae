//! Builders for a fully wired uploader over in-memory collaborators

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use shared::RowOutcome;
use uploader::config::SubmissionSettings;
use uploader::core::{RetryPolicy, SubmissionEngine};
use uploader::types::SheetTab;
use uploader::{RowVerdict, Uploader};

use super::fakes::{FakeAdPlatform, HostedThumbnails, InMemorySheet, RecordingNotifier};
use super::fixtures::TestFixtures;

pub type TestUploader = Uploader<InMemorySheet, FakeAdPlatform, HostedThumbnails, RecordingNotifier>;

pub struct UploaderBuilder {
    platform: Arc<FakeAdPlatform>,
    tab: SheetTab,
    force: bool,
    cancel: CancellationToken,
    settings: SubmissionSettings,
}

impl UploaderBuilder {
    pub fn new(platform: Arc<FakeAdPlatform>) -> Self {
        Self {
            platform,
            tab: SheetTab::default(),
            force: false,
            cancel: CancellationToken::new(),
            settings: TestFixtures::settings(),
        }
    }

    pub fn with_tab(mut self, tab: SheetTab) -> Self {
        self.tab = tab;
        self
    }

    pub fn with_force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_concurrency(mut self, max_rows: usize, per_platform: usize) -> Self {
        self.settings.max_concurrent_rows = max_rows;
        self.settings.per_platform_concurrency = per_platform;
        self
    }

    pub fn build(self) -> TestUploader {
        let settings = self.settings;
        let engine = SubmissionEngine::new(
            self.platform,
            Arc::new(HostedThumbnails),
            RetryPolicy::immediate(settings.max_attempts),
            "https://cdn.example/fallback.jpg",
        );
        Uploader::new(
            InMemorySheet::new(self.tab),
            RecordingNotifier::default(),
            engine,
            TestFixtures::planner(),
            TestFixtures::registry(),
            &settings,
        )
        .with_force(self.force)
        .with_cancellation(self.cancel)
    }
}

pub struct TestHelpers;

impl TestHelpers {
    /// Run one row through the pipeline and expect it to reach the platform
    pub async fn completed(uploader: &TestUploader, row: shared::RawRow) -> RowOutcome {
        match uploader.process_row(&row).await {
            RowVerdict::Completed(outcome) => outcome,
            other => panic!("expected a completed row, got {other:?}"),
        }
    }
}
