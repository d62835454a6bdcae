//! Uploader run loop with dependency injection

use futures_util::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use shared::logging::{log_error, log_progress, log_success};
use shared::{row_info, row_warn};
use shared::{FailureKind, OutcomeStatus, RawRow, RowOutcome};

use crate::config::SubmissionSettings;
use crate::core::aggregator::{aggregate, summary_message, RunTally};
use crate::core::hints::{CampaignPayload, TargetingHints};
use crate::core::planner::CampaignPlanner;
use crate::core::registry::PlatformRegistry;
use crate::core::validator::{columns, is_marked_for_upload, validate_row};
use crate::core::writeback::ColumnLayout;
use crate::core::engine::SubmissionEngine;
use crate::error::{UploaderResult, ValidationError};
use crate::traits::{AdPlatform, Notifier, SheetStore, ThumbnailProvider};
use crate::types::CellUpdate;

/// What happened to one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowVerdict {
    /// `Upload` is not `yes`
    NotMarked,
    /// Already `SUCCESS` in the sheet and not forced
    AlreadyDone,
    /// Rejected by validation; written back as skipped
    Invalid(ValidationError),
    Completed(RowOutcome),
    /// Not started before shutdown; left untouched for the next run
    Pending,
}

/// Totals for one tab run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub tab: String,
    pub tally: RunTally,
    pub invalid: usize,
    pub pending: usize,
    pub not_marked: usize,
    pub already_done: usize,
}

impl RunSummary {
    /// 0 all succeeded, 1 some row partial or failed, 2 rows left pending
    pub fn exit_code(&self) -> i32 {
        if self.pending > 0 {
            2
        } else if self.tally.partial + self.tally.failed > 0 {
            1
        } else {
            0
        }
    }
}

/// Uploader with dependency injection
pub struct Uploader<S, P, T, N>
where
    S: SheetStore,
    P: AdPlatform,
    T: ThumbnailProvider,
    N: Notifier,
{
    pub sheets: S,
    pub notifier: N,
    pub engine: SubmissionEngine<P, T>,
    pub planner: CampaignPlanner,
    pub registry: PlatformRegistry,
    run_id: String,
    limits: HashMap<String, Arc<Semaphore>>,
    row_slots: Semaphore,
    /// One lock per (platform label, hash id); rows sharing a campaign take turns
    campaign_locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
    force: bool,
    cancel: CancellationToken,
}

impl<S, P, T, N> Uploader<S, P, T, N>
where
    S: SheetStore,
    P: AdPlatform,
    T: ThumbnailProvider,
    N: Notifier,
{
    /// Create new uploader; one concurrency limiter per platform label
    pub fn new(
        sheets: S,
        notifier: N,
        engine: SubmissionEngine<P, T>,
        planner: CampaignPlanner,
        registry: PlatformRegistry,
        settings: &SubmissionSettings,
    ) -> Self {
        let per_platform = settings.per_platform_concurrency.max(1);
        let limits = registry
            .labels()
            .map(|label| (label.to_string(), Arc::new(Semaphore::new(per_platform))))
            .collect();

        Self {
            sheets,
            notifier,
            engine,
            planner,
            registry,
            run_id: uuid::Uuid::new_v4().to_string(),
            limits,
            row_slots: Semaphore::new(settings.max_concurrent_rows.max(1)),
            campaign_locks: Mutex::new(HashMap::new()),
            force: false,
            cancel: CancellationToken::new(),
        }
    }

    /// Reprocess rows already marked `SUCCESS`
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Process every row of a tab, write results back, send the summary
    pub async fn run_tab(&self, tab: &str) -> UploaderResult<RunSummary> {
        log_progress(&self.run_id, "Reading tab", tab);
        let sheet = self.sheets.read_tab(tab).await?;
        let layout = ColumnLayout::from_header(&sheet.header);
        let rows = sheet.raw_rows();

        let mut summary = RunSummary {
            tab: tab.to_string(),
            ..Default::default()
        };

        let marked = rows.iter().filter(|row| is_marked_for_upload(row)).count();
        if marked == 0 {
            summary.not_marked = rows.len();
            log_progress(&self.run_id, "Nothing to upload", tab);
            self.notify(&summary_message(tab, &summary.tally)).await;
            return Ok(summary);
        }
        log_progress(&self.run_id, "Processing", &format!("{marked} row(s) marked for upload in '{tab}'"));

        // Every row is polled; concurrency is bounded inside process_row, where a
        // row takes a global slot only after its own label's permit.
        let results: Vec<(RawRow, RowVerdict)> = join_all(rows.into_iter().map(|row| async move {
            let verdict = self.triage_row(&row).await;
            (row, verdict)
        }))
        .await;

        let mut updates: Vec<CellUpdate> = layout.header_updates().to_vec();
        for (row, verdict) in &results {
            match verdict {
                RowVerdict::NotMarked => summary.not_marked += 1,
                RowVerdict::AlreadyDone => summary.already_done += 1,
                RowVerdict::Pending => summary.pending += 1,
                RowVerdict::Invalid(problems) => {
                    summary.invalid += 1;
                    updates.extend(layout.skipped_cells(row.number(), &problems.to_string()));
                }
                RowVerdict::Completed(outcome) => {
                    summary.tally.record(outcome);
                    updates.extend(layout.outcome_cells(row.number(), outcome, row.get(columns::HASH_ID)));
                }
            }
        }

        if let Err(e) = self.sheets.write_cells(tab, updates).await {
            log_error(&self.run_id, "Sheet write-back", &e);
            return Err(e);
        }

        log_success(
            &self.run_id,
            &format!(
                "'{}': {} succeeded, {} partial, {} failed, {} invalid, {} pending",
                tab,
                summary.tally.succeeded,
                summary.tally.partial,
                summary.tally.failed,
                summary.invalid,
                summary.pending
            ),
        );

        self.notify(&summary_message(tab, &summary.tally)).await;
        Ok(summary)
    }

    async fn triage_row(&self, row: &RawRow) -> RowVerdict {
        if is_marked_for_upload(row)
            && !self.force
            && row.get(columns::STATUS).eq_ignore_ascii_case(OutcomeStatus::AllSucceeded.sheet_value())
        {
            row_info!(row.number(), "Already uploaded, skipping (use --force to redo)");
            return RowVerdict::AlreadyDone;
        }
        self.process_row(row).await
    }

    /// Validate, resolve, plan and submit one row
    pub async fn process_row(&self, row: &RawRow) -> RowVerdict {
        let number = row.number();

        let request = match validate_row(row) {
            Ok(Some(request)) => request,
            Ok(None) => return RowVerdict::NotMarked,
            Err(problems) => {
                row_warn!(number, "Skipping invalid row: {}", problems);
                return RowVerdict::Invalid(problems);
            }
        };

        let platform = match self.registry.resolve(&request.platform) {
            Ok(platform) => platform,
            Err(e) => {
                row_warn!(number, "{}", e);
                return RowVerdict::Completed(RowOutcome::rejected(e.failure_kind(), e.to_string()));
            }
        };

        let plan = match self.planner.plan(&request, platform) {
            Ok(plan) => plan,
            Err(e) => {
                row_warn!(number, "{}", e);
                return RowVerdict::Completed(RowOutcome::rejected(e.failure_kind(), e.to_string()));
            }
        };

        row_info!(
            number,
            "📋 Planned '{}' on '{}': {} ad set(s), {} ad(s)",
            plan.campaign.name,
            platform.label,
            plan.ad_sets.len(),
            plan.layer_count()
        );

        if self.cancel.is_cancelled() {
            return RowVerdict::Pending;
        }
        let campaign_lock = self.campaign_lock(&platform.label, &plan.hash_id).await;
        let Some(_campaign_guard) = self.unless_cancelled(campaign_lock.lock_owned()).await else {
            return RowVerdict::Pending;
        };
        let _label_permit = match self.limits.get(&platform.label) {
            Some(semaphore) => match self.unless_cancelled(semaphore.clone().acquire_owned()).await {
                Some(permit) => permit.ok(),
                None => return RowVerdict::Pending,
            },
            None => None,
        };
        let Some(_row_slot) = self.unless_cancelled(self.row_slots.acquire()).await else {
            return RowVerdict::Pending;
        };
        if self.cancel.is_cancelled() {
            row_info!(number, "Shutdown requested, leaving row pending");
            return RowVerdict::Pending;
        }

        let report = self.engine.submit(number, &plan, platform).await;
        let outcome = aggregate(&plan.hash_id, report);
        row_info!(number, "Row finished {}: {}", outcome.status, outcome.error_detail);
        RowVerdict::Completed(outcome)
    }

    async fn campaign_lock(&self, label: &str, hash_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.campaign_locks.lock().await;
        locks
            .entry((label.to_string(), hash_id.to_string()))
            .or_default()
            .clone()
    }

    /// Wait for `acquire` unless shutdown is requested first
    async fn unless_cancelled<F: Future>(&self, acquire: F) -> Option<F::Output> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            output = acquire => Some(output),
        }
    }

    /// Programmatic entry point: one payload in, one outcome out
    pub async fn submit_payload(&self, payload: &CampaignPayload, hints: &TargetingHints) -> RowOutcome {
        let row = payload.to_row(hints);
        match self.process_row(&row).await {
            RowVerdict::Completed(outcome) => outcome,
            RowVerdict::Invalid(problems) => RowOutcome::rejected(FailureKind::Validation, problems.to_string()),
            RowVerdict::Pending => RowOutcome::rejected(FailureKind::Transient, "shutdown requested before submission"),
            RowVerdict::NotMarked | RowVerdict::AlreadyDone => {
                RowOutcome::rejected(FailureKind::Validation, "payload was not submitted")
            }
        }
    }

    async fn notify(&self, message: &str) {
        if let Err(e) = self.notifier.send(message).await {
            log_error(&self.run_id, "Summary notification", &e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdDefaults, AdSetDefaults, CampaignDefaults};
    use crate::core::landing::LandingTemplate;
    use crate::core::registry::PlatformEntry;
    use crate::core::retry::RetryPolicy;
    use crate::error::UploaderError;
    use crate::traits::{MockAdPlatform, MockNotifier, MockSheetStore, MockThumbnailProvider};
    use crate::types::SheetTab;
    use std::collections::BTreeMap;

    type TestUploader = Uploader<MockSheetStore, MockAdPlatform, MockThumbnailProvider, MockNotifier>;

    fn tab(upload: &str) -> SheetTab {
        SheetTab {
            header: vec!["Upload".to_string(), "Topic".to_string()],
            rows: vec![vec![upload.to_string(), "Spring".to_string()]],
        }
    }

    fn uploader(sheets: MockSheetStore, notifier: MockNotifier) -> TestUploader {
        let mut entries = BTreeMap::new();
        entries.insert(
            "fb api".to_string(),
            PlatformEntry {
                ad_account_id: Some("1".to_string()),
                page_id: Some("p".to_string()),
                access_token: Some("t".to_string()),
                ..Default::default()
            },
        );
        let no_env = |_: &str| None::<String>;
        let registry = PlatformRegistry::from_entries(entries, &no_env).unwrap();
        let planner = CampaignPlanner::new(
            CampaignDefaults::default(),
            AdSetDefaults::default(),
            AdDefaults::default(),
            LandingTemplate::parse("https://lp.example/?channel=c&q=", None).unwrap(),
        );
        let engine = SubmissionEngine::new(
            Arc::new(MockAdPlatform::new()),
            Arc::new(MockThumbnailProvider::new()),
            RetryPolicy::immediate(1),
            "https://cdn.example/f.jpg",
        );
        Uploader::new(sheets, notifier, engine, planner, registry, &SubmissionSettings::default())
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_run() {
        let mut sheets = MockSheetStore::new();
        sheets.expect_read_tab().returning(|_| Ok(tab("no")));
        sheets.expect_write_cells().times(0);
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(1).returning(|_| {
            Err(UploaderError::Notification {
                message: "twilio down".to_string(),
            })
        });

        let summary = uploader(sheets, notifier).run_tab("19/10").await.unwrap();

        assert_eq!(summary.not_marked, 1);
        assert_eq!(summary.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_write_back_failure_is_returned() {
        let mut sheets = MockSheetStore::new();
        sheets.expect_read_tab().returning(|_| Ok(tab("yes")));
        sheets.expect_write_cells().times(1).returning(|_, updates| {
            assert!(updates.iter().any(|cell| cell.value == "SKIPPED"));
            Err(UploaderError::Sheet {
                message: "quota".to_string(),
            })
        });
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(0);

        let result = uploader(sheets, notifier).run_tab("19/10").await;

        assert!(matches!(result, Err(UploaderError::Sheet { .. })));
    }

    #[test]
    fn test_exit_codes() {
        let mut summary = RunSummary::default();
        assert_eq!(summary.exit_code(), 0);

        summary.invalid = 3;
        assert_eq!(summary.exit_code(), 0);

        summary.tally.partial = 1;
        assert_eq!(summary.exit_code(), 1);

        summary.pending = 1;
        assert_eq!(summary.exit_code(), 2);
    }
}
