//! Outcome aggregation: layer results to one row outcome, and row outcomes to
//! the run summary message.

use shared::{LayerResult, LayerStatus, OutcomeStatus, RowOutcome};

use crate::core::engine::SubmissionReport;

const ERROR_ENTRY_LIMIT: usize = 100;
const ERROR_SUMMARY_LIMIT: usize = 300;

/// Classify a submission.
///
/// Identity verification results are carried along but never change the
/// classification.
pub fn aggregate(hash_id: &str, report: SubmissionReport) -> RowOutcome {
    let SubmissionReport {
        campaign_id,
        campaign_reused,
        campaign_failure,
        layers,
        ..
    } = report;

    let Some(campaign_id) = campaign_id else {
        let reason = campaign_failure
            .map(|failure| format!("campaign {failure}"))
            .unwrap_or_else(|| "campaign was not created".to_string());
        return RowOutcome {
            status: OutcomeStatus::AllFailed,
            campaign_id: None,
            campaign_reused: false,
            hash_id: Some(hash_id.to_string()),
            error_detail: reason,
            layers,
        };
    };

    let status = classify(&layers);
    let error_detail = error_detail(&campaign_id, &layers);

    RowOutcome {
        status,
        campaign_id: Some(campaign_id),
        campaign_reused,
        hash_id: Some(hash_id.to_string()),
        error_detail,
        layers,
    }
}

pub fn classify(layers: &[LayerResult]) -> OutcomeStatus {
    let succeeded = layers.iter().filter(|layer| layer.succeeded()).count();
    if succeeded == 0 {
        OutcomeStatus::AllFailed
    } else if succeeded == layers.len() {
        OutcomeStatus::AllSucceeded
    } else {
        OutcomeStatus::Partial
    }
}

/// `campaign {id}` followed by every failed layer, tagged `segment#index`
pub fn error_detail(campaign_id: &str, layers: &[LayerResult]) -> String {
    let failures: Vec<String> = layers
        .iter()
        .filter_map(|layer| match &layer.status {
            LayerStatus::Failed { message, .. } => Some(format!("{}: {}", layer.tag(), message)),
            LayerStatus::Succeeded { .. } => None,
        })
        .collect();

    if failures.is_empty() {
        format!("campaign {campaign_id}")
    } else {
        format!("campaign {}; {}", campaign_id, failures.join(" | "))
    }
}

/// Counts for the run summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTally {
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    /// Error details of partial and failed rows, in sheet order
    pub errors: Vec<String>,
}

impl RunTally {
    pub fn record(&mut self, outcome: &RowOutcome) {
        match outcome.status {
            OutcomeStatus::AllSucceeded => self.succeeded += 1,
            OutcomeStatus::Partial => {
                self.partial += 1;
                self.errors.push(outcome.error_detail.clone());
            }
            OutcomeStatus::AllFailed => {
                self.failed += 1;
                self.errors.push(outcome.error_detail.clone());
            }
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.partial + self.failed
    }
}

/// SMS text for a finished run
pub fn summary_message(tab: &str, tally: &RunTally) -> String {
    if tally.total() == 0 {
        return format!("No Facebook campaigns to upload for {tab}.");
    }

    let mut message = format!(
        "FB Ads upload complete: {} succeeded, {} partial, {} failed out of {}.",
        tally.succeeded,
        tally.partial,
        tally.failed,
        tally.total()
    );

    let entries: Vec<String> = tally
        .errors
        .iter()
        .filter(|e| !e.is_empty())
        .map(|e| truncate(e, ERROR_ENTRY_LIMIT))
        .collect();
    if !entries.is_empty() {
        message.push_str(" Errors: ");
        message.push_str(&truncate(&entries.join(" | "), ERROR_SUMMARY_LIMIT));
    }
    message
}

/// Cut to `limit` characters, ending in `...` when shortened
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{kept}...")
}
