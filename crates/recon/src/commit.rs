use std::collections::HashSet;

use serde::Serialize;

use crate::model::{BatchEntry, MatchResult, OrderCandidate, RecordId, Resolution};
use crate::store::OrderStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Committed,
    Failed,
    /// Not written because an earlier record failed.
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitOutcome {
    pub record_id: RecordId,
    pub dispatch_number: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommitOutcome {
    pub fn success(&self) -> bool {
        self.status == OutcomeStatus::Committed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommitReport {
    pub outcomes: Vec<CommitOutcome>,
    /// Rows left out because they were not matched.
    pub skipped: usize,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(CommitOutcome::success)
    }

    pub fn committed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success()).count()
    }

    pub fn first_error(&self) -> Option<&CommitOutcome> {
        self.outcomes.iter().find(|o| o.status == OutcomeStatus::Failed)
    }
}

/// Append a batch entry to the matched order of every `Matched` row.
///
/// Rows are written one at a time in sheet order. The first failed write stops
/// the run: earlier rows stay committed, the failing row and every later one
/// are reported as not committed. Rows in `done` are left out (already
/// written by an earlier run of the same session).
pub fn commit_matched<S: OrderStore + ?Sized>(
    results: &[MatchResult],
    candidates: &[OrderCandidate],
    store: &mut S,
    dyehouse: Option<&str>,
    done: &HashSet<RecordId>,
) -> CommitReport {
    let mut report = CommitReport::default();
    let mut halted = false;

    for result in results {
        if done.contains(&result.id()) {
            continue;
        }

        let order_id = match &result.resolution {
            Resolution::Matched { order_id, .. } => order_id,
            other => {
                tracing::warn!(
                    row = %result.id(),
                    dispatch = %result.record.dispatch_number,
                    status = other.status_name(),
                    "skipping unlinked record"
                );
                report.skipped += 1;
                continue;
            }
        };

        let mut outcome = CommitOutcome {
            record_id: result.id(),
            dispatch_number: result.record.dispatch_number.clone(),
            status: OutcomeStatus::NotAttempted,
            error: None,
        };

        if halted {
            report.outcomes.push(outcome);
            continue;
        }

        let Some(order) = candidates.iter().find(|o| &o.id == order_id) else {
            outcome.status = OutcomeStatus::Failed;
            outcome.error = Some(format!("unknown order: {order_id}"));
            report.outcomes.push(outcome);
            halted = true;
            continue;
        };

        let entry = BatchEntry::from_record(&result.record, &batch_dyehouse(order, &result.record.color, dyehouse));

        match store.append_batch(&order.path, &entry) {
            Ok(()) => {
                tracing::debug!(row = %result.id(), path = %order.path, "batch appended");
                outcome.status = OutcomeStatus::Committed;
            }
            Err(e) => {
                tracing::error!(row = %result.id(), path = %order.path, error = %e, "batch append failed");
                outcome.status = OutcomeStatus::Failed;
                outcome.error = Some(e.to_string());
                halted = true;
            }
        }
        report.outcomes.push(outcome);
    }

    report
}

/// Session dyehouse, else the dyehouse already planned on the order's batch of
/// that color, else empty.
fn batch_dyehouse(order: &OrderCandidate, color: &str, dyehouse: Option<&str>) -> String {
    if let Some(d) = dyehouse.map(str::trim).filter(|d| !d.is_empty()) {
        return d.to_string();
    }
    let color = color.trim().to_lowercase();
    order
        .batches
        .iter()
        .find(|b| b.color.trim().to_lowercase() == color)
        .and_then(|b| b.dyehouse.clone())
        .unwrap_or_default()
}
