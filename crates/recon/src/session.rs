use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::cache::OrderCache;
use crate::commit::{commit_matched, CommitReport};
use crate::error::ReconError;
use crate::matcher::{apply_automatic_match, resolve_client};
use crate::model::{DispatchRecord, MatchResult, RecordId};
use crate::search::{select, SearchIndex};
use crate::store::OrderStore;
use crate::summary::{summarize, ReviewSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Upload,
    Reconcile,
    Complete,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => write!(f, "upload"),
            Self::Reconcile => write!(f, "reconcile"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// One dispatch-sheet import: load → review/override → commit.
///
/// Automatic matching runs once per load (and on explicit [`rematch`]), never
/// in reaction to its own output.
///
/// [`rematch`]: ImportSession::rematch
#[derive(Debug)]
pub struct ImportSession {
    step: Step,
    results: Vec<MatchResult>,
    committed: HashSet<RecordId>,
    last_report: Option<CommitReport>,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportSession {
    pub fn new() -> Self {
        Self {
            step: Step::Upload,
            results: Vec::new(),
            committed: HashSet::new(),
            last_report: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn results(&self) -> &[MatchResult] {
        &self.results
    }

    pub fn result(&self, id: RecordId) -> Option<&MatchResult> {
        self.results.iter().find(|r| r.id() == id)
    }

    pub fn last_report(&self) -> Option<&CommitReport> {
        self.last_report.as_ref()
    }

    pub fn is_committed(&self, id: RecordId) -> bool {
        self.committed.contains(&id)
    }

    /// Start a review over freshly parsed records.
    pub fn load(&mut self, records: Vec<DispatchRecord>, cache: &OrderCache) {
        let results = records.into_iter().map(MatchResult::pending).collect();
        self.results = apply_automatic_match(results, cache.orders(), cache.clients());
        self.committed.clear();
        self.last_report = None;
        self.step = Step::Reconcile;
        tracing::info!(rows = self.results.len(), "dispatch sheet loaded");
    }

    /// Re-run the automatic pass. Rows no longer pending are kept as they are.
    pub fn rematch(&mut self, cache: &OrderCache) -> Result<(), ReconError> {
        self.require(Step::Reconcile, "rematch")?;
        let results = std::mem::take(&mut self.results);
        self.results = apply_automatic_match(results, cache.orders(), cache.clients());
        Ok(())
    }

    /// Manual override of one row through the search labels.
    /// An empty or unknown label moves the row to `New`.
    pub fn pick(&mut self, id: RecordId, input: &str, cache: &OrderCache) -> Result<(), ReconError> {
        self.require(Step::Reconcile, "pick")?;
        let empty = SearchIndex::default();
        let index = cache.index().unwrap_or(&empty);
        let result = self
            .results
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(ReconError::UnknownRecord(id))?;
        if result.client_id.is_none() {
            result.client_id = resolve_client(&result.record, cache.clients());
        }
        select(result, index, input);
        tracing::debug!(row = %id, resolution = %result.resolution, "manual pick");
        Ok(())
    }

    /// Labels a picker would offer for a row, optionally narrowed by a query.
    pub fn options<'a>(
        &self,
        id: RecordId,
        query: &str,
        cache: &'a OrderCache,
    ) -> Result<Vec<&'a str>, ReconError> {
        let result = self.result(id).ok_or(ReconError::UnknownRecord(id))?;
        Ok(cache
            .index()
            .map(|idx| idx.filter(result.client_id.as_deref(), query))
            .unwrap_or_default())
    }

    /// Write every matched, not yet committed row. Full success completes the
    /// session; any failure keeps it in review so the remainder can be retried.
    pub fn commit<S: OrderStore + ?Sized>(
        &mut self,
        store: &mut S,
        cache: &OrderCache,
        dyehouse: Option<&str>,
    ) -> Result<&CommitReport, ReconError> {
        self.require(Step::Reconcile, "commit")?;

        let report = commit_matched(&self.results, cache.orders(), store, dyehouse, &self.committed);
        self.committed
            .extend(report.outcomes.iter().filter(|o| o.success()).map(|o| o.record_id));

        if report.is_success() {
            tracing::info!(committed = report.committed(), skipped = report.skipped, "import committed");
            self.step = Step::Complete;
        } else {
            tracing::warn!(
                committed = report.committed(),
                failed = ?report.first_error().map(|o| o.record_id),
                "import partially committed; back to review"
            );
            self.step = Step::Reconcile;
        }

        Ok(self.last_report.insert(report))
    }

    pub fn summary(&self) -> ReviewSummary {
        summarize(&self.results)
    }

    fn require(&self, step: Step, action: &'static str) -> Result<(), ReconError> {
        if self.step == step {
            Ok(())
        } else {
            Err(ReconError::InvalidStep { action, step: self.step.to_string() })
        }
    }
}
