use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{MatchResult, Resolution};

/// Machine key for rows without an assigned machine.
pub const UNASSIGNED: &str = "-";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub total: usize,
    pub matched: usize,
    pub new: usize,
    pub pending: usize,
    pub kg_sent: f64,
    pub kg_received: f64,
    pub kg_sent_by_machine: BTreeMap<String, f64>,
    /// `(sent - received) / sent`, when anything was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrap_ratio: Option<f64>,
}

/// Compute summary statistics over a reconciliation.
pub fn summarize(results: &[MatchResult]) -> ReviewSummary {
    let mut summary = ReviewSummary {
        total: results.len(),
        ..Default::default()
    };

    for r in results {
        match r.resolution {
            Resolution::Pending => summary.pending += 1,
            Resolution::Matched { .. } => summary.matched += 1,
            Resolution::New => summary.new += 1,
        }

        summary.kg_sent += r.record.quantity_sent;
        summary.kg_received += r.record.quantity_received;
        let machine = r.record.machine.clone().unwrap_or_else(|| UNASSIGNED.to_string());
        *summary.kg_sent_by_machine.entry(machine).or_insert(0.0) += r.record.quantity_sent;
    }

    if summary.kg_sent > 0.0 {
        summary.scrap_ratio = Some((summary.kg_sent - summary.kg_received) / summary.kg_sent);
    }

    summary
}
