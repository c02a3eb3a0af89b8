use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One observable estimate at one budget in one replicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRow {
    /// Protocol id.
    pub protocol_id: String,
    /// Total shot budget of the run.
    pub n_total: usize,
    /// Replicate index.
    pub replicate_id: u64,
    /// Observable id.
    pub observable_id: String,
    /// Point estimate.
    pub estimate: f64,
    /// Standard error.
    pub standard_error: f64,
    /// Exact value when a ground truth is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truth: Option<f64>,
}

/// `n_total → replicate_id → rows` for one protocol.
pub type BudgetIndex<'a> = BTreeMap<usize, BTreeMap<u64, Vec<&'a BudgetRow>>>;

/// Indexes the rows of `protocol_id` by budget and replicate.
pub fn index_rows<'a>(rows: &'a [BudgetRow], protocol_id: &str) -> BudgetIndex<'a> {
    let mut index: BudgetIndex<'a> = BTreeMap::new();
    for row in rows.iter().filter(|row| row.protocol_id == protocol_id) {
        index
            .entry(row.n_total)
            .or_default()
            .entry(row.replicate_id)
            .or_default()
            .push(row);
    }
    index
}

/// Protocol ids present in `rows`, sorted.
pub fn protocol_ids(rows: &[BudgetRow]) -> Vec<String> {
    let mut ids: Vec<String> = rows.iter().map(|row| row.protocol_id.clone()).collect();
    ids.sort();
    ids.dedup();
    ids
}
