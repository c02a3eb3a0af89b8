#![allow(dead_code)]

use qsb_task::BudgetRow;

pub fn row(
    protocol: &str,
    n_total: usize,
    replicate: u64,
    observable: &str,
    estimate: f64,
    truth: Option<f64>,
) -> BudgetRow {
    BudgetRow {
        protocol_id: protocol.to_string(),
        n_total,
        replicate_id: replicate,
        observable_id: observable.to_string(),
        estimate,
        standard_error: 0.01,
        truth,
    }
}

/// Rows whose truth error for observable `k` of replicate `r` at budget `n`
/// is `errors[n_index][r][k]`; truth is zero throughout.
pub fn error_grid(protocol: &str, budgets: &[usize], errors: &[Vec<Vec<f64>>]) -> Vec<BudgetRow> {
    let mut rows = Vec::new();
    for (n_total, replicates) in budgets.iter().zip(errors) {
        for (replicate, observables) in replicates.iter().enumerate() {
            for (k, error) in observables.iter().enumerate() {
                rows.push(row(
                    protocol,
                    *n_total,
                    replicate as u64,
                    &format!("o{k}"),
                    *error,
                    Some(0.0),
                ));
            }
        }
    }
    rows
}
