use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use qsb_core::serde::to_canonical_json_bytes;
use qsb_core::{ErrorInfo, QsbError};
use qsb_task::BudgetRow;
use serde::Serialize;

fn wrap_csv(code: &str, err: csv::Error) -> QsbError {
    QsbError::Serde(ErrorInfo::new(code, "CSV operation failed").with_hint(err.to_string()))
}

fn io_error(code: &str, path: &Path, err: impl ToString) -> QsbError {
    QsbError::Serde(ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()))
}

fn ensure_parent(path: &Path) -> Result<(), QsbError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| io_error("export-dir", path, err))?;
    }
    Ok(())
}

/// Column order of the rows CSV.
pub const ROW_COLUMNS: [&str; 7] = [
    "protocol_id",
    "n_total",
    "replicate_id",
    "observable_id",
    "estimate",
    "standard_error",
    "truth",
];

/// Writes budget rows as CSV with a header; a missing truth is an empty cell.
pub fn write_rows_csv(path: &Path, rows: &[BudgetRow]) -> Result<(), QsbError> {
    ensure_parent(path)?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|err| wrap_csv("rows-open", err))?;
    writer
        .write_record(ROW_COLUMNS)
        .map_err(|err| wrap_csv("rows-write-header", err))?;
    for row in rows {
        writer
            .write_record([
                row.protocol_id.clone(),
                row.n_total.to_string(),
                row.replicate_id.to_string(),
                row.observable_id.clone(),
                row.estimate.to_string(),
                row.standard_error.to_string(),
                row.truth.map(|t| t.to_string()).unwrap_or_default(),
            ])
            .map_err(|err| wrap_csv("rows-write-row", err))?;
    }
    writer
        .flush()
        .map_err(|err| wrap_csv("rows-flush", err.into()))
}

fn parse_field<T: std::str::FromStr>(record: &csv::StringRecord, index: usize, line: usize) -> Result<T, QsbError> {
    let raw = record.get(index).unwrap_or_default();
    raw.parse().map_err(|_| {
        QsbError::Data(
            ErrorInfo::new("rows-malformed", "unparseable CSV field")
                .with_context("column", ROW_COLUMNS[index])
                .with_context("line", line.to_string())
                .with_context("value", raw),
        )
    })
}

/// Reads rows written by [`write_rows_csv`].
pub fn read_rows_csv(path: &Path) -> Result<Vec<BudgetRow>, QsbError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|err| wrap_csv("rows-read", err))?;
    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|err| wrap_csv("rows-record", err))?;
        let line = index + 2;
        let truth = match record.get(6).unwrap_or_default() {
            "" => None,
            _ => Some(parse_field(&record, 6, line)?),
        };
        rows.push(BudgetRow {
            protocol_id: record.get(0).unwrap_or_default().to_string(),
            n_total: parse_field(&record, 1, line)?,
            replicate_id: parse_field(&record, 2, line)?,
            observable_id: record.get(3).unwrap_or_default().to_string(),
            estimate: parse_field(&record, 4, line)?,
            standard_error: parse_field(&record, 5, line)?,
            truth,
        });
    }
    Ok(rows)
}

/// Writes `value` as canonical JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), QsbError> {
    ensure_parent(path)?;
    let bytes = to_canonical_json_bytes(value)?;
    fs::write(path, bytes).map_err(|err| io_error("json-write", path, err))
}
