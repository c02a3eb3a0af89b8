//! Canonical JSON: object keys sorted at every depth, no whitespace.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::errors::{ErrorInfo, QsbError};

fn json_error(code: &str, err: serde_json::Error) -> QsbError {
    QsbError::Serde(
        ErrorInfo::new(code, err.to_string())
            .with_context("line", err.line().to_string())
            .with_context("column", err.column().to_string()),
    )
}

fn sort_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, mut child) in entries {
                sort_keys(&mut child);
                map.insert(key, child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sort_keys),
        _ => {}
    }
}

/// Compact JSON with sorted keys, so equal values give equal bytes.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, QsbError> {
    let mut tree = serde_json::to_value(value).map_err(|err| json_error("json-serialize", err))?;
    sort_keys(&mut tree);
    serde_json::to_vec(&tree).map_err(|err| json_error("json-write", err))
}

/// Parses JSON bytes into `T`.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, QsbError> {
    serde_json::from_slice(data).map_err(|err| json_error("json-deserialize", err))
}
