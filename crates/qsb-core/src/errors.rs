//! Structured error types shared across QSB crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code, message and key/value context carried by every [`QsbError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Kebab-case code that tests and callers match on.
    pub code: String,
    /// Diagnostic message.
    pub message: String,
    /// Offending identifiers and sizes, keyed by name.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Suggested fix, when one is obvious.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with empty context and no hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds or replaces a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets the hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the QSB engine.
///
/// Only configuration-level problems and genuine I/O or sampler failures are
/// reported through this type. Sparse data (too few shots, missing rows) is
/// carried through as `NaN`, `None` or an infinite standard error instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum QsbError {
    /// Invalid configuration detected at construction time.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Raw data that violates a structural invariant (unknown setting, overspent budget).
    #[error("data error: {0}")]
    Data(ErrorInfo),
    /// Failure reported by an external sampler.
    #[error("sampler error: {0}")]
    Sampler(ErrorInfo),
    /// Statistical routine misuse (invalid level, empty family).
    #[error("stats error: {0}")]
    Stats(ErrorInfo),
    /// Randomness and seeding errors.
    #[error("rng error: {0}")]
    Rng(ErrorInfo),
    /// Serialization, schema and filesystem errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            let pairs: Vec<String> = self
                .context
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            write!(f, " | context: [{}]", pairs.join(", "))?;
        }
        match &self.hint {
            Some(hint) => write!(f, " | hint: {hint}"),
            None => Ok(()),
        }
    }
}

impl QsbError {
    /// Payload of any family.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            QsbError::Config(info)
            | QsbError::Data(info)
            | QsbError::Sampler(info)
            | QsbError::Stats(info)
            | QsbError::Rng(info)
            | QsbError::Serde(info) => info,
        }
    }

    /// Code of the payload.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// [`QsbError::Config`] without context.
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        QsbError::Config(ErrorInfo::new(code, message))
    }

    /// [`QsbError::Data`] without context.
    pub fn data(code: impl Into<String>, message: impl Into<String>) -> Self {
        QsbError::Data(ErrorInfo::new(code, message))
    }

    /// Whether the failure comes from user input rather than execution.
    pub fn is_config(&self) -> bool {
        matches!(self, QsbError::Config(_))
    }
}
