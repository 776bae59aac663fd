//! errors.rs - Error types and typed diagnostics for the logveil-core library.
//!
//! `LogveilError` covers failures that stop a run: bad configuration, grammar
//! compilation, or an internal fault. The remaining types are per-record diagnostics that a
//! run collects and reports without aborting: invalid field values,
//! reconstruction conflicts and line mismatches.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// This enum represents all fatal error types in the `logveil-core` library.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LogveilError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Failed to compile grammar '{0}': {1}")]
    PatternCompilation(String, regex::Error),

    #[error("Grammar '{0}': pattern length ({1}) exceeds maximum allowed ({2})")]
    PatternLengthExceeded(String, usize, usize),

    #[error("A fatal error occurred: {0}")]
    Fatal(String),
}

/// The field class a value failed to parse as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Address,
    Port,
    Timestamp,
    Numeric,
    Url,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Address => "address",
            ValueKind::Port => "port",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Numeric => "numeric",
            ValueKind::Url => "url",
        };
        f.write_str(name)
    }
}

/// A single field value that could not be parsed as its class.
///
/// The original value is kept so the caller can decide between pass-through
/// and a marker; it is never written to logs by this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("value is not a valid {kind}")]
pub struct InvalidValue {
    pub kind: ValueKind,
    pub value: String,
}

impl InvalidValue {
    pub fn new(kind: ValueKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }
}

/// A line that did not match the configured grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseMismatch {
    pub line_no: usize,
}

/// Why a ledger entry could not be substituted back into its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    /// The bytes at the recorded offset differ from the recorded original.
    ContentMismatch,
    /// The range runs past the end of the line or splits a character.
    OutOfBounds,
    /// The range overlaps a replacement already applied on the line.
    Overlap,
}

/// A skipped replacement, reported instead of silently corrupting the line.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("line {line_no}: cannot replace field '{field}' at offset {offset} ({reason:?})")]
pub struct ReconstructionConflict {
    pub line_no: usize,
    pub field: String,
    pub offset: usize,
    pub reason: ConflictReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_message_omits_original() {
        let err = InvalidValue::new(ValueKind::Address, "300.1.1.1");
        let msg = err.to_string();
        assert_eq!(msg, "value is not a valid address");
        assert!(!msg.contains("300.1.1.1"));
    }

    #[test]
    fn configuration_error_display() {
        let err = LogveilError::Configuration("custom type 'ticket' has no pattern".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: custom type 'ticket' has no pattern"
        );
    }

    #[test]
    fn conflict_display_names_line_and_field() {
        let conflict = ReconstructionConflict {
            line_no: 7,
            field: "src_ip".to_string(),
            offset: 12,
            reason: ConflictReason::ContentMismatch,
        };
        assert_eq!(
            conflict.to_string(),
            "line 7: cannot replace field 'src_ip' at offset 12 (ContentMismatch)"
        );
    }
}
