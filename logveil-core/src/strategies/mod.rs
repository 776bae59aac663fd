//! strategies/mod.rs - The anonymization strategy library.
//!
//! Strategies are value transforms grouped by field class. Per-value
//! functions return `Result<String, InvalidValue>`; the column helpers in
//! this module aggregate those results into a `ColumnOutcome` so one bad
//! value never aborts a batch and the caller still sees how many values of
//! which kind failed.
//!
//! Stateful strategies (salted hash caches) receive their state through an
//! explicit `StableMap` that lives for one run.
//!
//! License: MIT OR APACHE 2.0

pub mod address;
pub mod condensation;
pub mod context;
pub mod cryptopan;
pub mod noise;
pub mod numeric;
pub mod port;
pub mod text;
pub mod timestamp;

use rayon::prelude::*;

use crate::errors::InvalidValue;

pub use context::StableMap;

/// What a column helper writes in place of a value that failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnInvalid {
    /// Keep the original text.
    PassThrough,
    /// Write a fixed marker such as `INVALID_IP`.
    Marker(&'static str),
}

/// Result of transforming a whole column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnOutcome {
    /// Output values, aligned with the input column.
    pub values: Vec<String>,
    /// Positions (within the column) and errors of values that failed.
    pub invalid: Vec<(usize, InvalidValue)>,
}

impl ColumnOutcome {
    /// Collects per-value results, substituting failures per `on_invalid`.
    pub fn collect<I>(inputs: &[&str], results: I, on_invalid: OnInvalid) -> Self
    where
        I: IntoIterator<Item = Result<String, InvalidValue>>,
    {
        let mut outcome = ColumnOutcome {
            values: Vec::with_capacity(inputs.len()),
            invalid: Vec::new(),
        };
        for (idx, (input, result)) in inputs.iter().zip(results).enumerate() {
            match result {
                Ok(value) => outcome.values.push(value),
                Err(err) => {
                    outcome.values.push(match on_invalid {
                        OnInvalid::PassThrough => (*input).to_string(),
                        OnInvalid::Marker(marker) => marker.to_string(),
                    });
                    outcome.invalid.push((idx, err));
                }
            }
        }
        outcome
    }

    /// A column left exactly as it was.
    pub fn unchanged(inputs: &[&str]) -> Self {
        ColumnOutcome {
            values: inputs.iter().map(|v| v.to_string()).collect(),
            invalid: Vec::new(),
        }
    }
}

/// Applies a stateless or lock-guarded per-value transform across a column in parallel.
pub fn map_column<F>(inputs: &[&str], on_invalid: OnInvalid, transform: F) -> ColumnOutcome
where
    F: Fn(&str) -> Result<String, InvalidValue> + Sync,
{
    let results: Vec<Result<String, InvalidValue>> =
        inputs.par_iter().map(|value| transform(*value)).collect();
    ColumnOutcome::collect(inputs, results, on_invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValueKind;

    fn double(v: &str) -> Result<String, InvalidValue> {
        v.parse::<i64>()
            .map(|n| (n * 2).to_string())
            .map_err(|_| InvalidValue::new(ValueKind::Numeric, v))
    }

    #[test]
    fn failures_are_counted_not_fatal() {
        let inputs = ["1", "x", "3"];
        let outcome = map_column(&inputs, OnInvalid::PassThrough, double);
        assert_eq!(outcome.values, vec!["2", "x", "6"]);
        assert_eq!(outcome.invalid.len(), 1);
        assert_eq!(outcome.invalid[0].0, 1);
        assert_eq!(outcome.invalid[0].1.kind, ValueKind::Numeric);
    }

    #[test]
    fn marker_replaces_failures() {
        let inputs = ["oops"];
        let outcome = map_column(&inputs, OnInvalid::Marker("INVALID"), double);
        assert_eq!(outcome.values, vec!["INVALID"]);
    }
}
