// logveil-core/src/audit.rs
//! Privacy/utility audit of one anonymized column.
//!
//! Pairs every original value with its anonymized counterpart (joined on
//! `line_no`) and measures:
//!
//! - Shannon entropy of both columns and its change;
//! - the uniqueness ratio (distinct / total) of the anonymized column, with
//!   columns below a threshold flagged as low-entropy;
//! - for dotted-quad columns, the per-octet collision rate of the stable map
//!   and the Jaccard index of /24 networks before and after.
//!
//! The collision rate is the share of original octets that landed on an
//! anonymized octet already claimed by a different original.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::{info, warn};
use logveil_stats::entropy::entropy_of_counts;
use logveil_stats::Bits;
use serde::Serialize;

use crate::record::{AnonymizedTable, LogRecord};

/// Uniqueness ratio under which a column is reported as low-entropy.
pub const DEFAULT_UNIQUENESS_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OctetAudit {
    /// Collision rate per octet position, most significant first.
    pub collision_rates: [f64; 4],
    /// Jaccard index of the /24 networks of both columns.
    pub subnet_jaccard: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnAudit {
    pub field: String,
    pub pairs: usize,
    pub entropy_original: Bits,
    pub entropy_anonymized: Bits,
    pub entropy_delta: Bits,
    pub uniqueness: f64,
    pub low_entropy: bool,
    pub octets: Option<OctetAudit>,
}

/// Joins `field` of the original records with the anonymized table.
pub fn paired_values(original: &[LogRecord], table: &AnonymizedTable, field: &str) -> Vec<(String, String)> {
    original
        .iter()
        .filter_map(|record| {
            let before = record.get(field)?;
            let after = table.get(record.line_no, field)?;
            Some((before.to_string(), after.to_string()))
        })
        .collect()
}

fn column_entropy<'a>(values: impl Iterator<Item = &'a str>) -> Bits {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let counts: Vec<usize> = counts.into_values().collect();
    entropy_of_counts(&counts)
}

fn dotted_quad(value: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = value.split('.').collect();
    (parts.len() == 4).then_some(parts)
}

fn network(value: &str) -> &str {
    value.rsplit_once('.').map_or(value, |(net, _)| net)
}

fn octet_audit(pairs: &[(String, String)]) -> Option<OctetAudit> {
    // anonymized octet -> set of original octets, per position
    let mut preimages: [HashMap<&str, HashSet<&str>>; 4] = Default::default();
    for (before, after) in pairs {
        let before = dotted_quad(before)?;
        let after = dotted_quad(after)?;
        for (pos, table) in preimages.iter_mut().enumerate() {
            table.entry(after[pos]).or_default().insert(before[pos]);
        }
    }

    let mut collision_rates = [0.0; 4];
    for (rate, table) in collision_rates.iter_mut().zip(&preimages) {
        let total: usize = table.values().map(HashSet::len).sum();
        let repeats: usize = table.values().map(|set| set.len().saturating_sub(1)).sum();
        *rate = if total == 0 { 0.0 } else { repeats as f64 / total as f64 };
    }

    let before: BTreeSet<&str> = pairs.iter().map(|(b, _)| network(b)).collect();
    let after: BTreeSet<&str> = pairs.iter().map(|(_, a)| network(a)).collect();
    let union = before.union(&after).count();
    let subnet_jaccard = if union == 0 {
        0.0
    } else {
        before.intersection(&after).count() as f64 / union as f64
    };

    Some(OctetAudit { collision_rates, subnet_jaccard })
}

/// Audits one column of `(original, anonymized)` pairs.
pub fn audit_column(field: &str, pairs: &[(String, String)], uniqueness_threshold: f64) -> ColumnAudit {
    let entropy_original = column_entropy(pairs.iter().map(|(b, _)| b.as_str()));
    let entropy_anonymized = column_entropy(pairs.iter().map(|(_, a)| a.as_str()));
    let distinct: HashSet<&str> = pairs.iter().map(|(_, a)| a.as_str()).collect();
    let uniqueness = if pairs.is_empty() {
        0.0
    } else {
        distinct.len() as f64 / pairs.len() as f64
    };
    let low_entropy = uniqueness <= uniqueness_threshold;
    if low_entropy {
        warn!(
            "Field '{}' is low-entropy after anonymization (uniqueness {:.3}).",
            field, uniqueness
        );
    }

    let audit = ColumnAudit {
        field: field.to_string(),
        pairs: pairs.len(),
        entropy_original,
        entropy_anonymized,
        entropy_delta: entropy_anonymized - entropy_original,
        uniqueness,
        low_entropy,
        octets: if pairs.is_empty() { None } else { octet_audit(pairs) },
    };
    info!(
        "Audited '{}': {} pair(s), entropy {:.3} -> {:.3} bits.",
        field, audit.pairs, audit.entropy_original, audit.entropy_anonymized
    );
    audit
}
