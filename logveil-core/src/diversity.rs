// logveil-core/src/diversity.rs
//! Group-level diversity filters applied after anonymization.
//!
//! Records are grouped by the values of their key fields. A record lacking
//! any key field joins a single `Missing` group; a record lacking the
//! sensitive field contributes no sensitive value to its group.
//!
//! - `l_diversity` keeps groups with at least `l` distinct sensitive values.
//! - `t_closeness` keeps groups whose sensitive-value distribution lies within
//!   an ordered earth-mover's distance `t` of the whole dataset's.
//!
//! Both return the kept records in input order, the line numbers dropped and
//! one verdict per group.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, info};
use logveil_stats::distance::ordered_emd;
use serde::Serialize;

use crate::record::LogRecord;

/// Identity of a group of records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    /// Key field values in `key_fields` order.
    Values(Vec<String>),
    /// At least one key field was absent.
    Missing,
}

/// Outcome for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupVerdict {
    pub key: GroupKey,
    pub size: usize,
    /// Distinct sensitive values (l-diversity) or distance to the global
    /// distribution (t-closeness).
    pub score: f64,
    pub kept: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiversityReport {
    pub kept: Vec<LogRecord>,
    pub dropped_lines: Vec<usize>,
    pub verdicts: Vec<GroupVerdict>,
}

impl DiversityReport {
    pub fn groups_dropped(&self) -> usize {
        self.verdicts.iter().filter(|v| !v.kept).count()
    }
}

fn group_key(record: &LogRecord, key_fields: &[String]) -> GroupKey {
    key_fields
        .iter()
        .map(|f| record.get(f).map(str::to_string))
        .collect::<Option<Vec<String>>>()
        .map_or(GroupKey::Missing, GroupKey::Values)
}

fn group_records(records: &[LogRecord], key_fields: &[String]) -> BTreeMap<GroupKey, Vec<usize>> {
    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        groups.entry(group_key(record, key_fields)).or_default().push(idx);
    }
    groups
}

/// Splits `records` by the per-group decision in `verdicts`.
fn partition(
    records: &[LogRecord],
    groups: &BTreeMap<GroupKey, Vec<usize>>,
    verdicts: Vec<GroupVerdict>,
) -> DiversityReport {
    let mut keep = vec![false; records.len()];
    for verdict in verdicts.iter().filter(|v| v.kept) {
        if let Some(members) = groups.get(&verdict.key) {
            for &idx in members {
                keep[idx] = true;
            }
        }
    }

    let mut report = DiversityReport {
        verdicts,
        ..Default::default()
    };
    for (record, keep) in records.iter().zip(keep) {
        if keep {
            report.kept.push(record.clone());
        } else {
            report.dropped_lines.push(record.line_no);
        }
    }
    report
}

/// Keeps groups whose `sensitive_field` takes at least `l` distinct values.
pub fn l_diversity(
    records: &[LogRecord],
    key_fields: &[String],
    sensitive_field: &str,
    l: usize,
) -> DiversityReport {
    let groups = group_records(records, key_fields);
    let verdicts: Vec<GroupVerdict> = groups
        .iter()
        .map(|(key, members)| {
            let distinct: BTreeSet<&str> = members
                .iter()
                .filter_map(|&idx| records[idx].get(sensitive_field))
                .collect();
            let kept = distinct.len() >= l;
            debug!(
                "l-diversity group of {} record(s): {} distinct value(s), kept={}",
                members.len(),
                distinct.len(),
                kept
            );
            GroupVerdict {
                key: key.clone(),
                size: members.len(),
                score: distinct.len() as f64,
                kept,
            }
        })
        .collect();

    let report = partition(records, &groups, verdicts);
    info!(
        "l-diversity (l={}): kept {} of {} record(s), dropped {} group(s).",
        l,
        report.kept.len(),
        records.len(),
        report.groups_dropped()
    );
    report
}

/// Orders the distinct observed values: numerically when every value parses
/// as a number, lexicographically otherwise.
fn ordered_support<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let distinct: BTreeSet<&str> = values.collect();
    let mut support: Vec<&str> = distinct.into_iter().collect();
    let numeric: Option<Vec<f64>> = support.iter().map(|v| v.trim().parse::<f64>().ok()).collect();
    if let Some(numbers) = numeric {
        let mut paired: Vec<(f64, &str)> = numbers.into_iter().zip(support).collect();
        paired.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        support = paired.into_iter().map(|(_, v)| v).collect();
    }
    support
}

fn histogram<'a>(values: impl Iterator<Item = &'a str>, rank: &HashMap<&str, usize>, m: usize) -> Vec<f64> {
    let mut counts = vec![0.0; m];
    for value in values {
        if let Some(&r) = rank.get(value) {
            counts[r] += 1.0;
        }
    }
    counts
}

/// Keeps groups whose sensitive distribution is within distance `t` of the
/// global one.
///
/// A group with no sensitive values at all is at distance 1. When the whole
/// dataset has no sensitive values, every group is kept.
pub fn t_closeness(
    records: &[LogRecord],
    key_fields: &[String],
    sensitive_field: &str,
    t: f64,
) -> DiversityReport {
    let support = ordered_support(records.iter().filter_map(|r| r.get(sensitive_field)));
    let rank: HashMap<&str, usize> = support.iter().enumerate().map(|(i, v)| (*v, i)).collect();
    let m = support.len();
    let global = histogram(records.iter().filter_map(|r| r.get(sensitive_field)), &rank, m);

    let groups = group_records(records, key_fields);
    let verdicts: Vec<GroupVerdict> = groups
        .iter()
        .map(|(key, members)| {
            let local = histogram(
                members.iter().filter_map(|&idx| records[idx].get(sensitive_field)),
                &rank,
                m,
            );
            let distance = if m == 0 {
                0.0
            } else if local.iter().all(|&c| c == 0.0) {
                1.0
            } else {
                ordered_emd(&local, &global)
            };
            GroupVerdict {
                key: key.clone(),
                size: members.len(),
                score: distance,
                kept: distance <= t,
            }
        })
        .collect();

    let report = partition(records, &groups, verdicts);
    info!(
        "t-closeness (t={}): kept {} of {} record(s), dropped {} group(s).",
        t,
        report.kept.len(),
        records.len(),
        report.groups_dropped()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(line_no: usize, pairs: &[(&str, &str)]) -> LogRecord {
        let mut record = LogRecord::new(line_no);
        for (k, v) in pairs {
            record.set(*k, *v);
        }
        record
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn l_diversity_drops_homogeneous_groups() {
        let records = vec![
            rec(1, &[("net", "10.0.0"), ("alert", "scan")]),
            rec(2, &[("net", "10.0.0"), ("alert", "worm")]),
            rec(3, &[("net", "10.0.1"), ("alert", "scan")]),
            rec(4, &[("net", "10.0.1"), ("alert", "scan")]),
            rec(5, &[("alert", "scan")]),
        ];
        let report = l_diversity(&records, &keys(&["net"]), "alert", 2);

        assert_eq!(report.kept.iter().map(|r| r.line_no).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(report.dropped_lines, vec![3, 4, 5]);
        let missing = report.verdicts.iter().find(|v| v.key == GroupKey::Missing).unwrap();
        assert_eq!(missing.size, 1);
        assert!(!missing.kept);
    }

    #[test]
    fn l_of_one_still_needs_a_sensitive_value() {
        let records = vec![rec(1, &[("net", "a"), ("alert", "x")]), rec(2, &[("net", "b")])];
        let report = l_diversity(&records, &keys(&["net"]), "alert", 1);
        // The second group has no sensitive value at all.
        assert_eq!(report.kept.len(), 1);
        assert_eq!(report.dropped_lines, vec![2]);
    }

    #[test]
    fn numeric_support_is_ordered_by_value() {
        let support = ordered_support(["10", "9", "100"].into_iter());
        assert_eq!(support, vec!["9", "10", "100"]);
        let support = ordered_support(["b", "10", "a"].into_iter());
        assert_eq!(support, vec!["10", "a", "b"]);
    }

    #[test]
    fn t_closeness_keeps_groups_near_global_distribution() {
        // Global distribution over {1, 2, 3} is (0.5, 0.25, 0.25).
        let records = vec![
            rec(1, &[("g", "a"), ("size", "1")]),
            rec(2, &[("g", "a"), ("size", "2")]),
            rec(3, &[("g", "a"), ("size", "3")]),
            rec(4, &[("g", "b"), ("size", "1")]),
            rec(5, &[("g", "b"), ("size", "1")]),
            rec(6, &[("g", "c"), ("size", "1")]),
            rec(7, &[("g", "c"), ("size", "2")]),
            rec(8, &[("g", "c"), ("size", "3")]),
        ];
        let report = t_closeness(&records, &keys(&["g"]), "size", 0.3);

        let score = |name: &str| {
            report
                .verdicts
                .iter()
                .find(|v| v.key == GroupKey::Values(vec![name.to_string()]))
                .map(|v| v.score)
                .unwrap()
        };
        assert!((score("a") - 0.125).abs() < 1e-9);
        assert!((score("b") - 0.375).abs() < 1e-9);
        assert_eq!(report.dropped_lines, vec![4, 5]);
    }

    #[test]
    fn t_of_one_keeps_every_group_with_values() {
        let records = vec![rec(1, &[("g", "a"), ("v", "x")]), rec(2, &[("g", "b"), ("v", "y")])];
        let report = t_closeness(&records, &keys(&["g"]), "v", 1.0);
        assert_eq!(report.kept.len(), 2);
    }
}
