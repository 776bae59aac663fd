// logveil-core/src/reconstruct.rs
//! Substitutes anonymized values back into the original text.
//!
//! Ledger entries are grouped by line and applied right-to-left (descending
//! offset), so replacing a field never moves the offsets of fields to its
//! left. Each replacement is verified first: the recorded range must lie on
//! character boundaries, still hold the recorded original text, and not
//! overlap a range already replaced on the line. Failures are skipped and
//! reported as `ReconstructionConflict`s; the rest of the line proceeds.
//!
//! Entries without an offset are audit-only and skipped silently. Lines
//! without entries, and every line terminator, pass through byte-for-byte.
//!
//! License: MIT OR APACHE 2.0

use std::ops::Range;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::errors::{ConflictReason, ReconstructionConflict};
use crate::extractor::split_lines;
use crate::ledger::{loggable, MappingEntry, MappingLedger};
use crate::record::AnonymizedTable;

/// Where an anonymized value ended up in the rewritten line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedReplacement {
    pub field: String,
    pub original_offset: usize,
    pub new_offset: usize,
    pub value: String,
}

/// Result of rewriting one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineOutcome {
    pub text: String,
    /// Applied replacements in left-to-right order.
    pub applied: Vec<AppliedReplacement>,
    pub conflicts: Vec<ReconstructionConflict>,
}

/// Rewrites one line (terminator excluded).
///
/// `lookup` returns the anonymized value for an entry, or `None` to leave the
/// original bytes in place.
pub fn reconstruct_line<'v, F>(line_no: usize, line: &str, entries: &[&MappingEntry], lookup: F) -> LineOutcome
where
    F: Fn(&MappingEntry) -> Option<&'v str>,
{
    let mut positioned: Vec<(&MappingEntry, usize)> = entries
        .iter()
        .filter_map(|entry| entry.offset.map(|offset| (*entry, offset)))
        .collect();
    positioned.sort_by(|a, b| b.1.cmp(&a.1));

    let mut text = line.to_string();
    let mut taken: Vec<Range<usize>> = Vec::new();
    // (original range, replacement) for each applied entry
    let mut applied: Vec<(Range<usize>, &MappingEntry, &'v str)> = Vec::new();
    let mut conflicts = Vec::new();

    for (entry, offset) in positioned {
        let Some(replacement) = lookup(entry) else {
            debug!("Line {}: no anonymized value for field '{}', keeping original.", line_no, entry.field);
            continue;
        };
        let range = offset..offset + entry.original_value.len();
        let conflict = |reason| ReconstructionConflict {
            line_no,
            field: entry.field.clone(),
            offset,
            reason,
        };

        if taken.iter().any(|r| r.start < range.end && range.start < r.end) {
            conflicts.push(conflict(ConflictReason::Overlap));
            continue;
        }
        // Ranges are checked against the untouched original; everything to the
        // right of `range.start` may already have been rewritten.
        match line.get(range.clone()) {
            None => {
                conflicts.push(conflict(ConflictReason::OutOfBounds));
                continue;
            }
            Some(current) if current != entry.original_value => {
                debug!(
                    "Line {}: field '{}' expected '{}' at offset {}",
                    line_no,
                    entry.field,
                    loggable(&entry.original_value),
                    offset
                );
                conflicts.push(conflict(ConflictReason::ContentMismatch));
                continue;
            }
            Some(_) => {}
        }

        text.replace_range(range.clone(), replacement);
        taken.push(range.clone());
        applied.push((range, entry, replacement));
    }

    for conflict in &conflicts {
        warn!("{}", conflict);
    }

    // Replay left-to-right to find where each value landed.
    applied.sort_by_key(|(range, _, _)| range.start);
    let mut shift: isize = 0;
    let applied = applied
        .into_iter()
        .map(|(range, entry, value)| {
            let new_offset = (range.start as isize + shift) as usize;
            shift += value.len() as isize - range.len() as isize;
            AppliedReplacement {
                field: entry.field.clone(),
                original_offset: range.start,
                new_offset,
                value: value.to_string(),
            }
        })
        .collect();

    LineOutcome { text, applied, conflicts }
}

/// Reconstruction of a whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconstructionOutput {
    pub text: String,
    pub replaced: usize,
    pub conflicts: Vec<ReconstructionConflict>,
}

/// Rewrites every line of `raw` from the ledger and the anonymized table,
/// in parallel by line.
pub fn reconstruct_text(raw: &str, ledger: &MappingLedger, table: &AnonymizedTable) -> ReconstructionOutput {
    let lines = split_lines(raw);
    let by_line = ledger.by_line();
    info!(
        "Reconstructing {} line(s) from {} ledger entr(ies).",
        lines.len(),
        ledger.len()
    );

    let outcomes: Vec<Option<LineOutcome>> = lines
        .par_iter()
        .enumerate()
        .map(|(idx, (content, _))| {
            let line_no = idx + 1;
            by_line.get(&line_no).map(|entries| {
                reconstruct_line(line_no, content, entries, |entry| table.get(entry.line_no, &entry.field))
            })
        })
        .collect();

    let mut output = ReconstructionOutput {
        text: String::with_capacity(raw.len()),
        ..Default::default()
    };
    for ((content, terminator), outcome) in lines.iter().zip(outcomes) {
        match outcome {
            Some(outcome) => {
                output.text.push_str(&outcome.text);
                output.replaced += outcome.applied.len();
                output.conflicts.extend(outcome.conflicts);
            }
            None => output.text.push_str(content),
        }
        output.text.push_str(terminator);
    }

    info!(
        "Reconstruction finished: {} replacement(s), {} conflict(s).",
        output.replaced,
        output.conflicts.len()
    );
    output
}
