// logveil-core/src/ledger.rs
//! The Mapping Ledger: the append-only record of where every sensitive value
//! sat in the original log.
//!
//! Each `MappingEntry` ties a `(line_no, field)` pair to the exact original
//! text and its byte offset inside the line. The reconstructor uses these
//! entries to substitute anonymized values back without touching any other
//! byte. Entries are immutable once appended, and the ledger refuses an entry
//! whose byte range overlaps one already recorded on the same line.
//!
//! This module also holds the debug-logging helpers that keep original values
//! out of logs unless `LOGVEIL_ALLOW_DEBUG_PII=true`.
//!
//! License: MIT OR APACHE 2.0

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    /// Whether original values may appear in debug logs.
    static ref PII_DEBUG_ALLOWED: bool = {
        std::env::var("LOGVEIL_ALLOW_DEBUG_PII")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
}

/// Replaces a sensitive value with a length hint.
pub fn redact_sensitive(s: &str) -> String {
    const MAX_LEN: usize = 8;
    if s.len() <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", s.len())
    }
}

/// Returns `value` itself only when PII debugging is explicitly enabled.
pub fn loggable(value: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        value.to_string()
    } else {
        redact_sensitive(value)
    }
}

pub fn log_mapping_debug(module_path: &str, entry: &MappingEntry) {
    debug!(
        "{} Ledger entry: line={}, field='{}', offset={:?}, original='{}'",
        module_path,
        entry.line_no,
        entry.field,
        entry.offset,
        loggable(&entry.original_value)
    );
}

/// One sensitive field occurrence in the raw log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// 1-based line number in the raw input.
    pub line_no: usize,
    /// Field name as produced by the grammar.
    pub field: String,
    /// The exact original text of the field.
    pub original_value: String,
    /// Byte offset of `original_value` inside the line (terminator excluded).
    /// `None` for derived fields that have no positional span; persisted as -1.
    #[serde(with = "offset_sentinel")]
    pub offset: Option<usize>,
}

impl MappingEntry {
    /// The byte range this entry covers, if it has a position.
    pub fn span(&self) -> Option<Range<usize>> {
        self.offset.map(|start| start..start + self.original_value.len())
    }
}

/// Serde adapter that stores an absent offset as `-1`.
mod offset_sentinel {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(offset: &Option<usize>, s: S) -> Result<S::Ok, S::Error> {
        match offset {
            Some(o) => s.serialize_u64(*o as u64),
            None => s.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
        let raw = i64::deserialize(d)?;
        if raw < 0 {
            Ok(None)
        } else {
            usize::try_from(raw).map(Some).map_err(D::Error::custom)
        }
    }
}

/// Returned when an appended entry would overlap an existing one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line_no}: field '{field}' overlaps the span of field '{existing_field}'")]
pub struct OverlappingSpan {
    pub line_no: usize,
    pub field: String,
    pub existing_field: String,
}

/// Append-only store of `MappingEntry` values.
#[derive(Debug, Default, Clone)]
pub struct MappingLedger {
    entries: Vec<MappingEntry>,
    // line_no -> (span, index into entries)
    spans: HashMap<usize, Vec<(Range<usize>, usize)>>,
}

impl MappingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, rejecting it if its span overlaps another on the same line.
    pub fn append(&mut self, entry: MappingEntry) -> std::result::Result<(), OverlappingSpan> {
        if let Some(span) = entry.span() {
            let line_spans = self.spans.entry(entry.line_no).or_default();
            if let Some((_, idx)) = line_spans
                .iter()
                .find(|(existing, _)| existing.start < span.end && span.start < existing.end)
            {
                return Err(OverlappingSpan {
                    line_no: entry.line_no,
                    field: entry.field,
                    existing_field: self.entries[*idx].field.clone(),
                });
            }
            line_spans.push((span, self.entries.len()));
        }
        log_mapping_debug(module_path!(), &entry);
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter()
    }

    /// Entries grouped by line number, in append order within each line.
    pub fn by_line(&self) -> BTreeMap<usize, Vec<&MappingEntry>> {
        let mut grouped: BTreeMap<usize, Vec<&MappingEntry>> = BTreeMap::new();
        for entry in &self.entries {
            grouped.entry(entry.line_no).or_default().push(entry);
        }
        grouped
    }

    /// Writes the ledger as JSON lines, one entry per line.
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> Result<()> {
        for entry in &self.entries {
            serde_json::to_writer(&mut writer, entry).context("Failed to serialize ledger entry")?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a JSON-lines ledger. Overlapping rows are rejected.
    pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Self> {
        let mut ledger = Self::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read ledger row")?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: MappingEntry = serde_json::from_str(&line)
                .with_context(|| format!("Malformed ledger row {}", idx + 1))?;
            ledger
                .append(entry)
                .with_context(|| format!("Ledger row {} is inconsistent", idx + 1))?;
        }
        Ok(ledger)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        info!("Writing mapping ledger ({} entries) to {}", self.len(), path.display());
        let file = File::create(path)
            .with_context(|| format!("Failed to create ledger file {}", path.display()))?;
        self.write_jsonl(BufWriter::new(file))
    }

    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading mapping ledger from {}", path.display());
        let file = File::open(path)
            .with_context(|| format!("Failed to open ledger file {}", path.display()))?;
        Self::read_jsonl(BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(line_no: usize, field: &str, value: &str, offset: Option<usize>) -> MappingEntry {
        MappingEntry {
            line_no,
            field: field.to_string(),
            original_value: value.to_string(),
            offset,
        }
    }

    #[test]
    fn rejects_overlapping_span_on_same_line() {
        let mut ledger = MappingLedger::new();
        ledger.append(entry(1, "src_ip", "10.0.0.1", Some(4))).unwrap();
        let err = ledger.append(entry(1, "net", "10.0.0", Some(4))).unwrap_err();
        assert_eq!(err.existing_field, "src_ip");
        // Same range on another line is fine, and adjacent spans do not overlap.
        ledger.append(entry(2, "net", "10.0.0", Some(4))).unwrap();
        ledger.append(entry(1, "src_port", "80", Some(13))).unwrap();
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn sentinel_entries_never_conflict() {
        let mut ledger = MappingLedger::new();
        ledger.append(entry(1, "severity", "5", None)).unwrap();
        ledger.append(entry(1, "facility", "1", None)).unwrap();
        assert_eq!(ledger.by_line()[&1].len(), 2);
    }

    #[test]
    fn jsonl_persists_sentinel_as_minus_one() -> Result<()> {
        let mut ledger = MappingLedger::new();
        ledger.append(entry(3, "timestamp", "Apr 13 14:02:15", Some(0)))?;
        ledger.append(entry(3, "severity", "5", None))?;

        let mut buf = Vec::new();
        ledger.write_jsonl(&mut buf)?;
        let text = String::from_utf8(buf.clone())?;
        assert!(text.contains("\"offset\":-1"));
        assert!(text.contains("\"offset\":0"));

        let restored = MappingLedger::read_jsonl(buf.as_slice())?;
        assert_eq!(restored.entries(), ledger.entries());
        Ok(())
    }

    #[test]
    fn redacts_values_by_default() {
        assert_eq!(redact_sensitive("10.0.0.1"), "[REDACTED]");
        assert_eq!(redact_sensitive("192.168.100.200"), "[REDACTED: 15 chars]");
    }
}
