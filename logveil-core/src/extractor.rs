// logveil-core/src/extractor.rs
//! Defines the `FieldExtractor` trait, the single interface through which
//! every log format turns raw lines into records and ledger entries.
//!
//! `extract_text` drives an extractor over a whole document in parallel
//! (one task per line) and then materializes the results in line order:
//! records for the strategy stage and a `MappingLedger` for reconstruction.

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::errors::{LogveilError, ParseMismatch};
use crate::extractors::regex_extractor::RegexExtractor;
use crate::extractors::syslog::SyslogExtractor;
use crate::extractors::tabular::TabularExtractor;
use crate::grammars::LogFormat;
use crate::ledger::{MappingEntry, MappingLedger, OverlappingSpan};
use crate::record::LogRecord;

/// A field pulled out of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedField {
    pub name: String,
    pub value: String,
    /// Byte offset in the line, or `None` for derived fields.
    pub offset: Option<usize>,
}

/// All fields of one matched line, in grammar order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    pub line_no: usize,
    pub fields: Vec<ExtractedField>,
}

impl Extraction {
    pub fn new(line_no: usize) -> Self {
        Self { line_no, fields: Vec::new() }
    }

    /// Sets a field, replacing any earlier value of the same name.
    pub fn set(&mut self, name: &str, value: &str, offset: Option<usize>) {
        let field = ExtractedField {
            name: name.to_string(),
            value: value.to_string(),
            offset,
        };
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ExtractedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn to_record(&self) -> LogRecord {
        let mut record = LogRecord::new(self.line_no);
        for field in &self.fields {
            record.set(field.name.clone(), field.value.clone());
        }
        record
    }
}

/// Result of offering one line to an extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMatch {
    Matched(Extraction),
    /// Blank lines and comments: nothing to extract, not an error.
    Skipped,
    /// The line does not fit the grammar.
    Mismatch,
}

/// The interface every log format implements.
pub trait FieldExtractor: Send + Sync {
    /// Stable name of the format, used in logs and reports.
    fn format_name(&self) -> &str;

    /// Fields that are entered into the Mapping Ledger.
    fn sensitive_fields(&self) -> &[String];

    /// Parses a single line (terminator already removed).
    fn extract_line(&self, line_no: usize, line: &str) -> LineMatch;

    /// Whether extracted fields carry byte offsets for in-place reconstruction.
    /// Column-oriented formats return `false` and are rewritten row by row.
    fn tracks_offsets(&self) -> bool {
        true
    }
}

/// Builds the extractor for `format`. `sensitive_override` replaces the
/// format's default sensitive field list when given.
pub fn build_extractor(
    format: &LogFormat,
    sensitive_override: Option<&[String]>,
) -> Result<Box<dyn FieldExtractor>, LogveilError> {
    let sensitive = sensitive_override
        .map(|fields| fields.to_vec())
        .unwrap_or_else(|| format.default_sensitive_fields());

    let extractor: Box<dyn FieldExtractor> = match format {
        LogFormat::Syslog => Box::new(SyslogExtractor::new(sensitive)?),
        LogFormat::ConnectionSummary => Box::new(TabularExtractor::connection_summary(sensitive)),
        LogFormat::Custom { pattern, .. } => Box::new(RegexExtractor::new(format.name(), pattern, sensitive)?),
        LogFormat::IntrusionAlert | LogFormat::Firewall | LogFormat::PerimeterFilter => {
            // Built-in grammars are fixed; an override naming an unknown group is still an error.
            let pattern = format.pattern().ok_or_else(|| {
                LogveilError::Fatal(format!("format '{}' has no grammar", format.name()))
            })?;
            Box::new(RegexExtractor::new(format.name(), pattern, sensitive)?)
        }
    };
    Ok(extractor)
}

/// Splits `raw` into `(content, terminator)` pairs. The terminator is
/// `"\n"`, `"\r\n"` or empty for a final unterminated line.
pub fn split_lines(raw: &str) -> Vec<(&str, &str)> {
    raw.split_inclusive('\n')
        .map(|line| {
            if let Some(body) = line.strip_suffix("\r\n") {
                (body, "\r\n")
            } else if let Some(body) = line.strip_suffix('\n') {
                (body, "\n")
            } else {
                (line, "")
            }
        })
        .collect()
}

/// Everything extraction produces for one document.
#[derive(Debug, Default)]
pub struct ExtractionOutput {
    pub records: Vec<LogRecord>,
    pub ledger: MappingLedger,
    pub mismatches: Vec<ParseMismatch>,
    /// Sensitive fields refused by the ledger because their span overlapped another.
    pub overlaps: Vec<OverlappingSpan>,
    pub lines_total: usize,
}

/// Runs `extractor` over every line of `raw`.
///
/// Lines are processed in parallel; the ledger is then filled sequentially
/// in line order so its content does not depend on scheduling.
pub fn extract_text(extractor: &dyn FieldExtractor, raw: &str) -> ExtractionOutput {
    let lines = split_lines(raw);
    info!(
        "Extracting fields from {} line(s) using format '{}'",
        lines.len(),
        extractor.format_name()
    );

    let matches: Vec<LineMatch> = lines
        .par_iter()
        .enumerate()
        .map(|(idx, (content, _))| extractor.extract_line(idx + 1, content))
        .collect();

    let mut output = ExtractionOutput {
        lines_total: lines.len(),
        ..Default::default()
    };
    let sensitive = extractor.sensitive_fields();

    for (idx, outcome) in matches.into_iter().enumerate() {
        let line_no = idx + 1;
        let extraction = match outcome {
            LineMatch::Matched(extraction) => extraction,
            LineMatch::Skipped => continue,
            LineMatch::Mismatch => {
                debug!("Line {} does not match format '{}', passing through.", line_no, extractor.format_name());
                output.mismatches.push(ParseMismatch { line_no });
                continue;
            }
        };

        if extractor.tracks_offsets() {
            for name in sensitive {
                let Some(field) = extraction.get(name) else { continue };
                if field.value.is_empty() {
                    continue;
                }
                let entry = MappingEntry {
                    line_no,
                    field: field.name.clone(),
                    original_value: field.value.clone(),
                    offset: field.offset,
                };
                if let Err(overlap) = output.ledger.append(entry) {
                    warn!("{}", overlap);
                    output.overlaps.push(overlap);
                }
            }
        }
        output.records.push(extraction.to_record());
    }

    info!(
        "Extraction finished: {} record(s), {} ledger entr(ies), {} mismatch(es).",
        output.records.len(),
        output.ledger.len(),
        output.mismatches.len()
    );
    output
}
