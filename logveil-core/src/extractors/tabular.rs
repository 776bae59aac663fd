//! tabular.rs - Tab-separated connection summaries.
//!
//! These logs are rewritten column-in/column-out: each data row is parsed
//! into a record and later re-emitted from the anonymized record, so no
//! offsets are tracked. Comment lines (`#...`), blank lines and rows with the
//! wrong column count are passed through unchanged.

use std::collections::HashMap;

use crate::extractor::{split_lines, Extraction, FieldExtractor, LineMatch};
use crate::grammars::CONNECTION_SUMMARY_COLUMNS;
use crate::record::LogRecord;

#[derive(Debug, Clone)]
pub struct TabularExtractor {
    name: String,
    columns: Vec<String>,
    sensitive: Vec<String>,
}

impl TabularExtractor {
    pub fn new(name: &str, columns: Vec<String>, sensitive: Vec<String>) -> Self {
        Self { name: name.to_string(), columns, sensitive }
    }

    pub fn connection_summary(sensitive: Vec<String>) -> Self {
        Self::new(
            "connection-summary",
            CONNECTION_SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            sensitive,
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Re-emits `raw` with every data row rebuilt from its record.
    pub fn render(&self, raw: &str, records: &[LogRecord]) -> String {
        let by_line: HashMap<usize, &LogRecord> = records.iter().map(|r| (r.line_no, r)).collect();
        let mut out = String::with_capacity(raw.len());

        for (idx, (content, terminator)) in split_lines(raw).into_iter().enumerate() {
            match by_line.get(&(idx + 1)) {
                Some(record) => {
                    let row: Vec<&str> = self
                        .columns
                        .iter()
                        .map(|c| record.get(c).unwrap_or(""))
                        .collect();
                    out.push_str(&row.join("\t"));
                }
                None => out.push_str(content),
            }
            out.push_str(terminator);
        }
        out
    }
}

impl FieldExtractor for TabularExtractor {
    fn format_name(&self) -> &str {
        &self.name
    }

    fn sensitive_fields(&self) -> &[String] {
        &self.sensitive
    }

    fn extract_line(&self, line_no: usize, line: &str) -> LineMatch {
        if line.trim().is_empty() || line.starts_with('#') {
            return LineMatch::Skipped;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        if cells.len() != self.columns.len() {
            return LineMatch::Mismatch;
        }

        let mut extraction = Extraction::new(line_no);
        for (column, cell) in self.columns.iter().zip(cells) {
            extraction.set(column, cell, None);
        }
        LineMatch::Matched(extraction)
    }

    fn tracks_offsets(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::extract_text;

    const LOG: &str = "#separator \\x09\n2025-04-13T14:02:15.123Z\tC1\t192.168.1.3\t12347\t10.0.0.3\t22\tTCP\tssh\nshort\trow\n";

    #[test]
    fn rows_become_records_without_ledger_entries() {
        let extractor = TabularExtractor::connection_summary(vec!["src_ip".into()]);
        let output = extract_text(&extractor, LOG);
        assert_eq!(output.records.len(), 1);
        assert!(output.ledger.is_empty());
        assert_eq!(output.mismatches.len(), 1);
        assert_eq!(output.records[0].line_no, 2);
        assert_eq!(output.records[0].get("service"), Some("ssh"));
    }

    #[test]
    fn render_rebuilds_data_rows_only() {
        let extractor = TabularExtractor::connection_summary(vec![]);
        let mut output = extract_text(&extractor, LOG);
        output.records[0].set("src_ip", "7.7.7.7");

        let rendered = extractor.render(LOG, &output.records);
        let expected = LOG.replace("192.168.1.3", "7.7.7.7");
        assert_eq!(rendered, expected);
    }
}
