// logveil-core/src/record.rs
//! Structured records produced by extraction and the anonymized table that
//! pairs with the Mapping Ledger.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

/// One matched log line as a mapping of field name to text value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogRecord {
    pub line_no: usize,
    pub fields: BTreeMap<String, String>,
}

impl LogRecord {
    pub fn new(line_no: usize) -> Self {
        Self { line_no, fields: BTreeMap::new() }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }
}

/// Collects `(record index, value)` for every record carrying `field`.
pub fn column<'a>(records: &'a [LogRecord], field: &str) -> Vec<(usize, &'a str)> {
    records
        .iter()
        .enumerate()
        .filter_map(|(idx, r)| r.get(field).map(|v| (idx, v)))
        .collect()
}

/// Writes `values` back to `field` of the records at `indices`.
pub fn set_column(records: &mut [LogRecord], field: &str, indices: &[usize], values: Vec<String>) {
    for (&idx, value) in indices.iter().zip(values) {
        if let Some(record) = records.get_mut(idx) {
            record.set(field, value);
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TableRow {
    line_no: usize,
    #[serde(flatten)]
    fields: BTreeMap<String, String>,
}

/// Anonymized values keyed by `(line_no, field)`.
///
/// Joined with the ledger on the same key to drive reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnonymizedTable {
    rows: BTreeMap<usize, BTreeMap<String, String>>,
}

impl AnonymizedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from records, keeping only `fields`.
    pub fn from_records(records: &[LogRecord], fields: &[String]) -> Self {
        let mut table = Self::new();
        for record in records {
            for field in fields {
                if let Some(value) = record.get(field) {
                    table.insert(record.line_no, field.clone(), value.to_string());
                }
            }
        }
        table
    }

    pub fn insert(&mut self, line_no: usize, field: String, value: String) {
        self.rows.entry(line_no).or_default().insert(field, value);
    }

    pub fn get(&self, line_no: usize, field: &str) -> Option<&str> {
        self.rows.get(&line_no)?.get(field).map(String::as_str)
    }

    /// Number of rows (lines) in the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> Result<()> {
        for (line_no, fields) in &self.rows {
            let row = TableRow { line_no: *line_no, fields: fields.clone() };
            serde_json::to_writer(&mut writer, &row).context("Failed to serialize table row")?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = Self::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read table row")?;
            if line.trim().is_empty() {
                continue;
            }
            let row: TableRow = serde_json::from_str(&line)
                .with_context(|| format!("Malformed table row {}", idx + 1))?;
            table.rows.entry(row.line_no).or_default().extend(row.fields);
        }
        Ok(table)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        info!("Writing anonymized table ({} rows) to {}", self.len(), path.display());
        let file = File::create(path)
            .with_context(|| format!("Failed to create table file {}", path.display()))?;
        self.write_jsonl(BufWriter::new(file))
    }

    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading anonymized table from {}", path.display());
        let file = File::open(path)
            .with_context(|| format!("Failed to open table file {}", path.display()))?;
        Self::read_jsonl(BufReader::new(file))
    }
}
