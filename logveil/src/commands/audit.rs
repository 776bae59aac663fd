//! `logveil audit`: compares one field before and after anonymization.

use anyhow::{bail, Context, Result};
use is_terminal::IsTerminal;
use log::info;
use std::io::{self, Write};
use std::path::PathBuf;

use logveil_core::{
    audit_column, build_extractor, extract_text, paired_values, AnonymizedTable, LogFormat, LogRecord,
};

use crate::commands::read_input;
use crate::ui::summary;
use crate::ui::theme::ThemeMap;

pub struct AuditOptions {
    pub original: PathBuf,
    pub table: PathBuf,
    pub field: String,
    pub log_type: String,
    pub threshold: f64,
    pub json: bool,
}

/// Re-extracts the original records so their values can be joined on `line_no`.
fn original_records(log_type: &str, raw: &str) -> Result<Vec<LogRecord>> {
    let format = LogFormat::from_tag(log_type, None)?;
    let extractor = build_extractor(&format, None)?;
    Ok(extract_text(&*extractor, raw).records)
}

pub fn run_audit(opts: AuditOptions, theme: &ThemeMap) -> Result<()> {
    info!("Starting audit of field '{}'.", opts.field);
    if !(0.0..=1.0).contains(&opts.threshold) {
        bail!("threshold {} is outside [0, 1]", opts.threshold);
    }

    let raw = read_input(Some(&opts.original))?;
    let records = original_records(&opts.log_type, &raw)?;
    let table = AnonymizedTable::load(&opts.table)?;

    let pairs = paired_values(&records, &table, &opts.field);
    if pairs.is_empty() {
        bail!("No values of field '{}' could be joined between the original log and the table", opts.field);
    }
    let audit = audit_column(&opts.field, &pairs, opts.threshold);

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    if opts.json {
        let json = serde_json::to_string_pretty(&audit).context("Failed to serialize audit")?;
        writeln!(writer, "{json}")?;
    } else {
        let colors = stdout.is_terminal();
        summary::print_audit(&audit, &mut writer, theme, colors)?;
    }
    Ok(())
}
