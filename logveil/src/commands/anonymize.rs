//! `logveil anonymize`: one headless run from configuration to output file.

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::{info, warn};
use std::fs;
use std::io;
use std::path::PathBuf;

use logveil_core::{anonymize_text, AnonymizationConfig};

use crate::commands::{read_input, write_output};
use crate::ui::summary;
use crate::ui::theme::ThemeMap;

/// Options for `run_anonymize`, resolved from the command line.
pub struct AnonymizeOptions {
    pub config: PathBuf,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub ledger_out: Option<PathBuf>,
    pub table_out: Option<PathBuf>,
    pub report_json: Option<PathBuf>,
    pub no_summary: bool,
    pub quiet: bool,
}

pub fn run_anonymize(opts: AnonymizeOptions, theme: &ThemeMap) -> Result<()> {
    info!("Starting anonymize operation.");
    let config = AnonymizationConfig::load_from_file(&opts.config)?;

    // Command-line paths win over the ones named in the configuration.
    let input = opts.input.as_ref().or(config.log_file.as_ref());
    let output = opts.output.as_ref().or(config.output_log.as_ref());

    let raw = read_input(input.map(PathBuf::as_path))?;
    let run = anonymize_text(&config, &raw).context("Anonymization failed")?;

    write_output(output.map(PathBuf::as_path), &run.text)?;
    if let Some(path) = &opts.ledger_out {
        run.ledger.save(path)?;
    }
    if let Some(path) = &opts.table_out {
        run.table.save(path)?;
    }
    if let Some(path) = &opts.report_json {
        let json = serde_json::to_string_pretty(&run.report).context("Failed to serialize run report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Run report written to {}", path.display());
    }

    if !run.report.conflicts.is_empty() {
        warn!("{} replacement(s) were skipped; see the run report.", run.report.conflicts.len());
    }
    if !opts.no_summary && !opts.quiet {
        let stderr = io::stderr();
        let colors = stderr.is_terminal();
        summary::print_run_summary(&run.report, &mut stderr.lock(), theme, colors)?;
    }
    info!("Anonymize operation completed.");
    Ok(())
}
