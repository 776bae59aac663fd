//! `logveil reconstruct`: replays persisted artifacts against the original log.

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::info;
use std::io;
use std::path::PathBuf;

use logveil_core::{reconstruct_document, reconstruct_text, AnonymizedTable, LogFormat, MappingLedger};

use crate::commands::{read_input, write_output};
use crate::ui::summary;
use crate::ui::theme::ThemeMap;

pub struct ReconstructOptions {
    pub input: PathBuf,
    pub ledger: PathBuf,
    pub table: PathBuf,
    pub output: Option<PathBuf>,
    pub log_type: Option<String>,
    pub quiet: bool,
}

/// Resolves the optional tag. `custom` needs no grammar here: its ledger
/// already carries every offset.
fn resolve_format(tag: Option<&str>) -> Result<Option<LogFormat>> {
    match tag {
        None => Ok(None),
        Some(tag) if tag.trim().eq_ignore_ascii_case("custom") => Ok(None),
        Some(tag) => Ok(Some(LogFormat::from_tag(tag, None)?)),
    }
}

pub fn run_reconstruct(opts: ReconstructOptions, theme: &ThemeMap) -> Result<()> {
    info!("Starting reconstruct operation.");
    let format = resolve_format(opts.log_type.as_deref())?;
    let raw = read_input(Some(&opts.input))?;
    let ledger = MappingLedger::load(&opts.ledger)?;
    let table = AnonymizedTable::load(&opts.table)?;

    let output = match &format {
        Some(format) => reconstruct_document(format, &raw, &ledger, &table).context("Reconstruction failed")?,
        None => reconstruct_text(&raw, &ledger, &table),
    };
    write_output(opts.output.as_deref(), &output.text)?;

    if !opts.quiet {
        let stderr = io::stderr();
        let colors = stderr.is_terminal();
        summary::print_reconstruction_summary(&output, &mut stderr.lock(), theme, colors)?;
    }
    info!("Reconstruct operation completed.");
    Ok(())
}
