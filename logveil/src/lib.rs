// logveil/src/lib.rs
//! # logveil CLI Application
//!
//! This crate provides the command-line interface for the logveil anonymizer.
//! All anonymization logic lives in `logveil-core`; this crate resolves paths,
//! installs the logger and prints summaries.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;

use anyhow::Result;

use crate::cli::{Cli, Commands};
use crate::commands::anonymize::{run_anonymize, AnonymizeOptions};
use crate::commands::audit::{run_audit, AuditOptions};
use crate::commands::reconstruct::{run_reconstruct, ReconstructOptions};
use crate::ui::theme::ThemeStyle;

/// Dispatches a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let theme = ThemeStyle::default_theme_map();
    match cli.command {
        Commands::Anonymize(cmd) => run_anonymize(
            AnonymizeOptions {
                config: cmd.config,
                input: cmd.input,
                output: cmd.output,
                ledger_out: cmd.ledger_out,
                table_out: cmd.table_out,
                report_json: cmd.report_json,
                no_summary: cmd.no_summary,
                quiet: cli.quiet,
            },
            &theme,
        ),
        Commands::Reconstruct(cmd) => run_reconstruct(
            ReconstructOptions {
                input: cmd.input,
                ledger: cmd.ledger,
                table: cmd.table,
                output: cmd.output,
                log_type: cmd.log_type,
                quiet: cli.quiet,
            },
            &theme,
        ),
        Commands::Audit(cmd) => run_audit(
            AuditOptions {
                original: cmd.original,
                table: cmd.table,
                field: cmd.field,
                log_type: cmd.log_type,
                threshold: cmd.threshold,
                json: cmd.json,
            },
            &theme,
        ),
    }
}
