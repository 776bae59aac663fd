// logveil/src/cli.rs
//! This file defines the command-line interface (CLI) for the logveil application,
//! including all available commands and their arguments.
//! License: MIT OR APACHE 2.0

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use logveil_core::DEFAULT_UNIQUENESS_THRESHOLD;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "logveil",
    author = "Obscura Team (Relay)",
    version = env!("CARGO_PKG_VERSION"),
    about = "Anonymize network and security logs in place",
    long_about = "Logveil extracts sensitive fields (addresses, ports, timestamps, payload sizes, free text) from intrusion-detection alerts, firewall events, connection summaries, syslog and custom formats, anonymizes them with privacy-preserving strategies and writes them back at their exact byte positions. Every other byte of the log is left untouched.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, short = 'd', global = true, conflicts_with = "quiet", help = "Enable debug logging.")]
    pub debug: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `logveil` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Anonymizes a log file according to a YAML configuration.
    #[command(about = "Anonymizes a log file according to a YAML configuration.")]
    Anonymize(AnonymizeCommand),

    /// Rebuilds the anonymized log from persisted ledger and table files.
    #[command(about = "Rebuilds the anonymized log from a persisted ledger and table.")]
    Reconstruct(ReconstructCommand),

    /// Measures what anonymization did to one field.
    #[command(about = "Reports entropy, uniqueness and collision metrics for one anonymized field.")]
    Audit(AuditCommand),
}

/// Arguments for the `anonymize` command.
#[derive(Parser, Debug)]
pub struct AnonymizeCommand {
    /// Path to the run configuration (YAML).
    #[arg(long = "config", short = 'c', value_name = "FILE", help = "Path to the run configuration (YAML).")]
    pub config: PathBuf,

    /// Input log; overrides `log_file` from the configuration.
    #[arg(long, short = 'i', value_name = "FILE", help = "Read the log from this file (overrides 'log_file'; stdin when neither is set).")]
    pub input: Option<PathBuf>,

    /// Output log; overrides `output_log` from the configuration.
    #[arg(long, short = 'o', value_name = "FILE", help = "Write the anonymized log to this file (overrides 'output_log'; stdout when neither is set).")]
    pub output: Option<PathBuf>,

    /// Persist the mapping ledger as JSON lines.
    #[arg(long = "ledger-out", value_name = "FILE", help = "Write the mapping ledger to this file (JSON lines).")]
    pub ledger_out: Option<PathBuf>,

    /// Persist the anonymized table as JSON lines.
    #[arg(long = "table-out", value_name = "FILE", help = "Write the anonymized table to this file (JSON lines).")]
    pub table_out: Option<PathBuf>,

    /// Export the run report as JSON.
    #[arg(long = "report-json", value_name = "FILE", help = "Write the run report to this file as JSON.")]
    pub report_json: Option<PathBuf>,

    /// Suppress the run summary.
    #[arg(long = "no-summary", help = "Suppress the run summary on stderr.")]
    pub no_summary: bool,
}

/// Arguments for the `reconstruct` command.
#[derive(Parser, Debug)]
pub struct ReconstructCommand {
    /// The original log the ledger was extracted from.
    #[arg(long, short = 'i', value_name = "FILE", help = "The original log the ledger was extracted from.")]
    pub input: PathBuf,

    /// Mapping ledger written by `anonymize --ledger-out`.
    #[arg(long, value_name = "FILE", help = "Mapping ledger written by 'anonymize --ledger-out'.")]
    pub ledger: PathBuf,

    /// Anonymized table written by `anonymize --table-out`.
    #[arg(long, value_name = "FILE", help = "Anonymized table written by 'anonymize --table-out'.")]
    pub table: PathBuf,

    /// Output log (stdout if not provided).
    #[arg(long, short = 'o', value_name = "FILE", help = "Write the rebuilt log to this file instead of stdout.")]
    pub output: Option<PathBuf>,

    /// Format tag; tabular formats are re-rendered from the table.
    #[arg(long = "log-type", value_name = "TAG", help = "Log format tag (tabular formats are re-rendered from the table).")]
    pub log_type: Option<String>,
}

/// Arguments for the `audit` command.
#[derive(Parser, Debug)]
pub struct AuditCommand {
    /// The original log.
    #[arg(long, value_name = "FILE", help = "The original log.")]
    pub original: PathBuf,

    /// Anonymized table written by `anonymize --table-out`.
    #[arg(long, value_name = "FILE", help = "Anonymized table written by 'anonymize --table-out'.")]
    pub table: PathBuf,

    /// Field to audit.
    #[arg(long, value_name = "NAME", help = "Name of the field to audit (e.g. src_ip).")]
    pub field: String,

    /// Format tag of the original log.
    #[arg(long = "log-type", value_name = "TAG", help = "Log format tag of the original log.")]
    pub log_type: String,

    /// Uniqueness ratio at or below which the field is flagged as low-entropy.
    #[arg(long, value_name = "R", default_value_t = DEFAULT_UNIQUENESS_THRESHOLD, help = "Uniqueness ratio at or below which the field is flagged as low-entropy.")]
    pub threshold: f64,

    /// Print the audit as JSON.
    #[arg(long = "json", help = "Print the audit as JSON instead of a table.")]
    pub json: bool,
}
