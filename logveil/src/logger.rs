// logveil/src/logger.rs
//! Logger bootstrap for the `logveil` binary.
//!
//! An explicit level (from `--quiet` / `--debug`) wins; otherwise `RUST_LOG`
//! is honoured, falling back to `info`. All log output goes to stderr so the
//! anonymized log on stdout stays clean.
//! License: MIT OR APACHE 2.0

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Installs the global logger. Safe to call more than once.
pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    // Already installed when running under test harnesses.
    let _ = builder.format_timestamp(None).try_init();
}

/// Maps the CLI flags to an explicit level, if any.
pub fn level_from_flags(quiet: bool, debug: bool) -> Option<LevelFilter> {
    if quiet {
        Some(LevelFilter::Error)
    } else if debug {
        Some(LevelFilter::Debug)
    } else {
        None
    }
}
