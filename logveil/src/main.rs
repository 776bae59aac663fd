// logveil/src/main.rs
//! logveil entry point.
//!
//! Parses the command line, installs the logger and hands over to the
//! subcommand runner. Errors are printed with their full context chain.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use is_terminal::IsTerminal;
use log::info;

use logveil::cli::Cli;
use logveil::logger;
use logveil::ui::theme::{paint, ThemeEntry, ThemeStyle};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init_logger(logger::level_from_flags(cli.quiet, cli.debug));
    info!("logveil started. Version: {}", env!("CARGO_PKG_VERSION"));

    match logveil::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let theme = ThemeStyle::default_theme_map();
            let colors = io::stderr().is_terminal();
            eprintln!("{}", paint(&format!("Error: {err:#}"), ThemeEntry::Error, &theme, colors));
            ExitCode::FAILURE
        }
    }
}
