// logveil/src/commands/mod.rs
//! Subcommand implementations and the input/output plumbing they share.

pub mod anonymize;
pub mod audit;
pub mod reconstruct;

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

/// Reads the whole input from `path`, or from stdin when `None`.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => {
            info!("Reading input from file: {}", path.display());
            fs::read_to_string(path).with_context(|| format!("Failed to read input file {}", path.display()))
        }
        None => {
            info!("Reading input from stdin...");
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            Ok(buffer)
        }
    }
}

/// Writes `text` verbatim to `path`, or to stdout when `None`. No newline is
/// appended: the output must stay byte-identical to the reconstruction.
pub fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            info!("Writing output to file: {}", path.display());
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
            }
            fs::write(path, text).with_context(|| format!("Failed to write output file {}", path.display()))
        }
        None => {
            debug!("Writing output to stdout.");
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            writer.write_all(text.as_bytes())?;
            writer.flush()?;
            Ok(())
        }
    }
}
