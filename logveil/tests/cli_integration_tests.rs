// logveil/tests/cli_integration_tests.rs
//! Command-line integration tests for the `logveil` binary.
//!
//! Each test runs the real executable through `assert_cmd`, feeding input via
//! files in a temporary directory (or stdin) and asserting on stdout, stderr
//! and the files it writes. Colours are never emitted because the spawned
//! process is not attached to a terminal.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use regex::Regex;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const SALT: &str = "00112233445566778899aabbccddeeff";

const FIREWALL_LOG: &str = "\
Apr 13 14:02:15 gw kernel: [UFW BLOCK] IN=eth0 OUT= SRC=192.168.1.2 DST=10.0.0.2 LEN=60 PROTO=TCP SPT=12346 DPT=443
not a firewall line
Apr 13 14:02:16 gw kernel: [UFW BLOCK] IN=eth0 OUT= SRC=192.168.1.3 DST=10.0.0.2 LEN=60 PROTO=TCP SPT=12347 DPT=22
";

fn logveil() -> Command {
    let mut cmd = Command::cargo_bin("logveil").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("LOGVEIL_ALLOW_DEBUG_PII");
    cmd
}

fn write_config(dir: &Path, body: &str) -> Result<std::path::PathBuf> {
    let path = dir.join("logveil.yaml");
    fs::write(&path, body)?;
    Ok(path)
}

#[test_log::test]
fn test_anonymize_file_to_file() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("fw.log");
    let output = dir.path().join("out/fw.anon.log");
    fs::write(&input, FIREWALL_LOG)?;
    let config = write_config(
        dir.path(),
        &format!("log_type: firewall\nanonymization:\n  salt: \"{SALT}\"\n"),
    )?;

    logveil()
        .args(["anonymize", "--config"])
        .arg(&config)
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Anonymization summary (firewall)"))
        .stderr(predicate::str::contains("No reconstruction conflicts."));

    let text = fs::read_to_string(&output)?;
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "not a firewall line\n");
    let shape = Regex::new(concat!(
        r"^Apr 13 14:02:1[56] gw kernel: \[UFW BLOCK\] IN=eth0 OUT= ",
        r"SRC=\d{1,3}(?:\.\d{1,3}){3} DST=\d{1,3}(?:\.\d{1,3}){3} LEN=60 PROTO=TCP ",
        r"SPT=\d{4,5} DPT=\d{4,5}\n$"
    ))?;
    assert!(shape.is_match(lines[0]), "unexpected line: {}", lines[0]);
    assert!(shape.is_match(lines[2]), "unexpected line: {}", lines[2]);
    assert!(!text.contains("192.168.1.2"));
    Ok(())
}

#[test]
fn test_anonymize_stdin_to_stdout_keeps_unmatched_bytes() -> Result<()> {
    let dir = tempdir()?;
    let config = write_config(dir.path(), "log_type: firewall\n")?;
    let input = "nothing to see\r\n\n  still nothing";

    logveil()
        .args(["-q", "anonymize", "--config"])
        .arg(&config)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::eq(input))
        .stderr(predicate::str::is_empty());
    Ok(())
}

#[test]
fn test_custom_format_without_pattern_fails_before_output() -> Result<()> {
    let dir = tempdir()?;
    let output = dir.path().join("never.log");
    let config = write_config(dir.path(), "log_type: custom\n")?;

    logveil()
        .args(["anonymize", "--config"])
        .arg(&config)
        .arg("--output")
        .arg(&output)
        .write_stdin(FIREWALL_LOG)
        .assert()
        .failure()
        .stderr(predicate::str::contains("custom"));
    assert!(!output.exists());
    Ok(())
}

#[test]
fn test_missing_input_file_is_reported() -> Result<()> {
    let dir = tempdir()?;
    let config = write_config(dir.path(), "log_type: firewall\n")?;

    logveil()
        .args(["anonymize", "--config"])
        .arg(&config)
        .args(["--input", "/definitely/not/here.log"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read input file"));
    Ok(())
}

#[test]
fn test_artifacts_round_trip_through_reconstruct() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("fw.log");
    let anonymized = dir.path().join("fw.anon.log");
    let rebuilt = dir.path().join("fw.rebuilt.log");
    let ledger = dir.path().join("ledger.jsonl");
    let table = dir.path().join("table.jsonl");
    let report = dir.path().join("report.json");
    fs::write(&input, FIREWALL_LOG)?;
    let config = write_config(
        dir.path(),
        &format!("log_type: firewall\nanonymization:\n  salt: \"{SALT}\"\n  timestamp: round\n"),
    )?;

    logveil()
        .args(["-q", "anonymize", "--config"])
        .arg(&config)
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&anonymized)
        .arg("--ledger-out")
        .arg(&ledger)
        .arg("--table-out")
        .arg(&table)
        .arg("--report-json")
        .arg(&report)
        .assert()
        .success();

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
    assert_eq!(report["format"], "firewall");
    assert_eq!(report["lines_total"], 3);
    assert_eq!(report["mismatched_lines"], 1);
    assert_eq!(report["replacements"], 10);

    logveil()
        .arg("reconstruct")
        .arg("--input")
        .arg(&input)
        .arg("--ledger")
        .arg(&ledger)
        .arg("--table")
        .arg(&table)
        .arg("--output")
        .arg(&rebuilt)
        .args(["--log-type", "firewall"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Reconstruction summary"));

    assert_eq!(fs::read_to_string(&rebuilt)?, fs::read_to_string(&anonymized)?);
    assert!(fs::read_to_string(&rebuilt)?.starts_with("Apr 13 14:00:00 gw kernel"));
    Ok(())
}

#[test]
fn test_audit_reports_json_metrics() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("fw.log");
    let table = dir.path().join("table.jsonl");
    fs::write(&input, FIREWALL_LOG)?;
    let config = write_config(
        dir.path(),
        &format!("log_type: firewall\nanonymization:\n  salt: \"{SALT}\"\n"),
    )?;

    logveil()
        .args(["-q", "anonymize", "--config"])
        .arg(&config)
        .arg("--input")
        .arg(&input)
        .arg("--table-out")
        .arg(&table)
        .assert()
        .success();

    let assert = logveil()
        .args(["-q", "audit", "--original"])
        .arg(&input)
        .arg("--table")
        .arg(&table)
        .args(["--field", "src_ip", "--log-type", "firewall", "--json"])
        .assert()
        .success();
    let audit: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(audit["field"], "src_ip");
    assert_eq!(audit["pairs"], 2);
    assert_eq!(audit["uniqueness"], 1.0);
    assert_eq!(audit["low_entropy"], false);
    assert_eq!(audit["octets"]["collision_rates"].as_array().map(Vec::len), Some(4));

    logveil()
        .args(["-q", "audit", "--original"])
        .arg(&input)
        .arg("--table")
        .arg(&table)
        .args(["--field", "dest_ip", "--log-type", "firewall", "--threshold", "0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Audit of 'dest_ip'"))
        .stdout(predicate::str::contains("Low entropy"));
    Ok(())
}

#[test]
fn test_audit_of_unknown_field_fails() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("fw.log");
    let table = dir.path().join("table.jsonl");
    fs::write(&input, FIREWALL_LOG)?;
    fs::write(&table, "")?;

    logveil()
        .args(["-q", "audit", "--original"])
        .arg(&input)
        .arg("--table")
        .arg(&table)
        .args(["--field", "username", "--log-type", "firewall"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No values of field 'username'"));
    Ok(())
}

#[test]
fn test_no_arguments_prints_help() {
    logveil()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
