//! syslog.rs - RFC 5424 extractor.
//!
//! The header is matched first; `name="value"` parameters from the
//! structured-data block and `key=value` pairs from the free-form message are
//! then lifted into the same record. Every lifted field keeps its offset
//! relative to the start of the line, so message-borne addresses can be
//! replaced in place like header fields. Later sources override earlier ones
//! (message over structured data over header).
//!
//! `facility` and `severity` are derived from the priority value and have no
//! position of their own.
//!
//! License: MIT OR APACHE 2.0

use std::sync::Arc;

use regex::Regex;

use crate::errors::LogveilError;
use crate::extractor::{Extraction, FieldExtractor, LineMatch};
use crate::grammars::compiler::get_or_compile;
use crate::grammars::{SYSLOG_HEADER_PATTERN, SYSLOG_KV_PATTERN, SYSLOG_SD_PARAM_PATTERN};

const HEADER_FIELDS: [&str; 7] = [
    "priority", "version", "timestamp", "hostname", "app_name", "proc_id", "msg_id",
];

#[derive(Debug)]
pub struct SyslogExtractor {
    header: Arc<Regex>,
    sd_param: Arc<Regex>,
    kv_pair: Arc<Regex>,
    sensitive: Vec<String>,
}

impl SyslogExtractor {
    pub fn new(sensitive: Vec<String>) -> Result<Self, LogveilError> {
        Ok(Self {
            header: get_or_compile("syslog-header", SYSLOG_HEADER_PATTERN)?,
            sd_param: get_or_compile("syslog-sd-param", SYSLOG_SD_PARAM_PATTERN)?,
            kv_pair: get_or_compile("syslog-kv", SYSLOG_KV_PATTERN)?,
            sensitive,
        })
    }
}

impl FieldExtractor for SyslogExtractor {
    fn format_name(&self) -> &str {
        "syslog"
    }

    fn sensitive_fields(&self) -> &[String] {
        &self.sensitive
    }

    fn extract_line(&self, line_no: usize, line: &str) -> LineMatch {
        if line.trim().is_empty() {
            return LineMatch::Skipped;
        }
        let Some(caps) = self.header.captures(line) else {
            return LineMatch::Mismatch;
        };

        let mut extraction = Extraction::new(line_no);
        for name in HEADER_FIELDS {
            if let Some(m) = caps.name(name) {
                extraction.set(name, m.as_str(), Some(m.start()));
            }
        }

        if let Some(priority) = caps.name("priority").and_then(|m| m.as_str().parse::<u16>().ok()) {
            extraction.set("facility", &(priority / 8).to_string(), None);
            extraction.set("severity", &(priority % 8).to_string(), None);
        }

        if let Some(sd) = caps.name("structured_data") {
            extraction.set("structured_data", sd.as_str(), Some(sd.start()));
            if sd.as_str() != "-" {
                for param in self.sd_param.captures_iter(sd.as_str()) {
                    if let (Some(name), Some(value)) = (param.name("name"), param.name("value")) {
                        extraction.set(name.as_str(), value.as_str(), Some(sd.start() + value.start()));
                    }
                }
            }
        }

        if let Some(message) = caps.name("message") {
            extraction.set("message", message.as_str(), Some(message.start()));
            for pair in self.kv_pair.captures_iter(message.as_str()) {
                if let (Some(key), Some(value)) = (pair.name("key"), pair.name("value")) {
                    extraction.set(key.as_str(), value.as_str(), Some(message.start() + value.start()));
                }
            }
        }

        LineMatch::Matched(extraction)
    }
}
