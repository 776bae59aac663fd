//! grammars/mod.rs - Log format catalogue and built-in grammars.
//!
//! A log format is a closed set of known layouts plus one caller-defined
//! `Custom` layout. Each regex-backed format exposes named capture groups;
//! the sensitive subset of those groups becomes ledger entries.
//!
//! License: MIT OR APACHE 2.0

pub mod compiler;

use serde::{Deserialize, Serialize};

use crate::errors::LogveilError;

/// `MM/DD/YYYY-HH:MM:SS.ffffff  [**] [gid:sid:rev] msg [**] [Classification: c] [Priority: n] {proto} a:p -> b:q`
pub const INTRUSION_ALERT_PATTERN: &str = concat!(
    r"(?P<timestamp>\d{2}/\d{2}/\d{4}-\d{2}:\d{2}:\d{2}\.\d+)\s+\[\*\*\] (?:\[\d+:\d+:\d+\] )?",
    r"(?P<alert>.*?) \[\*\*\] \[Classification: (?P<classification>.*?)\] \[Priority: (?P<priority>\d+)\] ",
    r"\{(?P<protocol>.*?)\} (?P<src_ip>",
    r"\d{1,3}(?:\.\d{1,3}){3}",
    r"):(?P<src_port>\d+) -> (?P<dest_ip>",
    r"\d{1,3}(?:\.\d{1,3}){3}",
    r"):(?P<dest_port>\d+)"
);

/// BSD timestamp at line start, then `SRC=` / `DST=` and later `SPT=` / `DPT=`.
pub const FIREWALL_PATTERN: &str = concat!(
    r"^(?P<timestamp>[A-Z][a-z]{2}\s+\d{1,2} \d{2}:\d{2}:\d{2})\b.*?\bSRC=(?P<src_ip>",
    r"\d{1,3}(?:\.\d{1,3}){3}",
    r") DST=(?P<dest_ip>",
    r"\d{1,3}(?:\.\d{1,3}){3}",
    r")\b.*?\bSPT=(?P<src_port>\d+) DPT=(?P<dest_port>\d+)"
);

/// pf `filterlog` lines as emitted by perimeter firewalls.
pub const PERIMETER_FILTER_PATTERN: &str = concat!(
    r"(?P<timestamp>[A-Z][a-z]{2}\s+\d{1,2} \d{2}:\d{2}:\d{2}) (?P<hostname>\S+) (?P<process>\S+): ",
    r"(?P<rule>\d+) rule \S*?\((?P<match>[^)]*)\) (?P<action>\w+) (?P<direction>\w+) on (?P<interface>\S+): ",
    r"\(proto (?P<protocol>\S+) .*?\) (?P<src_ip>",
    r"\d{1,3}(?:\.\d{1,3}){3}",
    r"):(?P<src_port>\d+) > (?P<dest_ip>",
    r"\d{1,3}(?:\.\d{1,3}){3}",
    r"):(?P<dest_port>\d+)"
);

/// RFC 5424 header; structured data is either `-` or one or more `[...]` elements.
pub const SYSLOG_HEADER_PATTERN: &str = concat!(
    r"^<(?P<priority>\d{1,3})>(?P<version>\d{1,2})? (?P<timestamp>\S+) (?P<hostname>\S+) ",
    r"(?P<app_name>\S+) (?P<proc_id>\S+) (?P<msg_id>\S+) ",
    r"(?P<structured_data>-|(?:\[[^\]]*\])+)(?: (?P<message>.*))?$"
);

/// `name="value"` parameters inside a structured-data element.
pub const SYSLOG_SD_PARAM_PATTERN: &str = r#"(?P<name>\w+)="(?P<value>[^"]*)""#;

/// `key=value` pairs in a free-form message; the value may be opened by a quote.
pub const SYSLOG_KV_PATTERN: &str = r#"\b(?P<key>\w+)=["']?(?P<value>[^"'\s]+)"#;

/// Column layout of connection-summary (tab-separated) logs.
pub const CONNECTION_SUMMARY_COLUMNS: [&str; 8] = [
    "timestamp", "uid", "src_ip", "src_port", "dest_ip", "dest_port", "protocol", "service",
];

const NETWORK_SENSITIVE: [&str; 5] = ["timestamp", "src_ip", "src_port", "dest_ip", "dest_port"];
const SYSLOG_SENSITIVE: [&str; 5] = ["timestamp", "hostname", "app_name", "src_ip", "dest_ip"];

/// A caller-supplied grammar: a regex with named groups plus the groups to anonymize.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomGrammar {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Every log layout the extractor understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    IntrusionAlert,
    Firewall,
    ConnectionSummary,
    Syslog,
    PerimeterFilter,
    Custom { pattern: String, fields: Vec<String> },
}

impl LogFormat {
    /// Resolves a format tag. `custom` requires a grammar with a pattern and
    /// at least one field.
    pub fn from_tag(tag: &str, custom: Option<&CustomGrammar>) -> Result<Self, LogveilError> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "intrusion-alert" | "intrusion_alert" | "suricata" => Ok(LogFormat::IntrusionAlert),
            "firewall" | "iptables" => Ok(LogFormat::Firewall),
            "connection-summary" | "connection_summary" | "zeek" => Ok(LogFormat::ConnectionSummary),
            "syslog" => Ok(LogFormat::Syslog),
            "perimeter-filter" | "perimeter_filter" | "pfsense" => Ok(LogFormat::PerimeterFilter),
            "custom" => {
                let grammar = custom.ok_or_else(|| {
                    LogveilError::Configuration(
                        "log type 'custom' requires an 'anonymization.custom_format' section".to_string(),
                    )
                })?;
                let pattern = grammar
                    .pattern
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| {
                        LogveilError::Configuration(
                            "custom format specified but no pattern provided".to_string(),
                        )
                    })?;
                if grammar.fields.is_empty() {
                    return Err(LogveilError::Configuration(
                        "custom format specified but no sensitive fields listed".to_string(),
                    ));
                }
                Ok(LogFormat::Custom {
                    pattern: pattern.to_string(),
                    fields: grammar.fields.clone(),
                })
            }
            other => Err(LogveilError::Configuration(format!("unknown log type '{other}'"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogFormat::IntrusionAlert => "intrusion-alert",
            LogFormat::Firewall => "firewall",
            LogFormat::ConnectionSummary => "connection-summary",
            LogFormat::Syslog => "syslog",
            LogFormat::PerimeterFilter => "perimeter-filter",
            LogFormat::Custom { .. } => "custom",
        }
    }

    /// Fields entered into the ledger when the configuration does not override them.
    pub fn default_sensitive_fields(&self) -> Vec<String> {
        let names: &[&str] = match self {
            LogFormat::Syslog => &SYSLOG_SENSITIVE,
            LogFormat::Custom { fields, .. } => return fields.clone(),
            _ => &NETWORK_SENSITIVE,
        };
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Regex-backed formats return their single grammar.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            LogFormat::IntrusionAlert => Some(INTRUSION_ALERT_PATTERN),
            LogFormat::Firewall => Some(FIREWALL_PATTERN),
            LogFormat::PerimeterFilter => Some(PERIMETER_FILTER_PATTERN),
            LogFormat::Custom { pattern, .. } => Some(pattern),
            LogFormat::Syslog | LogFormat::ConnectionSummary => None,
        }
    }

    /// Tabular formats are rewritten column-wise and bypass the ledger.
    pub fn is_tabular(&self) -> bool {
        matches!(self, LogFormat::ConnectionSummary)
    }
}
