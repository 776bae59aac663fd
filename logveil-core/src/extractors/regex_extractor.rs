//! regex_extractor.rs - Single-grammar extractor used by the alert, firewall,
//! perimeter-filter and custom formats.
//!
//! License: MIT OR APACHE 2.0

use std::sync::Arc;

use regex::Regex;

use crate::errors::LogveilError;
use crate::extractor::{Extraction, FieldExtractor, LineMatch};
use crate::grammars::compiler::{ensure_named_groups, get_or_compile};

/// Extracts every named group of one grammar, with its byte offset.
#[derive(Debug)]
pub struct RegexExtractor {
    name: String,
    regex: Arc<Regex>,
    group_names: Vec<String>,
    sensitive: Vec<String>,
}

impl RegexExtractor {
    /// Compiles (or fetches from cache) `pattern` and checks that each
    /// sensitive field is one of its named groups.
    pub fn new(name: &str, pattern: &str, sensitive: Vec<String>) -> Result<Self, LogveilError> {
        let regex = get_or_compile(name, pattern)?;
        ensure_named_groups(name, &regex, &sensitive)?;
        let group_names = regex.capture_names().flatten().map(str::to_string).collect();
        Ok(Self {
            name: name.to_string(),
            regex,
            group_names,
            sensitive,
        })
    }
}

impl FieldExtractor for RegexExtractor {
    fn format_name(&self) -> &str {
        &self.name
    }

    fn sensitive_fields(&self) -> &[String] {
        &self.sensitive
    }

    fn extract_line(&self, line_no: usize, line: &str) -> LineMatch {
        if line.trim().is_empty() {
            return LineMatch::Skipped;
        }
        let Some(caps) = self.regex.captures(line) else {
            return LineMatch::Mismatch;
        };

        let mut extraction = Extraction::new(line_no);
        for name in &self.group_names {
            // Optional groups that did not participate are simply absent.
            if let Some(m) = caps.name(name) {
                extraction.set(name, m.as_str(), Some(m.start()));
            }
        }
        LineMatch::Matched(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammars::{LogFormat, FIREWALL_PATTERN, INTRUSION_ALERT_PATTERN, PERIMETER_FILTER_PATTERN};

    fn extractor(pattern: &str) -> RegexExtractor {
        RegexExtractor::new("test", pattern, LogFormat::Firewall.default_sensitive_fields()).unwrap()
    }

    fn matched(result: LineMatch) -> Extraction {
        match result {
            LineMatch::Matched(e) => e,
            other => panic!("expected a match, got {:?}", other),
        }
    }

    #[test]
    fn intrusion_alert_offsets_point_at_values() {
        let line = "04/13/2025-14:02:15.123  [**] Test Alert [**] [Classification: Test Classification] [Priority: 1] {TCP} 192.168.1.1:12345 -> 10.0.0.1:80";
        let extraction = matched(extractor(INTRUSION_ALERT_PATTERN).extract_line(1, line));

        for field in &extraction.fields {
            let offset = field.offset.unwrap();
            assert_eq!(&line[offset..offset + field.value.len()], field.value);
        }
        assert_eq!(extraction.get("alert").unwrap().value, "Test Alert");
        assert_eq!(extraction.get("dest_port").unwrap().value, "80");
        assert_eq!(extraction.get("timestamp").unwrap().offset, Some(0));
    }

    #[test]
    fn intrusion_alert_accepts_signature_ids() {
        let line = "04/13/2025-14:02:15.123456  [**] [1:2000001:3] ET SCAN Probe [**] [Classification: Attempted Recon] [Priority: 2] {UDP} 172.16.0.9:5353 -> 172.16.0.1:53";
        let extraction = matched(extractor(INTRUSION_ALERT_PATTERN).extract_line(1, line));
        assert_eq!(extraction.get("alert").unwrap().value, "ET SCAN Probe");
        assert_eq!(extraction.get("src_ip").unwrap().value, "172.16.0.9");
    }

    #[test]
    fn firewall_matches_minimal_and_kernel_lines() {
        let fw = extractor(FIREWALL_PATTERN);
        let short = matched(fw.extract_line(1, "Apr 13 14:02:15 SRC=192.168.1.2 DST=10.0.0.2 SPT=12346 DPT=443"));
        assert_eq!(short.get("timestamp").unwrap().value, "Apr 13 14:02:15");
        assert_eq!(short.get("src_port").unwrap().value, "12346");

        let kernel = "Apr  3 09:10:11 gw kernel: [UFW BLOCK] IN=eth0 OUT= SRC=203.0.113.7 DST=198.51.100.2 LEN=40 PROTO=TCP SPT=51515 DPT=22 WINDOW=1024";
        let long = matched(fw.extract_line(2, kernel));
        assert_eq!(long.get("timestamp").unwrap().value, "Apr  3 09:10:11");
        assert_eq!(long.get("dest_ip").unwrap().value, "198.51.100.2");
        assert_eq!(long.get("dest_port").unwrap().value, "22");

        assert_eq!(fw.extract_line(3, "garbage"), LineMatch::Mismatch);
        assert_eq!(fw.extract_line(4, "   "), LineMatch::Skipped);
    }

    #[test]
    fn perimeter_filter_sample_line_matches() {
        let line = "Apr 13 14:02:15 pfsense filterlog: 1000 rule 0/(match) pass in on em0: (proto TCP (ACK)) 192.168.1.5:12348 > 10.0.0.5:80";
        let extraction = matched(extractor(PERIMETER_FILTER_PATTERN).extract_line(1, line));
        assert_eq!(extraction.get("match").unwrap().value, "match");
        assert_eq!(extraction.get("action").unwrap().value, "pass");
        assert_eq!(extraction.get("protocol").unwrap().value, "TCP");
        assert_eq!(extraction.get("src_ip").unwrap().value, "192.168.1.5");
        assert_eq!(extraction.get("dest_port").unwrap().value, "80");
    }

    #[test]
    fn unknown_sensitive_field_is_rejected() {
        let err = RegexExtractor::new("custom", r"(?P<user>\w+)", vec!["host".into()]).unwrap_err();
        assert!(matches!(err, LogveilError::Configuration(_)));
    }
}
