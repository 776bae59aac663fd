//! Concrete `FieldExtractor` implementations.
//!
//! - `regex_extractor`: one grammar, named groups become fields.
//! - `syslog`: RFC 5424 header plus structured data and message pairs.
//! - `tabular`: tab-separated connection summaries without offsets.

pub mod regex_extractor;
pub mod syslog;
pub mod tabular;
