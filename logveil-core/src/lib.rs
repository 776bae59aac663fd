// logveil-core/src/lib.rs
//! # logveil Core Library
//!
//! `logveil-core` provides the platform-independent logic for anonymizing
//! structured network and security logs while keeping every non-sensitive
//! byte intact. It extracts sensitive fields together with their exact byte
//! offsets, transforms them with privacy-preserving strategies, and writes
//! the anonymized values back into the original text.
//!
//! The library performs no I/O beyond the explicit `load`/`save` helpers on
//! its persisted artifacts; callers hand it text and get text back.
//!
//! ## Modules
//!
//! * `config`: The YAML run configuration and its validation.
//! * `grammars`: The closed catalogue of log formats, their grammars and the grammar cache.
//! * `extractor` / `extractors`: The `FieldExtractor` trait and one implementation per format family.
//! * `ledger`: The Mapping Ledger of original values and byte offsets.
//! * `record`: Extracted records and the anonymized table.
//! * `strategies`: Value transforms per field class, with the run-scoped `StableMap`.
//! * `diversity`: l-diversity and t-closeness filters.
//! * `reconstruct`: Right-to-left substitution of anonymized values.
//! * `pipeline`: One-shot orchestration and the run report.
//! * `audit`: Entropy, uniqueness and collision metrics of an anonymized column.
//! * `errors`: The fatal error enum and per-record diagnostics.
//!
//! ## Public API
//!
//! **Configuration**
//!
//! * [`AnonymizationConfig`]: Loads and validates a run description.
//! * [`LogFormat`]: Resolves a format tag (and optional custom grammar).
//!
//! **Extraction & Reconstruction**
//!
//! * [`FieldExtractor`]: The single interface every format implements.
//! * [`MappingLedger`] / [`MappingEntry`]: The contract between extraction and reconstruction.
//! * [`reconstruct_text`]: Applies a ledger and an [`AnonymizedTable`] to raw text.
//!
//! **Headless Runs**
//!
//! * [`anonymize_text`]: Extract, anonymize, filter and reconstruct in one call.
//! * [`RunReport`]: Counters and diagnostics of a run; never holds original values.
//!
//! ## Usage Example
//!
//! ```rust
//! use logveil_core::{anonymize_text, AnonymizationConfig};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let config = AnonymizationConfig::from_yaml_str(
//!         "log_type: firewall\nanonymization:\n  salt: \"00112233445566778899aabbccddeeff\"\n",
//!     )?;
//!     let raw = "Apr 13 14:02:15 gw kernel: [UFW BLOCK] IN=eth0 OUT= \
//!                SRC=192.168.1.2 DST=10.0.0.2 LEN=60 PROTO=TCP SPT=12346 DPT=443\n";
//!
//!     let output = anonymize_text(&config, raw)?;
//!     assert!(output.text.starts_with("Apr 13 14:02:15 gw kernel: [UFW BLOCK] IN=eth0 OUT= SRC="));
//!     assert!(!output.text.contains("192.168.1.2"));
//!     assert_eq!(output.report.conflicts.len(), 0);
//!     Ok(())
//! }
//! ```
//!
//! License: MIT OR APACHE 2.0

pub mod audit;
pub mod config;
pub mod diversity;
pub mod errors;
pub mod extractor;
pub mod extractors;
pub mod grammars;
pub mod ledger;
pub mod pipeline;
pub mod reconstruct;
pub mod record;
pub mod strategies;

pub use audit::{audit_column, paired_values, ColumnAudit, OctetAudit, DEFAULT_UNIQUENESS_THRESHOLD};
pub use config::{
    AddressStrategy, AnonymizationConfig, AnonymizationSettings, DiversitySettings, FieldClasses,
    NumericStrategy, PortStrategy, TextStrategy, TimestampStrategy,
};
pub use diversity::{l_diversity, t_closeness, DiversityReport, GroupKey, GroupVerdict};
pub use errors::{
    ConflictReason, InvalidValue, LogveilError, ParseMismatch, ReconstructionConflict, ValueKind,
};
pub use extractor::{build_extractor, extract_text, ExtractionOutput, FieldExtractor, LineMatch};
pub use grammars::{CustomGrammar, LogFormat};
pub use ledger::{MappingEntry, MappingLedger, OverlappingSpan};
pub use pipeline::{anonymize_text, reconstruct_document, ClusterUnderflow, RunOutput, RunReport};
pub use reconstruct::{reconstruct_line, reconstruct_text, LineOutcome, ReconstructionOutput};
pub use record::{AnonymizedTable, LogRecord};
pub use strategies::StableMap;
