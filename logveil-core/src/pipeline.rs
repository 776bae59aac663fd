// logveil-core/src/pipeline.rs
//! One-shot orchestration of a full anonymization run.
//!
//! `anonymize_text` drives the stages in order: extraction (parallel by
//! line), the configured strategy per field class (whole columns), the
//! optional diversity filters, then reconstruction (parallel by line). It
//! returns the anonymized text together with the Mapping Ledger, the
//! anonymized table and a `RunReport` of everything that was counted or
//! skipped along the way.
//!
//! Records dropped by a diversity filter are suppressed: their lines are
//! removed from the output rather than released with partially original
//! content.
//!
//! License: MIT OR APACHE 2.0

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{
    AddressStrategy, AnonymizationConfig, NumericStrategy, PortStrategy, TextStrategy, TimestampStrategy,
};
use crate::diversity::{l_diversity, t_closeness, DiversityReport};
use crate::errors::{LogveilError, ReconstructionConflict, ValueKind};
use crate::extractor::{build_extractor, extract_text, split_lines, FieldExtractor};
use crate::extractors::tabular::TabularExtractor;
use crate::grammars::LogFormat;
use crate::ledger::MappingLedger;
use crate::reconstruct::{reconstruct_text, ReconstructionOutput};
use crate::record::{column, set_column, AnonymizedTable, LogRecord};
use crate::strategies::address::{condense_ipv4, generalize_ipv4, hash_ipv4, INVALID_IP};
use crate::strategies::condensation::CondensationOutcome;
use crate::strategies::cryptopan::{PrefixPreservingCipher, DEFAULT_PREFIX_BITS};
use crate::strategies::numeric::{add_noise, condense_numeric};
use crate::strategies::port::hash_port;
use crate::strategies::text::{generalize_url, mask, INVALID_URL};
use crate::strategies::timestamp::{adaptive_noise, bucketize, derive_shift, perturb, round_to_quarter_hour, shift};
use crate::strategies::{map_column, ColumnOutcome, OnInvalid, StableMap};

/// A column whose condensation could not form a single group of `k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterUnderflow {
    pub field: String,
    pub records: usize,
    pub k: usize,
}

/// Counters and diagnostics for one run. Never carries original values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub format: String,
    pub lines_total: usize,
    pub records: usize,
    pub mismatched_lines: usize,
    pub ledger_entries: usize,
    pub overlapping_spans: usize,
    /// Invalid values per field name and value kind.
    pub invalid_values: BTreeMap<String, BTreeMap<ValueKind, usize>>,
    pub cluster_underflows: Vec<ClusterUnderflow>,
    pub groups_dropped: usize,
    pub suppressed_lines: Vec<usize>,
    pub replacements: usize,
    pub conflicts: Vec<ReconstructionConflict>,
}

impl RunReport {
    fn new(format: &LogFormat) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            format: format.name().to_string(),
            lines_total: 0,
            records: 0,
            mismatched_lines: 0,
            ledger_entries: 0,
            overlapping_spans: 0,
            invalid_values: BTreeMap::new(),
            cluster_underflows: Vec::new(),
            groups_dropped: 0,
            suppressed_lines: Vec::new(),
            replacements: 0,
            conflicts: Vec::new(),
        }
    }

    pub fn invalid_total(&self) -> usize {
        self.invalid_values.values().flat_map(|kinds| kinds.values()).sum()
    }

    fn record_column(&mut self, field: &str, outcome: &ColumnOutcome) {
        if outcome.invalid.is_empty() {
            return;
        }
        let kinds = self.invalid_values.entry(field.to_string()).or_default();
        for (_, err) in &outcome.invalid {
            *kinds.entry(err.kind).or_insert(0) += 1;
        }
        debug!("Field '{}': {} invalid value(s).", field, outcome.invalid.len());
    }

    fn record_condensation(&mut self, field: &str, outcome: &CondensationOutcome) {
        if let CondensationOutcome::Underflow { records, k } = outcome {
            warn!(
                "Condensation of '{}' skipped: {} record(s) cannot form a group of k={}.",
                field, records, k
            );
            self.cluster_underflows.push(ClusterUnderflow {
                field: field.to_string(),
                records: *records,
                k: *k,
            });
        }
    }
}

/// Everything an anonymization run produces.
#[derive(Debug)]
pub struct RunOutput {
    pub text: String,
    pub ledger: MappingLedger,
    pub table: AnonymizedTable,
    pub report: RunReport,
}

/// Run-scoped state shared by every strategy call.
struct RunContext {
    stable: StableMap,
    rng: StdRng,
}

impl RunContext {
    fn new(config: &AnonymizationConfig) -> Result<Self> {
        let settings = &config.anonymization;
        let stable = match &settings.salt {
            Some(salt) => StableMap::from_hex_salt(salt)?,
            None => StableMap::with_random_salt(),
        };
        let rng = match settings.noise_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self { stable, rng })
    }

    /// The prefix-encryption secret: an explicit key, else the run salt.
    fn cipher(&self, key: Option<&str>, bits: u8) -> Result<PrefixPreservingCipher> {
        let secret = key
            .map(|k| k.as_bytes().to_vec())
            .unwrap_or_else(|| self.stable.salt_hex().into_bytes());
        Ok(PrefixPreservingCipher::new(&secret, bits)?)
    }
}

/// Owned copy of one column so records can be mutated afterwards.
fn take_column(records: &[LogRecord], field: &str) -> (Vec<usize>, Vec<String>) {
    column(records, field)
        .into_iter()
        .map(|(idx, value)| (idx, value.to_string()))
        .unzip()
}

fn apply_address(
    ctx: &mut RunContext,
    strategy: &AddressStrategy,
    field: &str,
    inputs: &[&str],
    report: &mut RunReport,
) -> Result<ColumnOutcome> {
    let outcome = match strategy {
        AddressStrategy::Hash => {
            let stable = &ctx.stable;
            map_column(inputs, OnInvalid::PassThrough, |v| hash_ipv4(stable, v))
        }
        AddressStrategy::Mask { prefix_len } => {
            map_column(inputs, OnInvalid::Marker(INVALID_IP), |v| generalize_ipv4(v, *prefix_len))
        }
        AddressStrategy::Prefix { bits, key } => {
            let cipher = ctx.cipher(key.as_deref(), *bits)?;
            map_column(inputs, OnInvalid::Marker(INVALID_IP), |v| cipher.anonymize(v))
        }
        AddressStrategy::Condensation { k, epsilon } => {
            let cipher = ctx.cipher(None, DEFAULT_PREFIX_BITS)?;
            let (outcome, condensation) = condense_ipv4(inputs, &cipher, *k, *epsilon, &mut ctx.rng);
            report.record_condensation(field, &condensation);
            outcome
        }
    };
    Ok(outcome)
}

fn apply_timestamp(
    ctx: &mut RunContext,
    strategy: &TimestampStrategy,
    inputs: &[&str],
) -> Result<ColumnOutcome> {
    let outcome = match strategy {
        TimestampStrategy::Round => map_column(inputs, OnInvalid::PassThrough, round_to_quarter_hour),
        TimestampStrategy::Perturb { window_minutes } => {
            let rng = &mut ctx.rng;
            let results: Vec<_> = inputs.iter().map(|v| perturb(v, *window_minutes, rng)).collect();
            ColumnOutcome::collect(inputs, results, OnInvalid::PassThrough)
        }
        TimestampStrategy::Bucketize { resolution } => {
            map_column(inputs, OnInvalid::PassThrough, |v| bucketize(v, *resolution))
        }
        TimestampStrategy::Shift { max_shift_hours, seed } => {
            let seed = seed
                .clone()
                .unwrap_or_else(|| format!("{:016x}", ctx.rng.random::<u64>()));
            let offset = derive_shift(&seed, *max_shift_hours)?;
            debug!("Dataset-wide timestamp shift: {}s", offset.num_seconds());
            map_column(inputs, OnInvalid::PassThrough, |v| shift(v, offset))
        }
        TimestampStrategy::Adaptive { global_offset_seconds } => {
            let global = match global_offset_seconds {
                Some(seconds) => Some(TimeDelta::try_seconds(*seconds).ok_or_else(|| {
                    LogveilError::Configuration(format!(
                        "timestamp global_offset_seconds {seconds} is out of range"
                    ))
                })?),
                None => None,
            };
            adaptive_noise(inputs, global, &mut ctx.rng)
        }
    };
    Ok(outcome)
}

fn apply_numeric(
    ctx: &mut RunContext,
    strategy: &NumericStrategy,
    field: &str,
    inputs: &[&str],
    report: &mut RunReport,
) -> ColumnOutcome {
    match strategy {
        NumericStrategy::Differential { epsilon } => add_noise(inputs, *epsilon, &mut ctx.rng),
        NumericStrategy::Condensation { k, epsilon } => {
            let (outcome, condensation) = condense_numeric(inputs, *k, *epsilon, &mut ctx.rng);
            report.record_condensation(field, &condensation);
            outcome
        }
    }
}

fn apply_text(strategy: &TextStrategy, inputs: &[&str]) -> ColumnOutcome {
    match strategy {
        TextStrategy::Mask { visible, mask_char } => {
            map_column(inputs, OnInvalid::PassThrough, |v| Ok(mask(v, *visible, *mask_char)))
        }
        TextStrategy::Url => map_column(inputs, OnInvalid::Marker(INVALID_URL), generalize_url),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldClass {
    Address,
    Port,
    Timestamp,
    Numeric,
    Text,
}

/// Anonymizes one field across all records. Fields without a configured
/// strategy for their class are left untouched.
fn apply_field(
    config: &AnonymizationConfig,
    ctx: &mut RunContext,
    records: &mut [LogRecord],
    field: &str,
    class: FieldClass,
    report: &mut RunReport,
) -> Result<()> {
    let settings = &config.anonymization;
    let (indices, values) = take_column(records, field);
    if values.is_empty() {
        return Ok(());
    }
    let inputs: Vec<&str> = values.iter().map(String::as_str).collect();

    let outcome = match class {
        FieldClass::Address => match &settings.address {
            Some(strategy) => apply_address(ctx, strategy, field, &inputs, report)?,
            None => return Ok(()),
        },
        FieldClass::Port => match settings.port {
            Some(PortStrategy::Hash) => {
                let stable = &ctx.stable;
                map_column(&inputs, OnInvalid::PassThrough, |v| hash_port(stable, v))
            }
            None => return Ok(()),
        },
        FieldClass::Timestamp => match &settings.timestamp {
            Some(strategy) => apply_timestamp(ctx, strategy, &inputs)?,
            None => return Ok(()),
        },
        FieldClass::Numeric => match &settings.numeric {
            Some(strategy) => apply_numeric(ctx, strategy, field, &inputs, report),
            None => return Ok(()),
        },
        FieldClass::Text => match &settings.text {
            Some(strategy) => apply_text(strategy, &inputs),
            None => return Ok(()),
        },
    };

    report.record_column(field, &outcome);
    set_column(records, field, &indices, outcome.values);
    Ok(())
}

/// Applies the configured strategy of every field class to `records` in place.
fn apply_strategies(
    config: &AnonymizationConfig,
    ctx: &mut RunContext,
    records: &mut [LogRecord],
    report: &mut RunReport,
) -> Result<()> {
    let fields = &config.anonymization.fields;
    for (list, class) in [
        (&fields.address, FieldClass::Address),
        (&fields.port, FieldClass::Port),
        (&fields.timestamp, FieldClass::Timestamp),
        (&fields.numeric, FieldClass::Numeric),
        (&fields.text, FieldClass::Text),
    ] {
        for field in list {
            apply_field(config, ctx, records, field, class, report)
                .with_context(|| format!("Failed to anonymize field '{field}'"))?;
        }
    }
    Ok(())
}

fn absorb(outcome: DiversityReport, report: &mut RunReport) -> Vec<LogRecord> {
    report.groups_dropped += outcome.groups_dropped();
    report.suppressed_lines.extend(outcome.dropped_lines);
    outcome.kept
}

/// Runs the configured diversity filters, returning the surviving records.
fn apply_diversity(
    config: &AnonymizationConfig,
    mut records: Vec<LogRecord>,
    report: &mut RunReport,
) -> Vec<LogRecord> {
    if let Some(l_div) = &config.diversity.l_diversity {
        let outcome = l_diversity(&records, &l_div.key_fields, &l_div.sensitive_field, l_div.l);
        records = absorb(outcome, report);
    }
    if let Some(t_close) = &config.diversity.t_closeness {
        let outcome = t_closeness(&records, &t_close.key_fields, &t_close.sensitive_field, t_close.t);
        records = absorb(outcome, report);
    }
    report.suppressed_lines.sort_unstable();
    records
}

/// Drops the given 1-based lines, terminators included.
pub fn suppress_lines(text: &str, lines: &BTreeSet<usize>) -> String {
    if lines.is_empty() {
        return text.to_string();
    }
    split_lines(text)
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !lines.contains(&(idx + 1)))
        .map(|(_, (content, terminator))| format!("{content}{terminator}"))
        .collect()
}

fn table_fields(config: &AnonymizationConfig, extractor: &dyn FieldExtractor) -> Vec<String> {
    let mut fields = config.anonymization.fields.all();
    fields.extend(extractor.sensitive_fields().iter().cloned());
    fields.sort();
    fields.dedup();
    fields
}

/// Anonymizes `raw` according to `config`.
///
/// Configuration problems are reported before any work is done; per-line and
/// per-value problems are counted in the report.
pub fn anonymize_text(config: &AnonymizationConfig, raw: &str) -> Result<RunOutput> {
    config.validate()?;
    let format = config.resolve_format()?;
    let extractor = build_extractor(&format, config.anonymization.sensitive_fields.as_deref())?;
    let mut report = RunReport::new(&format);
    info!("Starting anonymization run {} (format '{}').", report.run_id, format.name());

    let extraction = extract_text(&*extractor, raw);
    report.lines_total = extraction.lines_total;
    report.mismatched_lines = extraction.mismatches.len();
    report.overlapping_spans = extraction.overlaps.len();
    report.ledger_entries = extraction.ledger.len();

    let mut ctx = RunContext::new(config)?;
    let mut records = extraction.records;
    apply_strategies(config, &mut ctx, &mut records, &mut report)?;
    let records = apply_diversity(config, records, &mut report);
    report.records = records.len();

    let table = AnonymizedTable::from_records(&records, &table_fields(config, &*extractor));
    let suppressed: BTreeSet<usize> = report.suppressed_lines.iter().copied().collect();

    let text = if format.is_tabular() {
        let tabular = TabularExtractor::connection_summary(extractor.sensitive_fields().to_vec());
        tabular.render(raw, &records)
    } else {
        let ReconstructionOutput { text, replaced, conflicts } =
            reconstruct_text(raw, &extraction.ledger, &table);
        report.replacements = replaced;
        report.conflicts = conflicts;
        text
    };
    let text = suppress_lines(&text, &suppressed);

    info!(
        "Run {} complete: {} record(s), {} invalid value(s), {} conflict(s), {} suppressed line(s).",
        report.run_id,
        report.records,
        report.invalid_total(),
        report.conflicts.len(),
        report.suppressed_lines.len()
    );
    Ok(RunOutput {
        text,
        ledger: extraction.ledger,
        table,
        report,
    })
}

/// Rebuilds the anonymized text from persisted artifacts.
///
/// Offset-tracking formats replay the ledger. Tabular formats re-parse `raw`
/// and overlay the table's values column by column.
pub fn reconstruct_document(
    format: &LogFormat,
    raw: &str,
    ledger: &MappingLedger,
    table: &AnonymizedTable,
) -> Result<ReconstructionOutput> {
    if !format.is_tabular() {
        return Ok(reconstruct_text(raw, ledger, table));
    }

    let tabular = TabularExtractor::connection_summary(format.default_sensitive_fields());
    let mut records = extract_text(&tabular, raw).records;
    let mut replaced = 0;
    for record in &mut records {
        for name in tabular.columns() {
            if let Some(value) = table.get(record.line_no, name) {
                record.set(name.clone(), value);
                replaced += 1;
            }
        }
    }
    Ok(ReconstructionOutput {
        text: tabular.render(raw, &records),
        replaced,
        conflicts: Vec::new(),
    })
}
