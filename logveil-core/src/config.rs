//! Configuration management for `logveil-core`.
//!
//! This module defines the YAML run configuration: which log to read, which
//! grammar to apply, which strategy anonymizes each field class and which
//! diversity filters run afterwards. It handles deserialization and validates
//! every parameter before any output is produced.
//!
//! Strategies are written either as a bare name (`hash`, `round`, `url`) or as
//! a single-key mapping from name to parameters
//! (`{condensation: {k: 5, epsilon: 1.0}}`).
//!
//! License: MIT OR APACHE 2.0

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::TimeDelta;
use log::{debug, info};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_yml::{Mapping, Value};

use crate::errors::LogveilError;
use crate::grammars::{CustomGrammar, LogFormat};
use crate::strategies::cryptopan::DEFAULT_PREFIX_BITS;
use crate::strategies::timestamp::Resolution;
use crate::strategies::StableMap;

/// A strategy as written in YAML, before its parameters are checked.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySpec {
    pub name: String,
    params: Value,
}

impl StrategySpec {
    /// Deserializes the parameters, treating an absent block as empty so
    /// field defaults apply.
    fn params<T: DeserializeOwned>(&self) -> std::result::Result<T, String> {
        let params = match &self.params {
            Value::Null => Value::Mapping(Mapping::new()),
            other => other.clone(),
        };
        serde_yml::from_value(params)
            .map_err(|e| format!("invalid parameters for strategy '{}': {}", self.name, e))
    }

    fn unknown(&self, class: &str) -> String {
        format!("unknown {} strategy '{}'", class, self.name)
    }
}

impl<'de> Deserialize<'de> for StrategySpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(name) => Ok(StrategySpec { name, params: Value::Null }),
            Value::Mapping(map) => {
                let mut entries = map.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((Value::String(name), params)), None) => Ok(StrategySpec { name, params }),
                    _ => Err(D::Error::custom(
                        "a strategy must be a name or a mapping with exactly one key",
                    )),
                }
            }
            other => Err(D::Error::custom(format!("expected a strategy, found {other:?}"))),
        }
    }
}

fn default_prefix_len() -> u8 {
    24
}
fn default_prefix_bits() -> u8 {
    DEFAULT_PREFIX_BITS
}
fn default_k() -> usize {
    5
}
fn default_epsilon() -> f64 {
    1.0
}
fn default_window_minutes() -> u32 {
    5
}
fn default_max_shift_hours() -> u32 {
    24
}
fn default_visible() -> usize {
    3
}
fn default_mask_char() -> char {
    'X'
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MaskParams {
    #[serde(default = "default_prefix_len")]
    prefix_len: u8,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PrefixParams {
    #[serde(default = "default_prefix_bits")]
    bits: u8,
    #[serde(default)]
    key: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CondensationParams {
    #[serde(default = "default_k")]
    k: usize,
    #[serde(default = "default_epsilon")]
    epsilon: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DifferentialParams {
    #[serde(default = "default_epsilon")]
    epsilon: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PerturbParams {
    #[serde(default = "default_window_minutes")]
    window_minutes: u32,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BucketizeParams {
    #[serde(default)]
    resolution: Resolution,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ShiftParams {
    #[serde(default = "default_max_shift_hours")]
    max_shift_hours: u32,
    #[serde(default)]
    seed: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AdaptiveParams {
    #[serde(default)]
    global_offset_seconds: Option<i64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TextMaskParams {
    #[serde(default = "default_visible")]
    visible: usize,
    #[serde(default = "default_mask_char")]
    mask_char: char,
}

/// How address fields are anonymized.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "StrategySpec")]
pub enum AddressStrategy {
    /// Per-octet salted hash through the run's `StableMap`. Also accepted as `salt`.
    Hash,
    /// Keep the first `prefix_len` bits, zero the rest.
    Mask { prefix_len: u8 },
    /// Prefix-preserving encryption of the first `bits` bits.
    Prefix { bits: u8, key: Option<String> },
    /// Prefix encryption plus host-octet condensation.
    Condensation { k: usize, epsilon: f64 },
}

impl TryFrom<StrategySpec> for AddressStrategy {
    type Error = String;

    fn try_from(spec: StrategySpec) -> std::result::Result<Self, String> {
        match spec.name.as_str() {
            "hash" | "salt" => Ok(AddressStrategy::Hash),
            "mask" => {
                let p: MaskParams = spec.params()?;
                Ok(AddressStrategy::Mask { prefix_len: p.prefix_len })
            }
            "prefix" | "cryptopan" => {
                let p: PrefixParams = spec.params()?;
                Ok(AddressStrategy::Prefix { bits: p.bits, key: p.key })
            }
            "condensation" => {
                let p: CondensationParams = spec.params()?;
                Ok(AddressStrategy::Condensation { k: p.k, epsilon: p.epsilon })
            }
            _ => Err(spec.unknown("address")),
        }
    }
}

/// How port fields are anonymized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "StrategySpec")]
pub enum PortStrategy {
    Hash,
}

impl TryFrom<StrategySpec> for PortStrategy {
    type Error = String;

    fn try_from(spec: StrategySpec) -> std::result::Result<Self, String> {
        match spec.name.as_str() {
            "hash" | "salt" => Ok(PortStrategy::Hash),
            _ => Err(spec.unknown("port")),
        }
    }
}

/// How timestamp fields are anonymized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "StrategySpec")]
pub enum TimestampStrategy {
    Round,
    Perturb { window_minutes: u32 },
    Bucketize { resolution: Resolution },
    /// One offset for the whole dataset, derived from `seed` (random when absent).
    Shift { max_shift_hours: u32, seed: Option<String> },
    /// Order-preserving noise, optionally followed by a global offset.
    Adaptive { global_offset_seconds: Option<i64> },
}

impl TryFrom<StrategySpec> for TimestampStrategy {
    type Error = String;

    fn try_from(spec: StrategySpec) -> std::result::Result<Self, String> {
        match spec.name.as_str() {
            "round" => Ok(TimestampStrategy::Round),
            "perturb" => {
                let p: PerturbParams = spec.params()?;
                Ok(TimestampStrategy::Perturb { window_minutes: p.window_minutes })
            }
            "bucketize" => {
                let p: BucketizeParams = spec.params()?;
                Ok(TimestampStrategy::Bucketize { resolution: p.resolution })
            }
            "shift" => {
                let p: ShiftParams = spec.params()?;
                Ok(TimestampStrategy::Shift {
                    max_shift_hours: p.max_shift_hours,
                    seed: p.seed,
                })
            }
            "adaptive" => {
                let p: AdaptiveParams = spec.params()?;
                Ok(TimestampStrategy::Adaptive {
                    global_offset_seconds: p.global_offset_seconds,
                })
            }
            _ => Err(spec.unknown("timestamp")),
        }
    }
}

/// How numeric fields are anonymized.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "StrategySpec")]
pub enum NumericStrategy {
    Differential { epsilon: f64 },
    Condensation { k: usize, epsilon: f64 },
}

impl TryFrom<StrategySpec> for NumericStrategy {
    type Error = String;

    fn try_from(spec: StrategySpec) -> std::result::Result<Self, String> {
        match spec.name.as_str() {
            "differential" | "differential_privacy" => {
                let p: DifferentialParams = spec.params()?;
                Ok(NumericStrategy::Differential { epsilon: p.epsilon })
            }
            "condensation" => {
                let p: CondensationParams = spec.params()?;
                Ok(NumericStrategy::Condensation { k: p.k, epsilon: p.epsilon })
            }
            _ => Err(spec.unknown("numeric")),
        }
    }
}

/// How free-text fields are anonymized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "StrategySpec")]
pub enum TextStrategy {
    Mask { visible: usize, mask_char: char },
    /// Keep scheme, host and first path segment of a URL.
    Url,
}

impl TryFrom<StrategySpec> for TextStrategy {
    type Error = String;

    fn try_from(spec: StrategySpec) -> std::result::Result<Self, String> {
        match spec.name.as_str() {
            "mask" => {
                let p: TextMaskParams = spec.params()?;
                Ok(TextStrategy::Mask {
                    visible: p.visible,
                    mask_char: p.mask_char,
                })
            }
            "url" => Ok(TextStrategy::Url),
            _ => Err(spec.unknown("text")),
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
fn default_address_fields() -> Vec<String> {
    names(&["src_ip", "dest_ip"])
}
fn default_port_fields() -> Vec<String> {
    names(&["src_port", "dest_port"])
}
fn default_timestamp_fields() -> Vec<String> {
    names(&["timestamp"])
}
fn default_numeric_fields() -> Vec<String> {
    names(&["data"])
}

/// Which extracted fields belong to which class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldClasses {
    #[serde(default = "default_address_fields", alias = "ip")]
    pub address: Vec<String>,
    #[serde(default = "default_port_fields")]
    pub port: Vec<String>,
    #[serde(default = "default_timestamp_fields")]
    pub timestamp: Vec<String>,
    #[serde(default = "default_numeric_fields", alias = "data")]
    pub numeric: Vec<String>,
    #[serde(default)]
    pub text: Vec<String>,
}

impl Default for FieldClasses {
    fn default() -> Self {
        Self {
            address: default_address_fields(),
            port: default_port_fields(),
            timestamp: default_timestamp_fields(),
            numeric: default_numeric_fields(),
            text: Vec::new(),
        }
    }
}

impl FieldClasses {
    /// Every classified field, for building the anonymized table.
    pub fn all(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .address
            .iter()
            .chain(&self.port)
            .chain(&self.timestamp)
            .chain(&self.numeric)
            .chain(&self.text)
            .cloned()
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

fn default_address_strategy() -> Option<AddressStrategy> {
    Some(AddressStrategy::Hash)
}
fn default_port_strategy() -> Option<PortStrategy> {
    Some(PortStrategy::Hash)
}

/// The `anonymization` section.
///
/// Addresses and ports are hashed unless configured otherwise; the other
/// classes are left untouched without a strategy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnonymizationSettings {
    /// Hex salt for hashing and prefix encryption. Random per run when absent.
    #[serde(default)]
    pub salt: Option<String>,
    /// Seed for every noise draw, for reproducible runs.
    #[serde(default)]
    pub noise_seed: Option<u64>,
    #[serde(default = "default_address_strategy", alias = "ip")]
    pub address: Option<AddressStrategy>,
    #[serde(default = "default_port_strategy")]
    pub port: Option<PortStrategy>,
    #[serde(default)]
    pub timestamp: Option<TimestampStrategy>,
    #[serde(default, alias = "data")]
    pub numeric: Option<NumericStrategy>,
    #[serde(default)]
    pub text: Option<TextStrategy>,
    #[serde(default)]
    pub custom_format: Option<CustomGrammar>,
    /// Replaces the format's default ledger fields.
    #[serde(default)]
    pub sensitive_fields: Option<Vec<String>>,
    #[serde(default)]
    pub fields: FieldClasses,
}

impl Default for AnonymizationSettings {
    fn default() -> Self {
        Self {
            salt: None,
            noise_seed: None,
            address: default_address_strategy(),
            port: default_port_strategy(),
            timestamp: None,
            numeric: None,
            text: None,
            custom_format: None,
            sensitive_fields: None,
            fields: FieldClasses::default(),
        }
    }
}

/// Group-level l-diversity parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LDiversitySettings {
    pub key_fields: Vec<String>,
    pub sensitive_field: String,
    pub l: usize,
}

/// Group-level t-closeness parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TClosenessSettings {
    pub key_fields: Vec<String>,
    pub sensitive_field: String,
    pub t: f64,
}

/// The optional `diversity` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiversitySettings {
    #[serde(default)]
    pub l_diversity: Option<LDiversitySettings>,
    #[serde(default)]
    pub t_closeness: Option<TClosenessSettings>,
}

fn default_log_type() -> String {
    "firewall".to_string()
}

/// A complete anonymization run description.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnonymizationConfig {
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_log_type")]
    pub log_type: String,
    #[serde(default)]
    pub output_log: Option<PathBuf>,
    #[serde(default)]
    pub anonymization: AnonymizationSettings,
    #[serde(default)]
    pub diversity: DiversitySettings,
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            log_type: default_log_type(),
            output_log: None,
            anonymization: AnonymizationSettings::default(),
            diversity: DiversitySettings::default(),
        }
    }
}

impl AnonymizationConfig {
    /// Loads and validates a configuration from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading anonymization config from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!(
            "Loaded config for log type '{}' from {}.",
            config.log_type,
            path.display()
        );
        Ok(config)
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: AnonymizationConfig =
            serde_yml::from_str(text).context("Failed to parse YAML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves `log_type` and the optional custom grammar into a `LogFormat`.
    pub fn resolve_format(&self) -> std::result::Result<LogFormat, LogveilError> {
        LogFormat::from_tag(&self.log_type, self.anonymization.custom_format.as_ref())
    }

    /// Checks every parameter, reporting all problems at once.
    pub fn validate(&self) -> std::result::Result<(), LogveilError> {
        let mut errors = Vec::new();
        let settings = &self.anonymization;

        if let Err(e) = self.resolve_format() {
            errors.push(e.to_string());
        }
        if let Some(salt) = &settings.salt {
            if let Err(e) = StableMap::from_hex_salt(salt) {
                errors.push(e.to_string());
            }
        }

        match &settings.address {
            Some(AddressStrategy::Mask { prefix_len }) if *prefix_len > 32 => {
                errors.push(format!("address mask prefix_len {prefix_len} exceeds 32"));
            }
            Some(AddressStrategy::Prefix { bits, .. }) if *bits > 32 => {
                errors.push(format!("address prefix bits {bits} exceeds 32"));
            }
            Some(AddressStrategy::Condensation { k, epsilon }) => {
                check_condensation("address", *k, *epsilon, &mut errors);
            }
            _ => {}
        }
        if let Some(TimestampStrategy::Adaptive { global_offset_seconds: Some(seconds) }) = &settings.timestamp {
            if TimeDelta::try_seconds(*seconds).is_none() {
                errors.push(format!("timestamp global_offset_seconds {seconds} is out of range"));
            }
        }
        match &settings.numeric {
            Some(NumericStrategy::Differential { epsilon }) => {
                check_epsilon("numeric", *epsilon, &mut errors);
            }
            Some(NumericStrategy::Condensation { k, epsilon }) => {
                check_condensation("numeric", *k, *epsilon, &mut errors);
            }
            None => {}
        }

        if let Some(l_div) = &self.diversity.l_diversity {
            if l_div.l < 1 {
                errors.push("l_diversity.l must be at least 1".to_string());
            }
            if l_div.key_fields.is_empty() {
                errors.push("l_diversity.key_fields must not be empty".to_string());
            }
        }
        if let Some(t_close) = &self.diversity.t_closeness {
            if !(0.0..=1.0).contains(&t_close.t) {
                errors.push(format!("t_closeness.t {} is outside [0, 1]", t_close.t));
            }
            if t_close.key_fields.is_empty() {
                errors.push("t_closeness.key_fields must not be empty".to_string());
            }
        }

        if errors.is_empty() {
            debug!("Configuration validated.");
            Ok(())
        } else {
            Err(LogveilError::Configuration(format!(
                "config validation failed:\n{}",
                errors.join("\n")
            )))
        }
    }
}

fn check_epsilon(class: &str, epsilon: f64, errors: &mut Vec<String>) {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        errors.push(format!("{class} epsilon must be a positive number, got {epsilon}"));
    }
}

fn check_condensation(class: &str, k: usize, epsilon: f64, errors: &mut Vec<String>) {
    if k < 1 {
        errors.push(format!("{class} condensation k must be at least 1"));
    }
    check_epsilon(class, epsilon, errors);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies_accept_names_and_mappings() -> Result<()> {
        let config = AnonymizationConfig::from_yaml_str(
            r#"
log_type: firewall
anonymization:
  address: salt
  port: hash
  timestamp: {perturb: {window_minutes: 2}}
  numeric:
    condensation:
      k: 3
  text: {mask: {visible: 2}}
"#,
        )?;
        let s = &config.anonymization;
        assert_eq!(s.address, Some(AddressStrategy::Hash));
        assert_eq!(s.port, Some(PortStrategy::Hash));
        assert_eq!(s.timestamp, Some(TimestampStrategy::Perturb { window_minutes: 2 }));
        assert_eq!(s.numeric, Some(NumericStrategy::Condensation { k: 3, epsilon: 1.0 }));
        assert_eq!(s.text, Some(TextStrategy::Mask { visible: 2, mask_char: 'X' }));
        assert_eq!(s.fields, FieldClasses::default());
        Ok(())
    }

    #[test]
    fn bare_name_uses_parameter_defaults() -> Result<()> {
        let config = AnonymizationConfig::from_yaml_str("anonymization:\n  address: prefix\n")?;
        assert_eq!(
            config.anonymization.address,
            Some(AddressStrategy::Prefix { bits: 24, key: None })
        );
        Ok(())
    }

    #[test]
    fn unknown_strategy_and_parameter_are_rejected() {
        assert!(AnonymizationConfig::from_yaml_str("anonymization:\n  address: scramble\n").is_err());
        assert!(AnonymizationConfig::from_yaml_str(
            "anonymization:\n  address: {mask: {prefix: 8}}\n"
        )
        .is_err());
    }

    #[test]
    fn validation_collects_all_errors() {
        let mut config = AnonymizationConfig::default();
        config.anonymization.address = Some(AddressStrategy::Mask { prefix_len: 40 });
        config.anonymization.numeric = Some(NumericStrategy::Differential { epsilon: 0.0 });
        config.anonymization.salt = Some("not-hex".to_string());

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("prefix_len 40"));
        assert!(message.contains("epsilon"));
        assert!(message.contains("hex"));
    }

    #[test]
    fn out_of_range_global_offset_is_rejected() {
        let err = AnonymizationConfig::from_yaml_str(
            "anonymization:\n  timestamp: {adaptive: {global_offset_seconds: 9223372036854775807}}\n",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("global_offset_seconds"));

        let config = AnonymizationConfig::from_yaml_str(
            "anonymization:\n  timestamp: {adaptive: {global_offset_seconds: -86400}}\n",
        );
        assert!(config.is_ok());
    }

    #[test]
    fn custom_type_without_pattern_is_a_configuration_error() {
        let config = AnonymizationConfig {
            log_type: "custom".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(LogveilError::Configuration(_))));
    }
}
