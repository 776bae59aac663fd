// logveil-core/tests/config_integration_tests.rs
use anyhow::Result;
use std::io::Write;
use tempfile::NamedTempFile;

use logveil_core::config::{
    AddressStrategy, AnonymizationConfig, NumericStrategy, PortStrategy, TextStrategy, TimestampStrategy,
};
use logveil_core::strategies::timestamp::Resolution;
use logveil_core::LogFormat;

fn write_config(yaml: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(yaml.as_bytes())?;
    Ok(file)
}

#[test]
fn test_load_full_config_from_file() -> Result<()> {
    let file = write_config(
        r#"
log_file: /var/log/suricata/fast.log
log_type: intrusion-alert
output_log: out/fast.anon.log
anonymization:
  salt: "0a1b2c3d"
  noise_seed: 42
  ip: {prefix: {bits: 16, key: "secret"}}
  port: hash
  timestamp: {bucketize: {resolution: week}}
  data: differential_privacy
  text: url
diversity:
  l_diversity:
    key_fields: [dest_port]
    sensitive_field: src_ip
    l: 3
  t_closeness:
    key_fields: [dest_port]
    sensitive_field: data
    t: 0.2
"#,
    )?;
    let config = AnonymizationConfig::load_from_file(file.path())?;

    assert_eq!(config.resolve_format()?, LogFormat::IntrusionAlert);
    assert_eq!(config.output_log.as_deref(), Some(std::path::Path::new("out/fast.anon.log")));
    let s = &config.anonymization;
    assert_eq!(s.noise_seed, Some(42));
    assert_eq!(
        s.address,
        Some(AddressStrategy::Prefix {
            bits: 16,
            key: Some("secret".to_string())
        })
    );
    assert_eq!(s.port, Some(PortStrategy::Hash));
    assert_eq!(
        s.timestamp,
        Some(TimestampStrategy::Bucketize {
            resolution: Resolution::Week
        })
    );
    assert_eq!(s.numeric, Some(NumericStrategy::Differential { epsilon: 1.0 }));
    assert_eq!(s.text, Some(TextStrategy::Url));

    let l_div = config.diversity.l_diversity.as_ref().unwrap();
    assert_eq!(l_div.l, 3);
    assert_eq!(config.diversity.t_closeness.as_ref().unwrap().t, 0.2);
    Ok(())
}

#[test]
fn test_defaults_hash_addresses_and_ports() -> Result<()> {
    let file = write_config("log_type: firewall\n")?;
    let config = AnonymizationConfig::load_from_file(file.path())?;
    assert_eq!(config.anonymization.address, Some(AddressStrategy::Hash));
    assert_eq!(config.anonymization.port, Some(PortStrategy::Hash));
    assert!(config.anonymization.timestamp.is_none());
    assert!(config.anonymization.salt.is_none());
    Ok(())
}

#[test]
fn test_null_strategy_disables_a_class() -> Result<()> {
    let file = write_config("anonymization:\n  address: ~\n  port: ~\n")?;
    let config = AnonymizationConfig::load_from_file(file.path())?;
    assert!(config.anonymization.address.is_none());
    assert!(config.anonymization.port.is_none());
    Ok(())
}

#[test]
fn test_field_class_aliases() -> Result<()> {
    let file = write_config(
        r#"
anonymization:
  fields:
    ip: [client]
    data: [bytes]
    text: [user]
"#,
    )?;
    let config = AnonymizationConfig::load_from_file(file.path())?;
    let fields = &config.anonymization.fields;
    assert_eq!(fields.address, vec!["client".to_string()]);
    assert_eq!(fields.numeric, vec!["bytes".to_string()]);
    // Untouched classes keep their defaults.
    assert_eq!(fields.port, vec!["src_port".to_string(), "dest_port".to_string()]);

    assert_eq!(fields.text, vec!["user".to_string()]);
    Ok(())
}

#[test]
fn test_custom_format_loads_with_grammar() -> Result<()> {
    let file = write_config(
        r#"
log_type: custom
anonymization:
  custom_format:
    pattern: 'from (?P<src_ip>\S+) port (?P<src_port>\d+)'
    fields: [src_ip, src_port]
"#,
    )?;
    let config = AnonymizationConfig::load_from_file(file.path())?;
    match config.resolve_format()? {
        LogFormat::Custom { fields, .. } => assert_eq!(fields, vec!["src_ip", "src_port"]),
        other => panic!("expected a custom format, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_invalid_files_are_rejected() -> Result<()> {
    let broken = write_config("anonymization: [unclosed\n")?;
    assert!(AnonymizationConfig::load_from_file(broken.path()).is_err());

    let unknown_type = write_config("log_type: netflow\n")?;
    let err = AnonymizationConfig::load_from_file(unknown_type.path()).unwrap_err();
    assert!(format!("{err:#}").contains("netflow"));

    let bad_t = write_config(
        "diversity:\n  t_closeness:\n    key_fields: [dest_port]\n    sensitive_field: src_ip\n    t: 1.5\n",
    )?;
    let err = AnonymizationConfig::load_from_file(bad_t.path()).unwrap_err();
    assert!(format!("{err:#}").contains("t_closeness.t"));

    assert!(AnonymizationConfig::load_from_file("/definitely/not/here.yaml").is_err());
    Ok(())
}
