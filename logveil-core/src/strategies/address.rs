//! address.rs - IPv4 address strategies: salted octet hashing,
//! generalization to a network, and condensation of host numbers.
//!
//! License: MIT OR APACHE 2.0

use std::net::Ipv4Addr;

use log::debug;
use rand::Rng;

use crate::errors::{InvalidValue, ValueKind};
use crate::strategies::condensation::{condense, CondensationOutcome};
use crate::strategies::context::StableMap;
use crate::strategies::cryptopan::PrefixPreservingCipher;
use crate::strategies::noise::laplace;
use crate::strategies::ColumnOutcome;

/// Marker written by generalization for unparsable addresses.
pub const INVALID_IP: &str = "INVALID_IP";

/// Splits a dotted quad into its four octet texts, each in `0..=255`.
fn octets(value: &str) -> Option<[&str; 4]> {
    let mut parts = value.split('.');
    let out = [parts.next()?, parts.next()?, parts.next()?, parts.next()?];
    if parts.next().is_some() {
        return None;
    }
    out.iter()
        .all(|o| !o.is_empty() && o.len() <= 3 && o.parse::<u8>().is_ok())
        .then_some(out)
}

/// Maps each octet independently through the run's stable tables.
pub fn hash_ipv4(map: &StableMap, value: &str) -> Result<String, InvalidValue> {
    let parts = octets(value).ok_or_else(|| InvalidValue::new(ValueKind::Address, value))?;
    let mapped: Vec<String> = parts
        .iter()
        .enumerate()
        .map(|(position, octet)| map.map_octet(position, octet))
        .collect();
    Ok(mapped.join("."))
}

/// Replaces an address by its containing network, e.g. `192.168.1.0/24`.
pub fn generalize_ipv4(value: &str, prefix_len: u8) -> Result<String, InvalidValue> {
    let addr: Ipv4Addr = value
        .parse()
        .map_err(|_| InvalidValue::new(ValueKind::Address, value))?;
    if prefix_len > 32 {
        return Err(InvalidValue::new(ValueKind::Address, value));
    }
    let mask = if prefix_len == 0 { 0 } else { u32::MAX << (32 - prefix_len as u32) };
    let network = Ipv4Addr::from(u32::from(addr) & mask);
    Ok(format!("{network}/{prefix_len}"))
}

/// Address condensation: encrypt the network part prefix-preservingly, then
/// replace each host octet by its cluster mean plus Laplace noise.
///
/// The host octet is floored and clamped to `0..=255`. When fewer than `k`
/// valid addresses exist the column is returned unchanged with the outcome
/// set to `Underflow`.
pub fn condense_ipv4<R: Rng + ?Sized>(
    inputs: &[&str],
    cipher: &PrefixPreservingCipher,
    k: usize,
    epsilon: f64,
    rng: &mut R,
) -> (ColumnOutcome, CondensationOutcome) {
    let mut outcome = ColumnOutcome::unchanged(inputs);
    let mut valid = Vec::new();
    let mut encrypted = Vec::new();
    for (idx, value) in inputs.iter().enumerate() {
        match cipher.anonymize(value) {
            Ok(enc) => {
                valid.push(idx);
                encrypted.push(enc);
            }
            Err(err) => outcome.invalid.push((idx, err)),
        }
    }

    let hosts: Vec<f64> = encrypted
        .iter()
        .map(|enc| {
            enc.rsplit('.')
                .next()
                .and_then(|host| host.parse::<f64>().ok())
                .unwrap_or(0.0)
        })
        .collect();

    let condensation = condense(&hosts, k);
    if let CondensationOutcome::Balanced { assignment, means } = &condensation {
        let scale = 1.0 / epsilon;
        for (pos, &idx) in valid.iter().enumerate() {
            let mean = means[assignment[pos]].floor();
            let host = (mean + laplace(rng, scale)).floor().clamp(0.0, 255.0) as u8;
            let network = encrypted[pos]
                .rsplit_once('.')
                .map(|(net, _)| net)
                .unwrap_or_default();
            outcome.values[idx] = format!("{network}.{host}");
        }
    } else {
        debug!("Address condensation skipped: {:?}", condensation);
    }
    (outcome, condensation)
}
