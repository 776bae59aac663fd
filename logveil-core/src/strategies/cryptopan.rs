//! cryptopan.rs - Prefix-preserving IPv4 encryption.
//!
//! Bit `i` of the output is bit `i` of the input XOR a pseudo-random bit
//! derived from the input's first `i` bits. Two addresses that agree on
//! their first `m` bits therefore agree on the first `m` output bits, and
//! the mapping is a bijection on the encrypted prefix. The pseudo-random
//! function is AES-256 keyed by SHA-256 of the caller's secret; only the
//! first `prefix_bits` bits are encrypted, the rest pass through.
//!
//! License: MIT OR APACHE 2.0

use std::net::Ipv4Addr;

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes256, Block};
use sha2::{Digest, Sha256};

use crate::errors::{InvalidValue, LogveilError, ValueKind};

/// Prefix length encrypted when the caller does not choose one.
pub const DEFAULT_PREFIX_BITS: u8 = 24;

pub struct PrefixPreservingCipher {
    cipher: Aes256,
    prefix_bits: u8,
}

impl std::fmt::Debug for PrefixPreservingCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixPreservingCipher")
            .field("prefix_bits", &self.prefix_bits)
            .finish_non_exhaustive()
    }
}

impl PrefixPreservingCipher {
    pub fn new(secret: &[u8], prefix_bits: u8) -> Result<Self, LogveilError> {
        if prefix_bits > 32 {
            return Err(LogveilError::Configuration(format!(
                "prefix length {prefix_bits} exceeds 32 bits"
            )));
        }
        let key = Sha256::digest(secret);
        let cipher = Aes256::new_from_slice(&key)
            .map_err(|e| LogveilError::Fatal(format!("AES key setup failed: {e}")))?;
        Ok(Self { cipher, prefix_bits })
    }

    pub fn prefix_bits(&self) -> u8 {
        self.prefix_bits
    }

    /// Pseudo-random bit for position `i` given the original leading bits.
    fn prf_bit(&self, original: u32, i: u8) -> u32 {
        let prefix = if i == 0 { 0 } else { original & (u32::MAX << (32 - i as u32)) };
        let mut block = Block::default();
        block[..4].copy_from_slice(&prefix.to_be_bytes());
        // Distinguishes a prefix of zeros from a shorter prefix.
        block[4] = i;
        self.cipher.encrypt_block(&mut block);

        let byte = block[(i / 8) as usize];
        ((byte >> (7 - (i % 8))) & 1) as u32
    }

    pub fn encrypt_u32(&self, original: u32) -> u32 {
        let mut out = original;
        for i in 0..self.prefix_bits {
            let shift = 31 - i as u32;
            out ^= self.prf_bit(original, i) << shift;
        }
        out
    }

    pub fn anonymize(&self, value: &str) -> Result<String, InvalidValue> {
        let addr: Ipv4Addr = value
            .parse()
            .map_err(|_| InvalidValue::new(ValueKind::Address, value))?;
        Ok(Ipv4Addr::from(self.encrypt_u32(u32::from(addr))).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_prefix(a: u32, b: u32) -> u32 {
        (a ^ b).leading_zeros()
    }

    #[test]
    fn preserves_shared_prefixes() {
        let cipher = PrefixPreservingCipher::new(b"k", DEFAULT_PREFIX_BITS).unwrap();
        let pairs = [
            ("192.168.1.10", "192.168.1.77"),
            ("192.168.1.10", "192.168.200.1"),
            ("10.0.0.1", "10.128.0.1"),
            ("10.0.0.1", "172.16.0.1"),
        ];
        for (a, b) in pairs {
            let (a, b): (Ipv4Addr, Ipv4Addr) = (a.parse().unwrap(), b.parse().unwrap());
            let m = shared_prefix(a.into(), b.into()).min(24);
            let ea = cipher.encrypt_u32(a.into());
            let eb = cipher.encrypt_u32(b.into());
            assert!(shared_prefix(ea, eb) >= m, "{a} / {b}");
            // Divergence inside the prefix stays divergence at the same bit.
            if m < 24 {
                assert_eq!(shared_prefix(ea, eb), m);
            }
        }
    }

    #[test]
    fn trailing_bits_pass_through() {
        let cipher = PrefixPreservingCipher::new(b"k", 24).unwrap();
        let out = cipher.anonymize("192.168.1.42").unwrap();
        assert!(out.ends_with(".42"));
        assert_ne!(out, "192.168.1.42");
    }

    #[test]
    fn key_changes_output_and_zero_prefix_is_identity() {
        let a = PrefixPreservingCipher::new(b"one", 24).unwrap();
        let b = PrefixPreservingCipher::new(b"two", 24).unwrap();
        assert_ne!(a.anonymize("8.8.8.8").unwrap(), b.anonymize("8.8.8.8").unwrap());

        let none = PrefixPreservingCipher::new(b"k", 0).unwrap();
        assert_eq!(none.anonymize("8.8.8.8").unwrap(), "8.8.8.8");
        assert!(PrefixPreservingCipher::new(b"k", 33).is_err());
    }

    #[test]
    fn rejects_malformed_addresses() {
        let cipher = PrefixPreservingCipher::new(b"k", 24).unwrap();
        let err = cipher.anonymize("10.0.0").unwrap_err();
        assert_eq!(err.kind, ValueKind::Address);
    }
}
