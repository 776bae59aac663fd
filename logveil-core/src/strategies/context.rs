//! context.rs - Run-scoped state shared by the deterministic strategies.
//!
//! A `StableMap` carries the secret salt and the lookup tables that make
//! salted hashing consistent within a run: the same octet at the same
//! position, or the same port, always maps to the same output. That
//! consistency keeps joins and subnet structure usable downstream, at the
//! cost that equal inputs are visibly equal in the output.
//!
//! Each table has its own lock, so lookups for different octet positions
//! never contend.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::errors::LogveilError;

/// Length of a generated salt in bytes.
pub const SALT_LEN: usize = 16;

/// Lowest port number produced by port hashing.
pub const PORT_FLOOR: u64 = 1024;
/// Size of the port codomain, `[1024, 65535)`.
pub const PORT_SPAN: u64 = 65535 - PORT_FLOOR;

#[derive(Debug)]
pub struct StableMap {
    salt: Vec<u8>,
    octets: [Mutex<HashMap<String, String>>; 4],
    ports: Mutex<HashMap<String, String>>,
}

impl StableMap {
    pub fn new(salt: Vec<u8>) -> Self {
        Self {
            salt,
            octets: Default::default(),
            ports: Mutex::new(HashMap::new()),
        }
    }

    /// A map with a fresh random salt, for runs that must not be linkable.
    pub fn with_random_salt() -> Self {
        let mut salt = vec![0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt);
        Self::new(salt)
    }

    /// A map keyed by a caller-supplied hex salt, for reproducible runs.
    pub fn from_hex_salt(salt_hex: &str) -> Result<Self, LogveilError> {
        let salt = hex::decode(salt_hex.trim())
            .map_err(|e| LogveilError::Configuration(format!("salt is not valid hex: {e}")))?;
        if salt.is_empty() {
            return Err(LogveilError::Configuration("salt must not be empty".to_string()));
        }
        Ok(Self::new(salt))
    }

    pub fn salt_hex(&self) -> String {
        hex::encode(&self.salt)
    }

    /// Maps one octet at `position` (0..4), caching the result.
    pub fn map_octet(&self, position: usize, octet: &str) -> String {
        let mut table = self.octets[position % 4]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        table
            .entry(octet.to_string())
            .or_insert_with(|| (salted_mod(&self.salt, octet, 256)).to_string())
            .clone()
    }

    /// Maps a port into `[1024, 65535)`, caching the result.
    pub fn map_port(&self, port: &str) -> String {
        let mut table = self.ports.lock().unwrap_or_else(PoisonError::into_inner);
        table
            .entry(port.to_string())
            .or_insert_with(|| (salted_mod(&self.salt, port, PORT_SPAN) + PORT_FLOOR).to_string())
            .clone()
    }

    /// Number of distinct octets mapped at `position`.
    pub fn octet_table_len(&self, position: usize) -> usize {
        self.octets[position % 4]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn port_table_len(&self) -> usize {
        self.ports.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// SHA-256(salt || value) read as a big-endian integer, reduced mod `modulus`.
pub fn salted_mod(salt: &[u8], value: &str, modulus: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    digest
        .iter()
        .fold(0u128, |acc, &byte| (acc * 256 + byte as u128) % modulus as u128) as u64
}
