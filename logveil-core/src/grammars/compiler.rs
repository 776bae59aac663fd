//! compiler.rs - Compilation and caching of extraction grammars.
//!
//! Grammars are compiled once per process and shared behind `Arc`, keyed by
//! a hash of the pattern text, so repeated runs over many files do not pay
//! for regex construction again.
//!
//! License: MIT OR APACHE 2.0

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use log::debug;
use regex::{Regex, RegexBuilder};

use crate::errors::LogveilError;

/// Upper bound on the length of any grammar, built-in or custom.
pub const MAX_PATTERN_LENGTH: usize = 4096;

lazy_static! {
    /// Process-wide cache of compiled grammars keyed by pattern hash.
    static ref GRAMMAR_CACHE: RwLock<HashMap<u64, Arc<Regex>>> = RwLock::new(HashMap::new());
}

fn hash_pattern(pattern: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    pattern.hash(&mut hasher);
    hasher.finish()
}

/// Compiles a single grammar with the length and size limits applied.
pub fn compile_grammar(name: &str, pattern: &str) -> Result<Regex, LogveilError> {
    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(LogveilError::PatternLengthExceeded(
            name.to_string(),
            pattern.len(),
            MAX_PATTERN_LENGTH,
        ));
    }

    let regex = RegexBuilder::new(pattern)
        .size_limit(10 * (1 << 20)) // 10 MB limit for compiled regex
        .build()
        .map_err(|e| LogveilError::PatternCompilation(name.to_string(), e))?;

    debug!(target: "logveil_core::grammar", "Grammar '{}' compiled successfully.", name);
    Ok(regex)
}

/// Returns the cached grammar for `pattern`, compiling it on first use.
pub fn get_or_compile(name: &str, pattern: &str) -> Result<Arc<Regex>, LogveilError> {
    let key = hash_pattern(pattern);

    {
        let cache = GRAMMAR_CACHE.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(regex) = cache.get(&key) {
            // A hash collision would hand back the wrong grammar.
            if regex.as_str() == pattern {
                debug!("Serving grammar '{}' from cache.", name);
                return Ok(Arc::clone(regex));
            }
        }
    }

    let compiled = Arc::new(compile_grammar(name, pattern)?);
    GRAMMAR_CACHE
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(key, Arc::clone(&compiled));
    Ok(compiled)
}

/// Checks that every listed field is a named group of `regex`.
pub fn ensure_named_groups(name: &str, regex: &Regex, fields: &[String]) -> Result<(), LogveilError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|f| !regex.capture_names().flatten().any(|group| group == f.as_str()))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LogveilError::Configuration(format!(
            "grammar '{}' has no named group for field(s): {}",
            name,
            missing.join(", ")
        )))
    }
}
