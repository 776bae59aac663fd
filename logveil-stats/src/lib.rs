// logveil-stats/src/lib.rs
//! A `no_std` statistics kernel shared by the logveil anonymizer.
//!
//! - [`entropy`]: Shannon entropy of pre-counted histograms.
//! - [`statistics`]: mean and observed range.
//! - [`distance`]: ordered earth-mover's distance between two histograms.
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod distance;
pub mod entropy;
pub mod statistics;

/// Common type definitions
pub type Bits = f64;
