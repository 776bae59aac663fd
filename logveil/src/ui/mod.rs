// logveil/src/ui/mod.rs
//! Console presentation: colour theme and summaries.

pub mod summary;
pub mod theme;
