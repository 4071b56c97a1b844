//! Type definitions shared across crates

pub mod instance;
pub mod usage;
