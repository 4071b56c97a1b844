//! Shared types and utilities for enginescope
//!
//! This crate contains the instance-name decoder, device identifiers and the
//! sample types produced by the GPU sampler and consumed by the CLI.

pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{instance::*, usage::*};
