//! Shared constants and small helpers used across the crate.

pub mod constants;
pub mod utils;
