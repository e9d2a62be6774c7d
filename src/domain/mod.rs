//! Domain layer - Core types and port definitions
//!
//! This module defines the result types of a reconciliation pass and the
//! traits (ports) that orchestration-API adapters implement.

pub mod ports;

pub use ports::*;
