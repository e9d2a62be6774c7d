//! Orchestration API Adapters
//!
//! Provides implementations of the domain ports:
//! - kubernetes: the Kubernetes API
//! - memory: an in-memory claim store for standalone mode and tests

pub mod kubernetes;
pub mod memory;

pub use kubernetes::*;
pub use memory::*;
