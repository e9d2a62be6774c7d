//! Custom Resource Definitions
//!
//! - Pgcluster: a PostgreSQL cluster and the storage of its logical volumes

pub mod pgcluster;

pub use pgcluster::*;
