//! PostgreSQL Volume Operator
//!
//! Provisions and reconciles the persistent volume claims of a clustered
//! PostgreSQL workload: the primary data volume, the write-ahead log volume
//! and any number of named tablespace volumes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                      Cluster Volume Orchestrator                            │
//! │              data  ──►  wal  ──►  tablespaces (by name)                     │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                          Volume Provisioner                                 │
//! │  ┌─────────────────────┐  ┌─────────────────────┐  ┌─────────────────────┐  │
//! │  │   Label Selector    │  │  Manifest Renderer  │  │    Claim Gate       │  │
//! │  │   (key=value)       │  │  (static/dynamic)   │  │  (exists/delete)    │  │
//! │  └─────────────────────┘  └─────────────────────┘  └─────────────────────┘  │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                             Adapters                                        │
//! │  ┌──────────────────────────────────┐  ┌──────────────────────────────────┐ │
//! │  │        Kubernetes API            │  │      In-memory claim store       │ │
//! │  └──────────────────────────────────┘  └──────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`volume`]: Claim provisioning, orchestration and deletion gating
//! - [`adapters`]: Kubernetes and in-memory implementations of the ports
//! - [`backrest`]: pgBackRest command dispatch into database pods
//! - [`crd`]: Custom Resource Definitions
//! - [`domain`]: Core domain types and traits
//! - [`metrics`]: Prometheus counters for claim operations
//! - [`error`]: Error types and handling

pub mod adapters;
pub mod backrest;
pub mod crd;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod volume;

// Re-export commonly used types
pub use adapters::{InMemoryClaimStore, KubeClaimClient, KubePodExecutor};

pub use backrest::{BackrestCommand, BackrestDispatcher, BackrestRequest};

pub use crd::{PgStorageSpec, Pgcluster, PgclusterSpec};

pub use domain::ports::{
    ClusterVolumeSet, ExecOutput, PodExecutor, StorageType, VolumeClaimClient, VolumeResult,
};

pub use error::{Error, ErrorAction, Result};

pub use metrics::ClaimMetrics;

pub use volume::{
    ClaimGate, ClusterVolumeOrchestrator, LabelSelectorBuilder, ManifestRenderer, ManifestSink,
    ProvisionReport, VolumeProvisioner, VolumeStep,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
