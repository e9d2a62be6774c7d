//! Domain Ports - Core trait definitions for the volume operator
//!
//! These traits define the boundaries between the provisioning logic and the
//! orchestration API. Adapters implement these traits to provide concrete
//! functionality.

use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    EmptyDirVolumeSource, PersistentVolumeClaim, PersistentVolumeClaimVolumeSource, Volume,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Storage Types
// =============================================================================

/// How a logical volume is backed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Pod-local scratch space, no claim
    #[default]
    #[serde(rename = "emptydir", alias = "")]
    Empty,
    /// Bind to a claim the user created
    Existing,
    /// Static claim, optionally bound through a label selector
    Create,
    /// Claim provisioned through a storage class
    Dynamic,
}

impl StorageType {
    /// Whether this storage type is backed by a volume claim
    pub fn uses_claim(&self) -> bool {
        !matches!(self, StorageType::Empty)
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::Empty => write!(f, "emptydir"),
            StorageType::Existing => write!(f, "existing"),
            StorageType::Create => write!(f, "create"),
            StorageType::Dynamic => write!(f, "dynamic"),
        }
    }
}

// =============================================================================
// Provisioning Results
// =============================================================================

/// Outcome of provisioning one logical volume
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeResult {
    /// Claim backing the volume, empty for emptydir storage
    pub claim_name: String,
    /// Supplemental groups the workload pod must run with
    pub supplemental_groups: Vec<i64>,
}

impl VolumeResult {
    /// Whether the volume is backed by a claim
    pub fn has_claim(&self) -> bool {
        !self.claim_name.is_empty()
    }

    /// Pod volume referencing this result
    pub fn to_volume(&self, volume_name: &str) -> Volume {
        let mut volume = Volume {
            name: volume_name.to_string(),
            ..Default::default()
        };

        if self.has_claim() {
            volume.persistent_volume_claim = Some(PersistentVolumeClaimVolumeSource {
                claim_name: self.claim_name.clone(),
                ..Default::default()
            });
        } else {
            volume.empty_dir = Some(EmptyDirVolumeSource::default());
        }

        volume
    }
}

/// Every logical volume of one cluster after a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVolumeSet {
    pub data: VolumeResult,
    pub wal: VolumeResult,
    pub tablespaces: BTreeMap<String, VolumeResult>,
}

impl ClusterVolumeSet {
    /// Number of volumes backed by a claim
    pub fn claim_count(&self) -> usize {
        [&self.data, &self.wal]
            .into_iter()
            .chain(self.tablespaces.values())
            .filter(|v| v.has_claim())
            .count()
    }
}

// =============================================================================
// Volume Claim Client Port
// =============================================================================

/// Port for the orchestration API's volume claim operations
#[async_trait]
pub trait VolumeClaimClient: Send + Sync {
    /// Submit a new claim. Must report an existing claim of the same name as
    /// [`Error::AlreadyExists`](crate::error::Error::AlreadyExists).
    async fn create_volume_claim(&self, namespace: &str, claim: &PersistentVolumeClaim)
        -> Result<()>;

    /// Fetch a claim, `Ok(None)` when it does not exist
    async fn get_volume_claim_if_exists(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<PersistentVolumeClaim>>;

    /// Delete a claim
    async fn delete_volume_claim(&self, name: &str, namespace: &str) -> Result<()>;
}

// =============================================================================
// Pod Executor Port
// =============================================================================

/// Captured output of a command run inside a pod
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Port for running a command inside a running container
#[async_trait]
pub trait PodExecutor: Send + Sync {
    /// Run `command` in `container`, feeding `stdin`, and wait for it to finish
    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: &[String],
        stdin: &str,
    ) -> Result<ExecOutput>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type VolumeClaimClientRef = Arc<dyn VolumeClaimClient>;
pub type PodExecutorRef = Arc<dyn PodExecutor>;
