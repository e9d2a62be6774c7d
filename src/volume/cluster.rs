//! Cluster Volume Orchestrator
//!
//! Provisions every logical volume of one cluster in a fixed order: data,
//! then WAL, then each tablespace by name. The first failure stops the pass.
//! Volumes created before the failure are kept.

use crate::crd::{PgStorageSpec, Pgcluster};
use crate::domain::ports::ClusterVolumeSet;
use crate::error::{Error, Result};
use crate::volume::naming::{tablespace_claim_name, wal_claim_name};
use crate::volume::provisioner::VolumeProvisioner;
use std::fmt;
use tracing::{info, warn};

/// Logical volume a provisioning step worked on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeStep {
    Data,
    Wal,
    Tablespace(String),
}

impl fmt::Display for VolumeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeStep::Data => write!(f, "data"),
            VolumeStep::Wal => write!(f, "wal"),
            VolumeStep::Tablespace(name) => write!(f, "tablespace {}", name),
        }
    }
}

/// Outcome of one reconciliation pass, possibly partial
#[derive(Debug)]
pub struct ProvisionReport {
    /// Volumes resolved so far. Steps skipped after a failure stay at their
    /// default value and skipped tablespaces have no entry.
    pub volumes: ClusterVolumeSet,
    /// The first failure and the step it happened in
    pub failure: Option<(VolumeStep, Error)>,
}

impl ProvisionReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// The volume set, or the first error
    pub fn into_result(self) -> Result<ClusterVolumeSet> {
        match self.failure {
            None => Ok(self.volumes),
            Some((_, e)) => Err(e),
        }
    }
}

/// Fans a [`VolumeProvisioner`] out across all volumes of a cluster
#[derive(Debug, Clone)]
pub struct ClusterVolumeOrchestrator {
    provisioner: VolumeProvisioner,
}

impl ClusterVolumeOrchestrator {
    pub fn new(provisioner: VolumeProvisioner) -> Self {
        Self { provisioner }
    }

    pub fn provisioner(&self) -> &VolumeProvisioner {
        &self.provisioner
    }

    /// Provision the data volume from `data_spec` and the cluster's WAL and
    /// tablespace volumes, naming every claim after `claim_name_prefix`.
    pub async fn provision(
        &self,
        cluster: &Pgcluster,
        namespace: &str,
        claim_name_prefix: &str,
        data_spec: &PgStorageSpec,
    ) -> ProvisionReport {
        let cluster_name = cluster.cluster_name();
        let mut volumes = ClusterVolumeSet::default();

        info!(
            cluster = %cluster_name,
            %namespace,
            tablespaces = cluster.spec.tablespace_mounts.len(),
            "Provisioning cluster volumes"
        );

        let (data, outcome) = self
            .provisioner
            .attempt(data_spec, claim_name_prefix, &cluster_name, namespace)
            .await;
        volumes.data = data;
        if let Err(e) = outcome {
            return Self::stop(volumes, VolumeStep::Data, e);
        }

        let (wal, outcome) = self
            .provisioner
            .attempt(
                &cluster.spec.wal_storage,
                &wal_claim_name(claim_name_prefix),
                &cluster_name,
                namespace,
            )
            .await;
        volumes.wal = wal;
        if let Err(e) = outcome {
            return Self::stop(volumes, VolumeStep::Wal, e);
        }

        for (tablespace, spec) in &cluster.spec.tablespace_mounts {
            let (result, outcome) = self
                .provisioner
                .attempt(
                    spec,
                    &tablespace_claim_name(claim_name_prefix, tablespace),
                    &cluster_name,
                    namespace,
                )
                .await;
            volumes.tablespaces.insert(tablespace.clone(), result);
            if let Err(e) = outcome {
                return Self::stop(volumes, VolumeStep::Tablespace(tablespace.clone()), e);
            }
        }

        info!(
            cluster = %cluster_name,
            claims = volumes.claim_count(),
            "Cluster volumes provisioned"
        );

        ProvisionReport {
            volumes,
            failure: None,
        }
    }

    fn stop(volumes: ClusterVolumeSet, step: VolumeStep, error: Error) -> ProvisionReport {
        warn!(
            %step,
            provisioned = volumes.claim_count(),
            "Stopping volume provisioning: {}",
            error
        );
        ProvisionReport {
            volumes,
            failure: Some((step, error)),
        }
    }
}
