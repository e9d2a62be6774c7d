//! Pgcluster CRD
//!
//! Declares a PostgreSQL cluster and the storage backing each of its
//! logical volumes: primary data, replicas, write-ahead log and tablespaces.

use crate::domain::ports::StorageType;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Pgcluster CRD
// =============================================================================

/// A PostgreSQL cluster managed by the operator.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "crunchydata.com",
    version = "v1",
    kind = "Pgcluster",
    plural = "pgclusters",
    namespaced,
    printcolumn = r#"{"name": "Cluster", "type": "string", "jsonPath": ".spec.name"}"#,
    printcolumn = r#"{"name": "Storage", "type": "string", "jsonPath": ".spec.primaryStorage.storageType"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PgclusterSpec {
    /// Cluster name, used to label every claim created for it
    #[serde(default)]
    pub name: String,

    /// Storage for the primary's data directory
    #[serde(default)]
    pub primary_storage: PgStorageSpec,

    /// Storage for each replica's data directory
    #[serde(default)]
    pub replica_storage: PgStorageSpec,

    /// Storage for the write-ahead log
    #[serde(default)]
    pub wal_storage: PgStorageSpec,

    /// Storage for each tablespace, keyed by tablespace name
    #[serde(default)]
    pub tablespace_mounts: BTreeMap<String, PgStorageSpec>,
}

impl Pgcluster {
    /// Name of the cluster, falling back to the object name
    pub fn cluster_name(&self) -> String {
        if self.spec.name.is_empty() {
            self.metadata.name.clone().unwrap_or_default()
        } else {
            self.spec.name.clone()
        }
    }
}

// =============================================================================
// Storage Specification
// =============================================================================

/// Desired storage for one logical volume
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PgStorageSpec {
    /// How the volume is backed
    #[serde(default)]
    pub storage_type: StorageType,

    /// Claim to bind to, only meaningful for `existing`
    #[serde(default)]
    pub name: String,

    /// Claim access mode (e.g. "ReadWriteOnce")
    #[serde(default)]
    pub access_mode: String,

    /// Requested capacity (e.g. "1G")
    #[serde(default)]
    pub size: String,

    /// Storage class for `dynamic` claims
    #[serde(default)]
    pub storage_class: String,

    /// A single "key=value" label. `create` claims use it to bind to
    /// pre-existing volumes; it is validated for every claim
    #[serde(default)]
    pub match_labels: String,

    /// Supplemental groups the workload must run with to use the volume
    #[serde(default)]
    pub supplemental_groups: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLUSTER: &str = r#"
apiVersion: crunchydata.com/v1
kind: Pgcluster
metadata:
  name: hippo
  namespace: pgo
spec:
  primaryStorage:
    storageType: dynamic
    accessMode: ReadWriteOnce
    size: 1G
    storageClass: fast
    supplementalGroups: [65534]
  walStorage:
    storageType: ""
  tablespaceMounts:
    lake:
      storageType: create
      accessMode: ReadWriteMany
      size: 5G
      matchLabels: env=prod
    archive:
      storageType: existing
      name: archive-claim
"#;

    #[test]
    fn test_parse_cluster_manifest() {
        let cluster: Pgcluster = serde_yaml::from_str(CLUSTER).unwrap();

        assert_eq!(cluster.cluster_name(), "hippo");
        assert_eq!(cluster.spec.primary_storage.storage_type, StorageType::Dynamic);
        assert_eq!(cluster.spec.primary_storage.supplemental_groups, vec![65534]);
        assert_eq!(cluster.spec.wal_storage.storage_type, StorageType::Empty);
        assert_eq!(cluster.spec.replica_storage, PgStorageSpec::default());

        let names: Vec<&str> = cluster
            .spec
            .tablespace_mounts
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(names, vec!["archive", "lake"]);
        assert_eq!(cluster.spec.tablespace_mounts["lake"].match_labels, "env=prod");
    }

    #[test]
    fn test_spec_name_wins_over_metadata() {
        let mut cluster: Pgcluster = serde_yaml::from_str(CLUSTER).unwrap();
        cluster.spec.name = "hippo-prod".into();
        assert_eq!(cluster.cluster_name(), "hippo-prod");
    }
}
