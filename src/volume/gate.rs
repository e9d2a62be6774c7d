//! Existence checks and label-gated deletion of volume claims.

use crate::domain::ports::VolumeClaimClientRef;
use crate::error::Result;
use crate::metrics::ClaimMetrics;
use tracing::debug;

/// Label marking a claim as authorized for deletion
pub const LABEL_PGREMOVE: &str = "pgremove";

/// Looks up claims and deletes them only when they carry the removal label
#[derive(Clone)]
pub struct ClaimGate {
    client: VolumeClaimClientRef,
    metrics: Option<ClaimMetrics>,
}

impl ClaimGate {
    pub fn new(client: VolumeClaimClientRef) -> Self {
        Self {
            client,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ClaimMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Delete the claim if it exists and is labelled `pgremove=true`.
    ///
    /// A missing claim is not an error; lookup failures are returned as-is.
    pub async fn delete_if_exists(&self, name: &str, namespace: &str) -> Result<()> {
        let Some(claim) = self
            .client
            .get_volume_claim_if_exists(name, namespace)
            .await?
        else {
            return Ok(());
        };

        debug!("PVC {} is found", name);

        let removable = claim
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(LABEL_PGREMOVE))
            .is_some_and(|value| value == "true");

        if !removable {
            debug!("PVC {} is not labelled for removal, keeping it", name);
            return Ok(());
        }

        debug!("delete PVC {} in namespace {}", name, namespace);
        self.client.delete_volume_claim(name, namespace).await?;
        if let Some(metrics) = &self.metrics {
            metrics.record_deleted(namespace);
        }

        Ok(())
    }

    /// Whether the claim exists. Lookup failures count as absent.
    pub async fn exists(&self, name: &str, namespace: &str) -> bool {
        matches!(
            self.client.get_volume_claim_if_exists(name, namespace).await,
            Ok(Some(_))
        )
    }
}

impl std::fmt::Debug for ClaimGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryClaimStore;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use k8s_openapi::api::core::v1::PersistentVolumeClaim;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn claim(name: &str, labels: &[(&str, &str)]) -> PersistentVolumeClaim {
        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                ),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn gate_with(claims: &[PersistentVolumeClaim]) -> (Arc<InMemoryClaimStore>, ClaimGate) {
        let store = Arc::new(InMemoryClaimStore::new());
        for c in claims {
            store.insert("pgo", c.clone()).await;
        }
        (store.clone(), ClaimGate::new(store))
    }

    #[tokio::test]
    async fn test_unlabelled_claim_is_kept() {
        let (store, gate) = gate_with(&[claim("hippo", &[("vendor", "crunchydata")])]).await;

        gate.delete_if_exists("hippo", "pgo").await.unwrap();

        assert_eq!(store.delete_calls(), 0);
        assert!(store.contains("hippo", "pgo").await);
    }

    #[tokio::test]
    async fn test_label_must_be_true() {
        let (store, gate) = gate_with(&[claim("hippo", &[(LABEL_PGREMOVE, "yes")])]).await;

        gate.delete_if_exists("hippo", "pgo").await.unwrap();

        assert_eq!(store.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_labelled_claim_is_deleted_once() {
        let (store, gate) = gate_with(&[claim("hippo", &[(LABEL_PGREMOVE, "true")])]).await;
        let metrics = ClaimMetrics::new().unwrap();
        let gate = gate.with_metrics(metrics.clone());

        gate.delete_if_exists("hippo", "pgo").await.unwrap();

        assert_eq!(store.delete_calls(), 1);
        assert!(!store.contains("hippo", "pgo").await);
        assert_eq!(metrics.deleted("pgo"), 1);
    }

    #[tokio::test]
    async fn test_missing_claim_is_not_an_error() {
        let (store, gate) = gate_with(&[]).await;

        gate.delete_if_exists("hippo", "pgo").await.unwrap();

        assert_eq!(store.get_calls(), 1);
        assert_eq!(store.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_lookup_error_is_returned() {
        let (store, gate) = gate_with(&[claim("hippo", &[(LABEL_PGREMOVE, "true")])]).await;
        store.fail_lookups_for("hippo").await;

        assert_matches!(
            gate.delete_if_exists("hippo", "pgo").await,
            Err(Error::Lookup { .. })
        );
        assert_eq!(store.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_exists() {
        let (store, gate) = gate_with(&[claim("hippo", &[])]).await;

        assert!(gate.exists("hippo", "pgo").await);
        assert!(!gate.exists("hippo", "other").await);
        assert!(!gate.exists("rhino", "pgo").await);

        store.fail_lookups_for("hippo").await;
        assert!(!gate.exists("hippo", "pgo").await);
    }
}
