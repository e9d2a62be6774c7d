//! Volume Provisioner
//!
//! Applies the create-if-needed policy for a single logical volume.

use crate::crd::PgStorageSpec;
use crate::domain::ports::{StorageType, VolumeClaimClientRef, VolumeResult};
use crate::error::Result;
use crate::metrics::ClaimMetrics;
use crate::volume::manifest::{ClaimFields, ManifestRenderer};
use crate::volume::selector::{LabelSelectorBuilder, MatchLabel};
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use tracing::{debug, error, info};

/// Creates the claim backing one logical volume when its storage calls for it
#[derive(Clone)]
pub struct VolumeProvisioner {
    client: VolumeClaimClientRef,
    renderer: ManifestRenderer,
    metrics: Option<ClaimMetrics>,
}

impl VolumeProvisioner {
    pub fn new(client: VolumeClaimClientRef, renderer: ManifestRenderer) -> Self {
        Self {
            client,
            renderer,
            metrics: None,
        }
    }

    /// Count create outcomes in `metrics`
    pub fn with_metrics(mut self, metrics: ClaimMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Resolve `spec` into a [`VolumeResult`], creating `claim_name` if the
    /// storage type calls for a claim. A claim that already exists counts as
    /// success.
    pub async fn ensure(
        &self,
        spec: &PgStorageSpec,
        claim_name: &str,
        cluster_name: &str,
        namespace: &str,
    ) -> Result<VolumeResult> {
        let (result, outcome) = self.attempt(spec, claim_name, cluster_name, namespace).await;
        outcome.map(|()| result)
    }

    /// Like [`ensure`](Self::ensure), but keeps the result descriptor even
    /// when creation fails.
    pub(crate) async fn attempt(
        &self,
        spec: &PgStorageSpec,
        claim_name: &str,
        cluster_name: &str,
        namespace: &str,
    ) -> (VolumeResult, Result<()>) {
        let mut result = VolumeResult {
            claim_name: String::new(),
            supplemental_groups: spec.supplemental_groups.clone(),
        };

        match spec.storage_type {
            StorageType::Empty => {}
            StorageType::Existing => {
                result.claim_name = spec.name.clone();
            }
            StorageType::Create | StorageType::Dynamic => {
                result.claim_name = claim_name.to_string();

                match self.create(claim_name, cluster_name, spec, namespace).await {
                    Ok(()) => {}
                    Err(e) if e.is_already_exists() => {
                        debug!(claim = %claim_name, %namespace, "claim already exists");
                        if let Some(metrics) = &self.metrics {
                            metrics.record_already_existing(namespace);
                        }
                    }
                    Err(e) => {
                        error!(claim = %claim_name, %namespace, "error in pvc create: {}", e);
                        return (result, Err(e));
                    }
                }
            }
        }

        (result, Ok(()))
    }

    /// Resolve the claim name to use for `spec`, creating it if required.
    ///
    /// Unlike [`ensure`](Self::ensure) an existing claim is reported as
    /// [`Error::AlreadyExists`](crate::error::Error::AlreadyExists).
    pub async fn create_claim(
        &self,
        spec: &PgStorageSpec,
        claim_name: &str,
        cluster_name: &str,
        namespace: &str,
    ) -> Result<String> {
        debug!(storage_type = %spec.storage_type, claim = %claim_name, "create claim requested");

        match spec.storage_type {
            StorageType::Empty => Ok(claim_name.to_string()),
            StorageType::Existing => Ok(spec.name.clone()),
            StorageType::Create | StorageType::Dynamic => {
                self.create(claim_name, cluster_name, spec, namespace)
                    .await?;
                Ok(claim_name.to_string())
            }
        }
    }

    /// Build the claim for `spec` and submit it
    pub async fn create(
        &self,
        name: &str,
        cluster_name: &str,
        spec: &PgStorageSpec,
        namespace: &str,
    ) -> Result<()> {
        let claim = self.build_claim(name, cluster_name, spec)?;

        self.client.create_volume_claim(namespace, &claim).await?;

        info!("Created PVC {} in namespace {}", name, namespace);
        if let Some(metrics) = &self.metrics {
            metrics.record_created(namespace);
        }

        Ok(())
    }

    /// Build the claim object for `spec` without submitting it
    pub fn build_claim(
        &self,
        name: &str,
        cluster_name: &str,
        spec: &PgStorageSpec,
    ) -> Result<PersistentVolumeClaim> {
        let dynamic = spec.storage_type == StorageType::Dynamic;

        debug!("matchlabels from spec is [{}]", spec.match_labels);
        let label = MatchLabel::parse(&spec.match_labels).inspect_err(|e| error!("{}", e))?;

        // Dynamic claims bind through their storage class
        let selector = if dynamic {
            None
        } else {
            label.map(|label| LabelSelectorBuilder::from_label(&label))
        };

        let fields = ClaimFields {
            name: name.to_string(),
            access_mode: spec.access_mode.clone(),
            cluster_name: cluster_name.to_string(),
            size: spec.size.clone(),
            storage_class: spec.storage_class.clone(),
            selector,
        };

        Ok(self.renderer.render(&fields, dynamic))
    }
}

impl std::fmt::Debug for VolumeProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeProvisioner")
            .field("renderer", &self.renderer)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryClaimStore;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn spec(storage_type: StorageType) -> PgStorageSpec {
        PgStorageSpec {
            storage_type,
            name: "user-claim".into(),
            access_mode: "ReadWriteOnce".into(),
            size: "1G".into(),
            storage_class: "fast".into(),
            match_labels: String::new(),
            supplemental_groups: vec![65534, 1000],
        }
    }

    fn provisioner() -> (Arc<InMemoryClaimStore>, VolumeProvisioner) {
        let store = Arc::new(InMemoryClaimStore::new());
        let provisioner = VolumeProvisioner::new(store.clone(), ManifestRenderer::default());
        (store, provisioner)
    }

    #[tokio::test]
    async fn test_empty_storage_is_noop() {
        let (store, provisioner) = provisioner();

        let result = provisioner
            .ensure(&spec(StorageType::Empty), "hippo", "hippo", "pgo")
            .await
            .unwrap();

        assert_eq!(result.claim_name, "");
        assert_eq!(result.supplemental_groups, vec![65534, 1000]);
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_existing_storage_uses_spec_name() {
        let (store, provisioner) = provisioner();

        let result = provisioner
            .ensure(&spec(StorageType::Existing), "hippo", "hippo", "pgo")
            .await
            .unwrap();

        assert_eq!(result.claim_name, "user-claim");
        assert_eq!(store.create_calls(), 0);
        assert_eq!(store.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_and_dynamic_issue_one_create() {
        for storage_type in [StorageType::Create, StorageType::Dynamic] {
            let (store, provisioner) = provisioner();

            let result = provisioner
                .ensure(&spec(storage_type), "hippo", "hippo", "pgo")
                .await
                .unwrap();

            assert_eq!(result.claim_name, "hippo");
            assert_eq!(store.create_calls(), 1);
            assert!(store.contains("hippo", "pgo").await);
        }
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let (store, provisioner) = provisioner();
        let metrics = ClaimMetrics::new().unwrap();
        let provisioner = provisioner.with_metrics(metrics.clone());
        let dynamic = spec(StorageType::Dynamic);

        let first = provisioner.ensure(&dynamic, "hippo", "hippo", "pgo").await.unwrap();
        let second = provisioner.ensure(&dynamic, "hippo", "hippo", "pgo").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.create_calls(), 2);
        assert_eq!(metrics.created("pgo"), 1);
        assert_eq!(metrics.already_existing("pgo"), 1);
    }

    #[tokio::test]
    async fn test_malformed_selector_makes_no_api_calls() {
        let (store, provisioner) = provisioner();
        let mut create = spec(StorageType::Create);
        create.match_labels = "onlykey".into();

        let result = provisioner.ensure(&create, "hippo", "hippo", "pgo").await;

        assert_matches!(result, Err(Error::MalformedSelector { .. }));
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_dynamic_rejects_malformed_match_labels() {
        let (store, provisioner) = provisioner();
        let mut dynamic = spec(StorageType::Dynamic);
        dynamic.match_labels = "onlykey".into();

        let result = provisioner.ensure(&dynamic, "hippo", "hippo", "pgo").await;

        assert_matches!(result, Err(Error::MalformedSelector { raw }) if raw == "onlykey");
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_dynamic_claim_has_no_selector() {
        let (store, provisioner) = provisioner();
        let mut dynamic = spec(StorageType::Dynamic);
        dynamic.match_labels = "env=prod".into();

        provisioner.ensure(&dynamic, "hippo", "hippo", "pgo").await.unwrap();

        let claim = store.get("hippo", "pgo").await.unwrap();
        let claim_spec = claim.spec.unwrap();
        assert!(claim_spec.selector.is_none());
        assert_eq!(claim_spec.storage_class_name.as_deref(), Some("fast"));
    }

    #[tokio::test]
    async fn test_static_claim_carries_selector() {
        let (store, provisioner) = provisioner();
        let mut create = spec(StorageType::Create);
        create.match_labels = "env=prod".into();

        provisioner.ensure(&create, "hippo", "hippo", "pgo").await.unwrap();

        let claim = store.get("hippo", "pgo").await.unwrap();
        let labels = claim.spec.unwrap().selector.unwrap().match_labels.unwrap();
        assert_eq!(labels["env"], "prod");
    }

    #[tokio::test]
    async fn test_api_failure_is_returned() {
        let (store, provisioner) = provisioner();
        store.fail_creates_for("hippo").await;

        let (result, outcome) = provisioner
            .attempt(&spec(StorageType::Dynamic), "hippo", "hippo", "pgo")
            .await;

        assert_matches!(outcome, Err(Error::Orchestration(_)));
        assert_eq!(result.claim_name, "hippo");
        assert_eq!(store.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_create_claim_surfaces_already_exists() {
        let (_store, provisioner) = provisioner();
        let create = spec(StorageType::Create);

        let name = provisioner.create_claim(&create, "hippo", "hippo", "pgo").await.unwrap();
        assert_eq!(name, "hippo");

        let again = provisioner.create_claim(&create, "hippo", "hippo", "pgo").await;
        assert_matches!(again, Err(Error::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_create_claim_name_resolution() {
        let (store, provisioner) = provisioner();

        let existing = provisioner
            .create_claim(&spec(StorageType::Existing), "hippo", "hippo", "pgo")
            .await
            .unwrap();
        assert_eq!(existing, "user-claim");

        let empty = provisioner
            .create_claim(&spec(StorageType::Empty), "hippo", "hippo", "pgo")
            .await
            .unwrap();
        assert_eq!(empty, "hippo");
        assert_eq!(store.create_calls(), 0);
    }
}
