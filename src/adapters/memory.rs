//! In-memory volume claim store
//!
//! Implements [`VolumeClaimClient`] without a cluster connection. Used in
//! standalone mode and as the API server stand-in for tests: every call is
//! counted and failures can be injected per claim name.

use crate::domain::ports::VolumeClaimClient;
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::core::ErrorResponse;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Claims keyed by (namespace, name)
#[derive(Default)]
pub struct InMemoryClaimStore {
    claims: RwLock<BTreeMap<(String, String), PersistentVolumeClaim>>,
    /// Names in the order they were created
    created: RwLock<Vec<String>>,
    failing_creates: RwLock<BTreeSet<String>>,
    failing_lookups: RwLock<BTreeSet<String>>,
    create_calls: AtomicUsize,
    get_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a claim without counting a create call
    pub async fn insert(&self, namespace: &str, mut claim: PersistentVolumeClaim) {
        let name = claim.metadata.name.clone().unwrap_or_default();
        claim.metadata.namespace = Some(namespace.to_string());
        self.claims
            .write()
            .await
            .insert((namespace.to_string(), name), claim);
    }

    /// Make every create of `name` fail with a server error
    pub async fn fail_creates_for(&self, name: &str) {
        self.failing_creates.write().await.insert(name.to_string());
    }

    /// Make every lookup of `name` fail with a server error
    pub async fn fail_lookups_for(&self, name: &str) {
        self.failing_lookups.write().await.insert(name.to_string());
    }

    pub async fn get(&self, name: &str, namespace: &str) -> Option<PersistentVolumeClaim> {
        self.claims
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub async fn contains(&self, name: &str, namespace: &str) -> bool {
        self.get(name, namespace).await.is_some()
    }

    pub async fn len(&self) -> usize {
        self.claims.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.claims.read().await.is_empty()
    }

    /// Names of successfully created claims, in creation order
    pub async fn created_names(&self) -> Vec<String> {
        self.created.read().await.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Relaxed)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::Relaxed)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::Relaxed)
    }
}

fn server_error(message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: "InternalError".to_string(),
        code: 500,
    })
}

#[async_trait]
impl VolumeClaimClient for InMemoryClaimStore {
    async fn create_volume_claim(
        &self,
        namespace: &str,
        claim: &PersistentVolumeClaim,
    ) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);
        let name = claim.metadata.name.clone().unwrap_or_default();

        if self.failing_creates.read().await.contains(&name) {
            return Err(Error::Orchestration(server_error(format!(
                "injected create failure for {}",
                name
            ))));
        }

        let key = (namespace.to_string(), name.clone());
        let mut claims = self.claims.write().await;
        if claims.contains_key(&key) {
            return Err(Error::AlreadyExists {
                kind: "PersistentVolumeClaim".to_string(),
                name,
            });
        }

        let mut stored = claim.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        stored.metadata.creation_timestamp = Some(Time(chrono::Utc::now()));
        claims.insert(key, stored);
        self.created.write().await.push(name.clone());

        debug!("Stored claim {}/{}", namespace, name);
        Ok(())
    }

    async fn get_volume_claim_if_exists(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<PersistentVolumeClaim>> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);

        if self.failing_lookups.read().await.contains(name) {
            return Err(Error::Lookup {
                name: name.to_string(),
                source: server_error(format!("injected lookup failure for {}", name)),
            });
        }

        Ok(self.get(name, namespace).await)
    }

    async fn delete_volume_claim(&self, name: &str, namespace: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::Relaxed);

        self.claims
            .write()
            .await
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| {
                Error::Orchestration(kube::Error::Api(ErrorResponse {
                    status: "Failure".to_string(),
                    message: format!("persistentvolumeclaims \"{}\" not found", name),
                    reason: "NotFound".to_string(),
                    code: 404,
                }))
            })
    }
}
