//! Claim Manifest Construction
//!
//! Builds `PersistentVolumeClaim` objects directly from storage fields.
//! Two variants exist:
//! - dynamic: provisioned through a storage class
//! - static: optionally bound to pre-existing storage through a label selector
//!
//! Every built claim is handed to an injected [`ManifestSink`] so callers can
//! inspect what is about to be submitted.

use k8s_openapi::api::core::v1::{
    PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, warn};

/// Label carrying the vendor of every claim the operator creates
pub const LABEL_VENDOR: &str = "vendor";
/// Vendor label value
pub const VENDOR: &str = "crunchydata";
/// Label carrying the owning cluster's name
pub const LABEL_PG_CLUSTER: &str = "pg-cluster";

// =============================================================================
// Claim Fields
// =============================================================================

/// Flattened inputs of one claim manifest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimFields {
    pub name: String,
    pub access_mode: String,
    pub cluster_name: String,
    pub size: String,
    pub storage_class: String,
    /// Selector for static claims, ignored for dynamic ones
    pub selector: Option<LabelSelector>,
}

// =============================================================================
// Diagnostic Sinks
// =============================================================================

/// Receives every claim the renderer builds
pub trait ManifestSink: Send + Sync {
    fn emit(&self, claim: &PersistentVolumeClaim);
}

/// Discards manifests
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ManifestSink for NoopSink {
    fn emit(&self, _claim: &PersistentVolumeClaim) {}
}

/// Logs manifests as YAML at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ManifestSink for TracingSink {
    fn emit(&self, claim: &PersistentVolumeClaim) {
        match serde_yaml::to_string(claim) {
            Ok(yaml) => debug!(claim = ?claim.metadata.name, "rendered claim manifest:\n{}", yaml),
            Err(e) => warn!("Failed to serialize claim manifest: {}", e),
        }
    }
}

/// Writes manifests as YAML documents to a writer
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> ManifestSink for WriterSink<W> {
    fn emit(&self, claim: &PersistentVolumeClaim) {
        let yaml = match serde_yaml::to_string(claim) {
            Ok(yaml) => yaml,
            Err(e) => {
                warn!("Failed to serialize claim manifest: {}", e);
                return;
            }
        };

        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "---\n{}", yaml.trim_end()) {
            warn!("Failed to echo claim manifest: {}", e);
        }
    }
}

// =============================================================================
// Manifest Renderer
// =============================================================================

/// Builds claim objects from [`ClaimFields`]
#[derive(Clone)]
pub struct ManifestRenderer {
    sink: Arc<dyn ManifestSink>,
}

impl Default for ManifestRenderer {
    fn default() -> Self {
        Self::new(Arc::new(NoopSink))
    }
}

impl ManifestRenderer {
    pub fn new(sink: Arc<dyn ManifestSink>) -> Self {
        Self { sink }
    }

    /// Build the claim. `dynamic` selects the storage-class variant, otherwise
    /// the static variant is built with the selector embedded if present.
    pub fn render(&self, fields: &ClaimFields, dynamic: bool) -> PersistentVolumeClaim {
        let mut spec = PersistentVolumeClaimSpec {
            access_modes: non_empty(&fields.access_mode).map(|mode| vec![mode]),
            resources: non_empty(&fields.size).map(|size| VolumeResourceRequirements {
                requests: Some(BTreeMap::from([("storage".to_string(), Quantity(size))])),
                ..Default::default()
            }),
            ..Default::default()
        };

        if dynamic {
            spec.storage_class_name = non_empty(&fields.storage_class);
        } else {
            spec.selector = fields.selector.clone();
        }

        let claim = PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(fields.name.clone()),
                labels: Some(BTreeMap::from([
                    (LABEL_VENDOR.to_string(), VENDOR.to_string()),
                    (LABEL_PG_CLUSTER.to_string(), fields.cluster_name.clone()),
                ])),
                ..Default::default()
            },
            spec: Some(spec),
            ..Default::default()
        };

        self.sink.emit(&claim);
        claim
    }
}

impl std::fmt::Debug for ManifestRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestRenderer").finish_non_exhaustive()
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
