//! Claim Metrics
//!
//! Prometheus counters for volume claim operations, held in an owned
//! registry so independent provisioners never share counters.

use crate::error::Result;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters for claim create and delete operations, labelled by namespace
#[derive(Clone)]
pub struct ClaimMetrics {
    registry: Registry,
    created: IntCounterVec,
    already_existing: IntCounterVec,
    deleted: IntCounterVec,
}

impl ClaimMetrics {
    /// Create and register all counters
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let created = IntCounterVec::new(
            Opts::new(
                "pgvolume_claims_created_total",
                "Volume claims created by the operator",
            ),
            &["namespace"],
        )?;
        let already_existing = IntCounterVec::new(
            Opts::new(
                "pgvolume_claims_already_existing_total",
                "Create requests answered with already exists",
            ),
            &["namespace"],
        )?;
        let deleted = IntCounterVec::new(
            Opts::new(
                "pgvolume_claims_deleted_total",
                "Volume claims deleted through the removal gate",
            ),
            &["namespace"],
        )?;

        registry.register(Box::new(created.clone()))?;
        registry.register(Box::new(already_existing.clone()))?;
        registry.register(Box::new(deleted.clone()))?;

        Ok(Self {
            registry,
            created,
            already_existing,
            deleted,
        })
    }

    pub fn record_created(&self, namespace: &str) {
        self.created.with_label_values(&[namespace]).inc();
    }

    pub fn record_already_existing(&self, namespace: &str) {
        self.already_existing.with_label_values(&[namespace]).inc();
    }

    pub fn record_deleted(&self, namespace: &str) {
        self.deleted.with_label_values(&[namespace]).inc();
    }

    pub fn created(&self, namespace: &str) -> u64 {
        self.created.with_label_values(&[namespace]).get()
    }

    pub fn already_existing(&self, namespace: &str) -> u64 {
        self.already_existing.with_label_values(&[namespace]).get()
    }

    pub fn deleted(&self, namespace: &str) -> u64 {
        self.deleted.with_label_values(&[namespace]).get()
    }

    /// Render all counters in the text exposition format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| crate::error::Error::Internal(format!("Metrics not UTF-8: {}", e)))
    }
}

impl std::fmt::Debug for ClaimMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_per_instance() {
        let a = ClaimMetrics::new().unwrap();
        let b = ClaimMetrics::new().unwrap();

        a.record_created("pgo");
        a.record_created("pgo");
        a.record_already_existing("pgo");

        assert_eq!(a.created("pgo"), 2);
        assert_eq!(a.already_existing("pgo"), 1);
        assert_eq!(b.created("pgo"), 0);
    }

    #[test]
    fn test_render_exposition() {
        let metrics = ClaimMetrics::new().unwrap();
        metrics.record_deleted("pgo");

        let text = metrics.render().unwrap();
        assert!(text.contains("pgvolume_claims_deleted_total{namespace=\"pgo\"} 1"));
    }
}
