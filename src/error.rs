//! Error types for the PostgreSQL volume operator
//!
//! Provides structured error types for volume claim provisioning, the
//! deletion gate, and the backup-tool dispatcher.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the operator
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Storage Specification Errors
    // =========================================================================
    #[error("Match labels {raw:?} are not formatted correctly, expected key=value")]
    MalformedSelector { raw: String },

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Resource already exists: {kind}/{name}")]
    AlreadyExists { kind: String, name: String },

    #[error("Kubernetes API error: {0}")]
    Orchestration(#[from] kube::Error),

    #[error("Lookup of {name} failed: {source}")]
    Lookup {
        name: String,
        #[source]
        source: kube::Error,
    },

    // =========================================================================
    // Backup Tool Errors
    // =========================================================================
    #[error("Unsupported backup command specified: {0}")]
    UnsupportedBackupCommand(String),

    #[error("Exec in pod failed: {0}")]
    Exec(String),

    // =========================================================================
    // Metrics Errors
    // =========================================================================
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Action to take on error during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Requeue with exponential backoff
    RequeueWithBackoff,
    /// Requeue after specific duration
    RequeueAfter(Duration),
    /// Don't requeue, wait for changes
    NoRequeue,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            // Transient errors - retry with backoff
            Error::Orchestration(_) | Error::Lookup { .. } => ErrorAction::RequeueWithBackoff,

            // The target pod may still be starting
            Error::Exec(_) => ErrorAction::RequeueAfter(Duration::from_secs(30)),

            // Nothing to do until the resource changes
            Error::AlreadyExists { .. }
            | Error::MalformedSelector { .. }
            | Error::Configuration(_)
            | Error::UnsupportedBackupCommand(_)
            | Error::JsonParse(_)
            | Error::YamlParse(_) => ErrorAction::NoRequeue,

            // All other errors - retry with backoff
            _ => ErrorAction::RequeueWithBackoff,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::NoRequeue)
    }

    /// Check if this is the API's "already exists" classification
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }
}

/// Result type alias for the operator
pub type Result<T> = std::result::Result<T, Error>;
