//! Label Selector Construction
//!
//! Turns the single `key=value` match label of a storage specification into
//! the selector a static claim uses to bind to pre-existing storage.

use crate::error::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::BTreeMap;

/// A validated `key=value` match label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLabel {
    pub key: String,
    pub value: String,
}

impl MatchLabel {
    /// Parse the raw form from a storage specification.
    ///
    /// An empty string means no label was requested and yields `Ok(None)`.
    /// Anything else must split on `=` into exactly two non-empty tokens.
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        if raw.is_empty() {
            return Ok(None);
        }

        let mut tokens = raw.split('=');
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(key), Some(value), None) if !key.is_empty() && !value.is_empty() => {
                Ok(Some(Self {
                    key: key.to_string(),
                    value: value.to_string(),
                }))
            }
            _ => Err(Error::MalformedSelector {
                raw: raw.to_string(),
            }),
        }
    }
}

/// Builds label selectors for static claims
pub struct LabelSelectorBuilder;

impl LabelSelectorBuilder {
    /// Selector matching volumes labelled `key=value`
    pub fn build(key: &str, value: &str) -> LabelSelector {
        LabelSelector {
            match_labels: Some(BTreeMap::from([(key.to_string(), value.to_string())])),
            match_expressions: None,
        }
    }

    /// Selector for a parsed match label
    pub fn from_label(label: &MatchLabel) -> LabelSelector {
        Self::build(&label.key, &label.value)
    }
}
