//! Volume Provisioning
//!
//! Turns the storage specifications of a cluster into volume claims:
//! - [`selector`]: `key=value` match labels to label selectors
//! - [`manifest`]: claim objects for the static and dynamic variants
//! - [`provisioner`]: create-if-needed for one logical volume
//! - [`cluster`]: data, WAL and tablespace volumes of one cluster
//! - [`gate`]: existence checks and label-gated deletion

pub mod cluster;
pub mod gate;
pub mod manifest;
pub mod naming;
pub mod provisioner;
pub mod selector;

pub use cluster::*;
pub use gate::*;
pub use manifest::*;
pub use naming::*;
pub use provisioner::*;
pub use selector::*;
