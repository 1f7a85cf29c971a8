//! Kindling kubeconfig: the on-disk credential store.
//!
//! Two concerns live here: reading connection coordinates out of a kubeconfig
//! document handed back by the provisioning engine, and removing a cluster's
//! `kind-<name>` context/user/cluster entries from a kubeconfig file.

#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

mod connection;
mod store;

pub use connection::{connection_from_kubeconfig, ConnectionInfo};
pub use store::remove_context;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },

    #[error("failed to parse kubeconfig: {0}")]
    Parse(String),

    #[error("failed to serialize kubeconfig: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("kubeconfig has no {kind} named {name:?}")]
    MissingEntry { kind: &'static str, name: String },

    #[error("invalid base64 in {field}: {source}")]
    Base64 { field: &'static str, source: base64::DecodeError },
}

/// Context name the provisioning engine registers for a cluster.
pub fn context_name(cluster: &str) -> String { format!("kind-{}", cluster) }

/// `$HOME/.kube/config`, or `None` when no home directory is known.
pub fn default_kubeconfig_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".kube").join("config"))
}
