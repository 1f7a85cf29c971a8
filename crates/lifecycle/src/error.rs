use std::path::PathBuf;
use std::time::Duration;

use kindling_kubeconfig::CredentialError;
use kindling_provision::ProvisionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to create cluster {name} after {attempts} attempts: {source}")]
    Create { name: String, attempts: u32, source: ProvisionError },

    #[error("could not get kubeconfig for cluster {name}: {source}")]
    Kubeconfig { name: String, source: ProvisionError },

    #[error("could not export kubeconfig for cluster {name} to {}: {source}", path.display())]
    Export { name: String, path: PathBuf, source: ProvisionError },

    #[error("could not determine the export directory: {0}")]
    CurrentDir(std::io::Error),

    #[error("could not parse kubeconfig for cluster {name}: {source}")]
    Connection { name: String, source: CredentialError },

    #[error("failed to delete cluster {name}: {source}")]
    Delete { name: String, source: ProvisionError },

    #[error("timed out after {timeout:?} deleting cluster {name}")]
    DeleteTimeout { name: String, timeout: Duration },

    #[error("delete task for cluster {name} did not complete: {message}")]
    DeleteTask { name: String, message: String },

    #[error("cluster attributes cannot change in place; the cluster must be replaced")]
    UpdateNotSupported,
}

impl LifecycleError {
    /// Short headline shown above the detail message.
    pub fn summary(&self) -> &'static str {
        match self {
            LifecycleError::Create { .. } => "Error creating Kind cluster",
            LifecycleError::Kubeconfig { .. } | LifecycleError::Connection { .. } | LifecycleError::CurrentDir(_) => "Error reading Kind cluster",
            LifecycleError::Export { .. } => "Error exporting kubeconfig",
            LifecycleError::Delete { .. } | LifecycleError::DeleteTask { .. } => "Error deleting Kind cluster",
            LifecycleError::DeleteTimeout { .. } => "Timeout deleting Kind cluster",
            LifecycleError::UpdateNotSupported => "Update not supported",
        }
    }

    pub fn is_timeout(&self) -> bool { matches!(self, LifecycleError::DeleteTimeout { .. }) }
}
