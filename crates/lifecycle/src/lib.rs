//! Kindling lifecycle: create, read and delete one kind cluster.
//!
//! The controller is a thin state machine over a [`Provisioner`]:
//! `absent -> creating -> ready -> (read) -> deleting -> absent`. There is no
//! update transition; a changed cluster is deleted and created again.

#![forbid(unsafe_code)]

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use kindling_config::ResourceConfig;
use kindling_kubeconfig::{connection_from_kubeconfig, context_name, remove_context};
use kindling_provision::{CreateOptions, Provisioner};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

mod config;
mod error;
mod state;

pub use config::{LifecycleConfig, DEFAULT_NODE_IMAGE};
pub use error::LifecycleError;
pub use state::ClusterState;

/// Result of a successful delete. Cleanup problems land in `warnings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub warnings: Vec<String>,
}

/// Log a failed best-effort step and hand back its message.
pub fn warn_on_err<T, E: Display>(what: &str, result: Result<T, E>) -> Result<T, String> {
    result.map_err(|e| {
        warn!(error = %e, "{} failed", what);
        format!("{}: {}", what, e)
    })
}

pub struct LifecycleController {
    provisioner: Arc<dyn Provisioner>,
    config: LifecycleConfig,
}

impl LifecycleController {
    pub fn new(provisioner: Arc<dyn Provisioner>, config: LifecycleConfig) -> Self {
        Self { provisioner, config }
    }

    pub fn config(&self) -> &LifecycleConfig { &self.config }

    pub fn provisioner(&self) -> &Arc<dyn Provisioner> { &self.provisioner }

    /// Provision the cluster, retrying failed attempts, then read back its
    /// connection details.
    pub async fn create(&self, res: &ResourceConfig) -> Result<ClusterState, LifecycleError> {
        let t0 = Instant::now();
        let node_image = res.node_image.clone().unwrap_or_else(|| self.config.default_node_image.clone());
        let opts = CreateOptions {
            name: res.name.clone(),
            node_image: node_image.clone(),
            kubeconfig_path: res.kubeconfig_path.as_ref().map(PathBuf::from),
            wait: res.wait_for_ready.then_some(self.config.wait_timeout),
            config: res.kind_config.clone(),
        };
        if let Some(spec) = &opts.config {
            for e in spec.containerd_patch_errors() {
                warn!(cluster = %res.name, error = %e, "containerd config patch is not valid TOML; passing it through unchanged");
            }
        }

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            counter!("kindling_create_attempts", 1u64);
            match self.provisioner.create(&opts).await {
                Ok(()) => break,
                Err(source) if attempts > self.config.max_retries => {
                    counter!("kindling_create_err", 1u64);
                    return Err(LifecycleError::Create { name: res.name.clone(), attempts, source });
                }
                Err(e) => {
                    warn!(cluster = %res.name, attempt = attempts, error = %e, "create failed, retrying");
                    warn_on_err("delete of partial cluster", self.provisioner.delete(&res.name, None).await).ok();
                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }
        counter!("kindling_create_ok", 1u64);
        histogram!("kindling_create_ms", t0.elapsed().as_secs_f64() * 1000.0);
        info!(cluster = %res.name, node_image = %node_image, attempts, "cluster created");

        let mut state = ClusterState {
            id: ClusterState::identity(&res.name, &node_image),
            name: res.name.clone(),
            node_image,
            wait_for_ready: res.wait_for_ready,
            kubeconfig_path: opts.kubeconfig_path,
            ..Default::default()
        };
        self.read(&mut state).await?;
        Ok(state)
    }

    /// Refresh connection details; exports a kubeconfig next to the working
    /// directory when no path has been recorded yet.
    pub async fn read(&self, state: &mut ClusterState) -> Result<(), LifecycleError> {
        let name = state.name.clone();
        let kubeconfig = self
            .provisioner
            .kubeconfig(&name, false)
            .await
            .map_err(|source| LifecycleError::Kubeconfig { name: name.clone(), source })?;

        if state.kubeconfig_path.is_none() {
            let dir = match &self.config.export_dir {
                Some(d) => d.clone(),
                None => std::env::current_dir().map_err(LifecycleError::CurrentDir)?,
            };
            let path = dir.join(format!("{}-config", name));
            self.provisioner
                .export_kubeconfig(&name, &path)
                .await
                .map_err(|source| LifecycleError::Export { name: name.clone(), path: path.clone(), source })?;
            info!(cluster = %name, path = %path.display(), "kubeconfig exported");
            state.kubeconfig_path = Some(path);
        }

        let conn = connection_from_kubeconfig(&kubeconfig).map_err(|source| LifecycleError::Connection { name: name.clone(), source })?;
        state.kubeconfig = kubeconfig;
        state.client_certificate = conn.client_certificate;
        state.client_key = conn.client_key;
        state.cluster_ca_certificate = conn.cluster_ca_certificate;
        state.endpoint = conn.endpoint;
        state.completed = true;
        Ok(())
    }

    /// Delete the cluster, giving up after `delete_timeout`, then drop its
    /// context from the default and the recorded kubeconfig.
    pub async fn delete(&self, state: &ClusterState) -> Result<DeleteOutcome, LifecycleError> {
        let t0 = Instant::now();
        let provisioner = Arc::clone(&self.provisioner);
        let name = state.name.clone();
        let path = state.kubeconfig_path.clone();
        let mut task = tokio::spawn(async move { provisioner.delete(&name, path.as_deref()).await });

        let joined = tokio::select! {
            res = &mut task => res,
            _ = tokio::time::sleep(self.config.delete_timeout) => {
                task.abort();
                counter!("kindling_delete_timeout", 1u64);
                warn!(cluster = %state.name, timeout_secs = self.config.delete_timeout.as_secs(), "delete timed out");
                return Err(LifecycleError::DeleteTimeout { name: state.name.clone(), timeout: self.config.delete_timeout });
            }
        };
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(source)) => return Err(LifecycleError::Delete { name: state.name.clone(), source }),
            Err(e) => return Err(LifecycleError::DeleteTask { name: state.name.clone(), message: e.to_string() }),
        }
        histogram!("kindling_delete_ms", t0.elapsed().as_secs_f64() * 1000.0);
        info!(cluster = %state.name, "cluster deleted");

        let ctx = context_name(&state.name);
        let mut outcome = DeleteOutcome::default();
        if let Some(p) = &self.config.default_kubeconfig {
            let what = format!("removing {} from {}", ctx, p.display());
            if let Err(w) = warn_on_err(&what, remove_context(p, &ctx)) {
                outcome.warnings.push(w);
            }
        }
        if let Some(p) = state.kubeconfig_path.as_ref().filter(|p| Some(*p) != self.config.default_kubeconfig.as_ref()) {
            let what = format!("removing {} from {}", ctx, p.display());
            if let Err(w) = warn_on_err(&what, remove_context(p, &ctx)) {
                outcome.warnings.push(w);
            }
        }
        Ok(outcome)
    }

    /// Every attribute forces replacement.
    pub fn update(&self, _state: &ClusterState, _res: &ResourceConfig) -> Result<ClusterState, LifecycleError> {
        Err(LifecycleError::UpdateNotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warn_on_err_passes_values_through() {
        assert_eq!(warn_on_err::<_, String>("x", Ok(3)), Ok(3));
        assert_eq!(warn_on_err::<(), _>("cleanup", Err("boom")), Err("cleanup: boom".to_string()));
    }

    #[test]
    fn summaries_distinguish_timeout_from_failure() {
        let t = LifecycleError::DeleteTimeout { name: "dev".into(), timeout: std::time::Duration::from_secs(1) };
        assert_eq!(t.summary(), "Timeout deleting Kind cluster");
        assert!(t.is_timeout());
        assert!(t.to_string().contains("dev"));
        assert_eq!(LifecycleError::UpdateNotSupported.summary(), "Update not supported");
    }
}
