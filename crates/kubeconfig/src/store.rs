use std::path::Path;

use kube::config::Kubeconfig;
use tracing::debug;

use crate::CredentialError;

/// Remove `context` and its same-named cluster and user entries from the
/// kubeconfig at `path`, clearing `current-context` if it pointed there.
///
/// Returns `Ok(false)` without touching the file when it does not exist or has
/// no such context.
pub fn remove_context(path: &Path, context: &str) -> Result<bool, CredentialError> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "kubeconfig absent, nothing to remove");
            return Ok(false);
        }
        Err(source) => return Err(CredentialError::Read { path: path.to_path_buf(), source }),
    };
    let mut cfg = Kubeconfig::from_yaml(&text).map_err(|e| CredentialError::Parse(e.to_string()))?;

    if !cfg.contexts.iter().any(|c| c.name == context) {
        debug!(path = %path.display(), context, "context not present");
        return Ok(false);
    }
    cfg.contexts.retain(|c| c.name != context);
    cfg.clusters.retain(|c| c.name != context);
    cfg.auth_infos.retain(|a| a.name != context);
    if cfg.current_context.as_deref() == Some(context) {
        cfg.current_context = None;
    }

    let out = serde_yaml::to_string(&cfg)?;
    std::fs::write(path, out).map_err(|source| CredentialError::Write { path: path.to_path_buf(), source })?;
    debug!(path = %path.display(), context, "context removed");
    Ok(true)
}
