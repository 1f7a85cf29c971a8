use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_NODE_IMAGE: &str =
    "kindest/node:v1.34.0@sha256:7416a61b42b1662ca6ca89f02028ac133a309a2a30ba309614e8ec94d976dc5a";

/// Knobs for [`crate::LifecycleController`].
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Retries after the first failed create; total attempts is one more.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub delete_timeout: Duration,
    /// How long `create` waits for the control plane when `wait_for_ready` is set.
    pub wait_timeout: Duration,
    pub default_node_image: String,
    /// Shared credential store cleaned on delete; `None` skips it.
    pub default_kubeconfig: Option<PathBuf>,
    /// Where `read` exports kubeconfigs when none was recorded; `None` means the
    /// current directory.
    pub export_dir: Option<PathBuf>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_secs(5),
            delete_timeout: Duration::from_secs(5 * 60),
            wait_timeout: Duration::from_secs(5 * 60),
            default_node_image: DEFAULT_NODE_IMAGE.to_string(),
            default_kubeconfig: kindling_kubeconfig::default_kubeconfig_path(),
            export_dir: None,
        }
    }
}

impl LifecycleConfig {
    /// Defaults overridden by `KINDLING_*` environment variables; unparsable
    /// values are ignored.
    pub fn from_env() -> Self { Self::from_lookup(|key| std::env::var(key).ok()) }

    /// Same as [`Self::from_env`] with variables resolved through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());
        let string = |key: &str| lookup(key).filter(|s| !s.is_empty());
        let d = Self::default();
        Self {
            max_retries: lookup("KINDLING_CREATE_RETRIES").and_then(|s| s.trim().parse().ok()).unwrap_or(d.max_retries),
            retry_delay: parse("KINDLING_RETRY_DELAY_SECS").map(Duration::from_secs).unwrap_or(d.retry_delay),
            delete_timeout: parse("KINDLING_DELETE_TIMEOUT_SECS").map(Duration::from_secs).unwrap_or(d.delete_timeout),
            wait_timeout: parse("KINDLING_WAIT_TIMEOUT_SECS").map(Duration::from_secs).unwrap_or(d.wait_timeout),
            default_node_image: string("KINDLING_NODE_IMAGE").unwrap_or(d.default_node_image),
            default_kubeconfig: d.default_kubeconfig,
            export_dir: string("KINDLING_EXPORT_DIR").map(PathBuf::from).or(d.export_dir),
        }
    }
}
