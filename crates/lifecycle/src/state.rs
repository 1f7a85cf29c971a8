use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Persisted record of one managed cluster.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterState {
    pub id: String,
    pub name: String,
    /// Image actually used, user supplied or the default.
    pub node_image: String,
    #[serde(default)]
    pub wait_for_ready: bool,
    #[serde(default)]
    pub kubeconfig_path: Option<PathBuf>,
    #[serde(default)]
    pub kubeconfig: String,
    #[serde(default)]
    pub client_certificate: String,
    #[serde(default)]
    pub client_key: String,
    #[serde(default)]
    pub cluster_ca_certificate: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub completed: bool,
}

impl ClusterState {
    pub fn identity(name: &str, node_image: &str) -> String { format!("{}-{}", name, node_image) }
}

impl std::fmt::Debug for ClusterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(s: &str) -> &'static str { if s.is_empty() { "" } else { "<redacted>" } }
        f.debug_struct("ClusterState")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("node_image", &self.node_image)
            .field("wait_for_ready", &self.wait_for_ready)
            .field("kubeconfig_path", &self.kubeconfig_path)
            .field("kubeconfig", &redact(&self.kubeconfig))
            .field("client_certificate", &redact(&self.client_certificate))
            .field("client_key", &redact(&self.client_key))
            .field("cluster_ca_certificate", &redact(&self.cluster_ca_certificate))
            .field("endpoint", &self.endpoint)
            .field("completed", &self.completed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_joins_name_and_image() {
        assert_eq!(ClusterState::identity("dev", "kindest/node:v1"), "dev-kindest/node:v1");
    }

    #[test]
    fn debug_redacts_secrets() {
        let s = ClusterState { name: "dev".into(), client_key: "SECRET KEY".into(), kubeconfig: "apiVersion: v1".into(), ..Default::default() };
        let dbg = format!("{:?}", s);
        assert!(dbg.contains("dev"));
        assert!(!dbg.contains("SECRET KEY"), "dbg={}", dbg);
        assert!(!dbg.contains("apiVersion"), "dbg={}", dbg);
    }
}
