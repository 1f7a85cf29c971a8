use base64::{engine::general_purpose::STANDARD, Engine};
use kube::config::Kubeconfig;
use secrecy::ExposeSecret;

use crate::CredentialError;

/// What a client needs to reach the cluster. Certificate fields hold decoded
/// PEM text.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub endpoint: String,
    pub client_certificate: String,
    pub client_key: String,
    pub cluster_ca_certificate: String,
}

impl std::fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("endpoint", &self.endpoint)
            .field("client_certificate", &"<redacted>")
            .field("client_key", &"<redacted>")
            .field("cluster_ca_certificate", &"<redacted>")
            .finish()
    }
}

fn missing(kind: &'static str, name: &str) -> CredentialError {
    CredentialError::MissingEntry { kind, name: name.to_string() }
}

fn decode(field: &'static str, data: Option<&str>) -> Result<String, CredentialError> {
    let bytes = STANDARD.decode(data.unwrap_or("").trim()).map_err(|source| CredentialError::Base64 { field, source })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Resolve the current context of `kubeconfig` to its endpoint and credentials.
pub fn connection_from_kubeconfig(kubeconfig: &str) -> Result<ConnectionInfo, CredentialError> {
    let cfg = Kubeconfig::from_yaml(kubeconfig).map_err(|e| CredentialError::Parse(e.to_string()))?;
    let current = cfg.current_context.as_deref().unwrap_or("");
    let ctx = cfg
        .contexts
        .iter()
        .find(|c| c.name == current)
        .and_then(|c| c.context.as_ref())
        .ok_or_else(|| missing("context", current))?;
    let cluster = cfg
        .clusters
        .iter()
        .find(|c| c.name == ctx.cluster)
        .and_then(|c| c.cluster.as_ref())
        .ok_or_else(|| missing("cluster", &ctx.cluster))?;
    let user = cfg
        .auth_infos
        .iter()
        .find(|a| a.name == ctx.user)
        .and_then(|a| a.auth_info.as_ref())
        .ok_or_else(|| missing("user", &ctx.user))?;
    let key = user.client_key_data.as_ref().map(|k| k.expose_secret().as_str());
    Ok(ConnectionInfo {
        endpoint: cluster.server.clone().unwrap_or_default(),
        client_certificate: decode("client-certificate-data", user.client_certificate_data.as_deref())?,
        client_key: decode("client-key-data", key)?,
        cluster_ca_certificate: decode("certificate-authority-data", cluster.certificate_authority_data.as_deref())?,
    })
}
