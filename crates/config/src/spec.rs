//! Typed kind cluster spec (`kind.x-k8s.io/v1alpha4`).
//!
//! Serializes to the document the provisioning engine consumes: camelCase
//! keys, zero values omitted. Enum fields are `Option`s; `None` is the zero
//! value an unrecognized string leaves behind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canonical::{normalize_toml, TomlNormalizeError};

/// Defines a closed string enum with exact, case-sensitive parsing.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self { $($name::$variant => $text),+ }
            }

            /// Exact match against the allow-list; anything else is `None`.
            pub fn parse(s: &str) -> Option<Self> {
                match s { $($text => Some($name::$variant),)+ _ => None }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Role a node plays in the cluster.
    NodeRole { ControlPlane => "control-plane", Worker => "worker" }
);

string_enum!(
    /// Mount propagation mode for an extra mount.
    MountPropagation { None => "None", HostToContainer => "HostToContainer", Bidirectional => "Bidirectional" }
);

string_enum!(
    PortProtocol { Tcp => "TCP", Udp => "UDP", Sctp => "SCTP" }
);

string_enum!(
    ProxyMode { Iptables => "iptables", Ipvs => "ipvs", None => "none" }
);

string_enum!(
    IpFamily { Ipv4 => "ipv4", Ipv6 => "ipv6", Dual => "dual" }
);

fn is_zero(v: &i32) -> bool { *v == 0 }
fn is_false(v: &bool) -> bool { !*v }

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networking: Option<Networking>,
    /// Raw TOML patches, passed through untouched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containerd_config_patches: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub runtime_config: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_gates: BTreeMap<String, bool>,
}

impl ClusterSpec {
    /// Render the document handed to the provisioning engine.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Check every containerd patch parses as TOML. The patches themselves are
    /// never rewritten; callers surface the returned errors as warnings.
    pub fn containerd_patch_errors(&self) -> Vec<TomlNormalizeError> {
        self.containerd_config_patches
            .iter()
            .filter_map(|p| normalize_toml(&kindling_core::Value::String(p.clone())).err())
            .collect()
    }

    pub fn control_plane_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.role == Some(NodeRole::ControlPlane)).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<NodeRole>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_mounts: Vec<Mount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_port_mappings: Vec<PortMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kubeadm_config_patches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host_path: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub selinux_relabel: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagation: Option<MountPropagation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub container_port: i32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub host_port: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub listen_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<PortProtocol>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_family: Option<IpFamily>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub api_server_port: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_server_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pod_subnet: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_subnet: String,
    #[serde(default, rename = "disableDefaultCNI", skip_serializing_if = "is_false")]
    pub disable_default_cni: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_proxy_mode: Option<ProxyMode>,
    /// `Some(vec![])` is an explicit empty search list, distinct from `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_search: Option<Vec<String>>,
}
