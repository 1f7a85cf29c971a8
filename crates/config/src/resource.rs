//! Top-level resource attributes: `name`, `node_image`, `wait_for_ready`,
//! `kubeconfig_path` and the optional `kind_config` block.

use kindling_core::{decode_object, AttrValue, Map};
use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;
use crate::extract::{get_block, get_bool, get_opt_string, get_string};
use crate::normalize::normalize;
use crate::spec::ClusterSpec;

pub const DEFAULT_API_VERSION: &str = "kind.x-k8s.io/v1alpha4";
pub const DEFAULT_KIND: &str = "Cluster";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    #[serde(default)]
    pub node_image: Option<String>,
    #[serde(default)]
    pub wait_for_ready: bool,
    #[serde(default)]
    pub kubeconfig_path: Option<String>,
    #[serde(default)]
    pub kind_config: Option<ClusterSpec>,
}

impl ResourceConfig {
    /// Decode and normalize a host attribute object.
    pub fn from_attributes(attrs: &AttrValue) -> Result<Self, NormalizeError> {
        let m = decode_object(attrs).ok_or(NormalizeError::MissingAttribute("name"))?;
        Self::from_map(&m)
    }

    pub fn from_map(m: &Map) -> Result<Self, NormalizeError> {
        let name = get_string(m, "name");
        if name.is_empty() {
            return Err(NormalizeError::MissingAttribute("name"));
        }
        let kind_config = match get_block(m, "kind_config") {
            Some(block) => {
                if get_string(block, "kind").is_empty() {
                    return Err(NormalizeError::MissingAttribute("kind_config.kind"));
                }
                let mut spec = normalize(block)?;
                if spec.api_version.is_empty() {
                    spec.api_version = DEFAULT_API_VERSION.to_string();
                }
                Some(spec)
            }
            None => None,
        };
        Ok(ResourceConfig {
            name,
            node_image: get_opt_string(m, "node_image"),
            wait_for_ready: get_bool(m, "wait_for_ready"),
            kubeconfig_path: get_opt_string(m, "kubeconfig_path"),
            kind_config,
        })
    }
}
