use std::collections::BTreeMap;

use kindling_core::Map;
use tracing::debug;

use crate::error::NormalizeError;
use crate::extract::{get_block, get_bool, get_int, get_map_slice, get_string, get_string_map, get_string_slice};
use crate::spec::{ClusterSpec, IpFamily, Mount, MountPropagation, Networking, Node, NodeRole, PortMapping, PortProtocol, ProxyMode};

/// Build a [`ClusterSpec`] from the decoded `kind_config` block.
///
/// Fails only when a port does not fit in 32 bits; the error names the node,
/// mapping and field that tripped.
pub fn normalize(cfg: &Map) -> Result<ClusterSpec, NormalizeError> {
    let mut spec = ClusterSpec { kind: get_string(cfg, "kind"), api_version: get_string(cfg, "api_version"), ..Default::default() };

    for (index, node) in get_map_slice(cfg, "node").unwrap_or_default().into_iter().enumerate() {
        let node = normalize_node(node).map_err(|e| NormalizeError::Node { index, source: Box::new(e) })?;
        spec.nodes.push(node);
    }

    if let Some(block) = get_block(cfg, "networking") {
        let net = normalize_networking(block).map_err(|e| NormalizeError::Networking { source: Box::new(e) })?;
        spec.networking = Some(net);
    }

    spec.containerd_config_patches = get_string_slice(cfg, "containerd_config_patches").unwrap_or_default();

    if let Some(rc) = get_string_map(cfg, "runtime_config") {
        spec.runtime_config = rc.into_iter().map(|(k, v)| (k.replace('_', "/"), v)).collect();
    }
    if let Some(gates) = get_string_map(cfg, "feature_gates") {
        spec.feature_gates = gates.into_iter().map(|(k, v)| (k, v.eq_ignore_ascii_case("true"))).collect::<BTreeMap<_, _>>();
    }

    Ok(spec)
}

fn normalize_node(m: &Map) -> Result<Node, NormalizeError> {
    let mut node = Node {
        role: parse_enum(m, "role", NodeRole::parse),
        image: get_string(m, "image"),
        labels: get_string_map(m, "labels").unwrap_or_default(),
        kubeadm_config_patches: get_string_slice(m, "kubeadm_config_patches").unwrap_or_default(),
        ..Default::default()
    };
    node.extra_mounts = get_map_slice(m, "extra_mounts").unwrap_or_default().into_iter().map(normalize_mount).collect();
    for (index, pm) in get_map_slice(m, "extra_port_mappings").unwrap_or_default().into_iter().enumerate() {
        let pm = normalize_port_mapping(pm).map_err(|e| NormalizeError::PortMapping { index, source: Box::new(e) })?;
        node.extra_port_mappings.push(pm);
    }
    Ok(node)
}

fn normalize_mount(m: &Map) -> Mount {
    Mount {
        container_path: get_string(m, "container_path"),
        host_path: get_string(m, "host_path"),
        read_only: get_bool(m, "read_only"),
        selinux_relabel: get_bool(m, "selinux_relabel"),
        propagation: parse_enum(m, "propagation", MountPropagation::parse),
    }
}

fn normalize_port_mapping(m: &Map) -> Result<PortMapping, NormalizeError> {
    Ok(PortMapping {
        container_port: port(m, "container_port")?,
        host_port: port(m, "host_port")?,
        listen_address: get_string(m, "listen_address"),
        protocol: parse_enum(m, "protocol", PortProtocol::parse),
    })
}

fn normalize_networking(m: &Map) -> Result<Networking, NormalizeError> {
    Ok(Networking {
        ip_family: parse_enum(m, "ip_family", IpFamily::parse),
        api_server_port: port(m, "api_server_port")?,
        api_server_address: get_string(m, "api_server_address"),
        pod_subnet: get_string(m, "pod_subnet"),
        service_subnet: get_string(m, "service_subnet"),
        disable_default_cni: get_bool(m, "disable_default_cni"),
        kube_proxy_mode: parse_enum(m, "kube_proxy_mode", ProxyMode::parse),
        dns_search: get_string_slice(m, "dns_search"),
    })
}

/// 0 means unset; anything else must fit an i32.
fn port(m: &Map, field: &'static str) -> Result<i32, NormalizeError> {
    let value = get_int(m, field);
    i32::try_from(value).map_err(|_| NormalizeError::PortOutOfRange { field, value })
}

fn parse_enum<T>(m: &Map, field: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let raw = get_string(m, field);
    if raw.is_empty() {
        return None;
    }
    let parsed = parse(&raw);
    if parsed.is_none() {
        debug!(field, value = %raw, "unrecognized value ignored");
    }
    parsed
}
