//! Kindling config: turn the decoded attribute tree into a typed cluster spec.
//!
//! Extraction from the generic tree never fails (see [`extract`]): a missing
//! key, a null or a value of the wrong type falls back to the zero value. The
//! only hard failures are 32-bit range violations on port fields and, at the
//! resource level, a missing `name` or `kind_config.kind`.

#![forbid(unsafe_code)]

pub mod canonical;
pub mod error;
pub mod extract;
mod normalize;
pub mod resource;
pub mod spec;

pub use canonical::{normalize_toml, TomlNormalizeError};
pub use error::NormalizeError;
pub use normalize::normalize;
pub use resource::{ResourceConfig, DEFAULT_API_VERSION};
pub use spec::{ClusterSpec, IpFamily, Mount, MountPropagation, Networking, Node, NodeRole, PortMapping, PortProtocol, ProxyMode};
