use thiserror::Error;

/// Errors raised while normalizing a cluster spec.
///
/// Nested variants wrap the inner failure so the final message spells out the
/// path to the offending field, e.g.
/// `failed to flatten node 0: failed to flatten port mapping 1: host_port value ...`.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("{field} value {value} (must be between {min} and {max}): port value out of valid range", min = i32::MIN, max = i32::MAX)]
    PortOutOfRange { field: &'static str, value: i64 },

    #[error("failed to flatten node {index}: {source}")]
    Node { index: usize, source: Box<NormalizeError> },

    #[error("failed to flatten port mapping {index}: {source}")]
    PortMapping { index: usize, source: Box<NormalizeError> },

    #[error("failed to flatten networking configuration: {source}")]
    Networking { source: Box<NormalizeError> },

    #[error("missing required attribute `{0}`")]
    MissingAttribute(&'static str),
}

impl NormalizeError {
    /// Innermost error once all field-path wrappers are peeled off.
    pub fn root(&self) -> &NormalizeError {
        match self {
            NormalizeError::Node { source, .. }
            | NormalizeError::PortMapping { source, .. }
            | NormalizeError::Networking { source } => source.root(),
            other => other,
        }
    }

    pub fn is_port_out_of_range(&self) -> bool {
        matches!(self.root(), NormalizeError::PortOutOfRange { .. })
    }
}
