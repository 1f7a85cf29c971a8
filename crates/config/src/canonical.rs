//! Canonical TOML re-serialization for containerd patches.

use kindling_core::Value;
use thiserror::Error;

/// Normalization failed; the untouched input is kept so callers can still use it.
#[derive(Debug, Error)]
pub enum TomlNormalizeError {
    #[error("failed to parse TOML: {source}")]
    Parse { original: String, source: toml::de::Error },

    #[error("failed to serialize TOML: {source}")]
    Serialize { original: String, source: toml::ser::Error },
}

impl TomlNormalizeError {
    pub fn original(&self) -> &str {
        match self {
            TomlNormalizeError::Parse { original, .. } | TomlNormalizeError::Serialize { original, .. } => original,
        }
    }

    pub fn into_original(self) -> String {
        match self {
            TomlNormalizeError::Parse { original, .. } | TomlNormalizeError::Serialize { original, .. } => original,
        }
    }
}

/// Parse `value` as a TOML document and re-serialize it canonically.
///
/// Null, non-string and empty input yield `Ok("")`. Idempotent: feeding the
/// output back in returns it byte for byte.
pub fn normalize_toml(value: &Value) -> Result<String, TomlNormalizeError> {
    let text = match value.as_str() {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(String::new()),
    };
    let table: toml::Table = text
        .parse()
        .map_err(|source| TomlNormalizeError::Parse { original: text.to_string(), source })?;
    toml::to_string(&table).map_err(|source| TomlNormalizeError::Serialize { original: text.to_string(), source })
}
