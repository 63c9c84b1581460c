//! Registry configuration.

use std::path::Path;

use rebind_ll::DEFAULT_INLINE_CAPACITY;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Configuration for a `Registry`.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use rebind_core::RegistryConfig;
///
/// let config = RegistryConfig::from_json(r#"{"max_conversion_depth": 2}"#).unwrap();
/// assert_eq!(config.max_conversion_depth, 2);
/// assert!(config.builtins);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Inline capacity of targets the registry builds for itself, in bytes.
    pub inline_capacity: usize,

    /// How many intermediate types a conversion may chain through.
    pub max_conversion_depth: usize,

    /// Whether `Registry::init` installs the numeric and string defaults.
    pub builtins: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            inline_capacity: DEFAULT_INLINE_CAPACITY,
            max_conversion_depth: 4,
            builtins: true,
        }
    }
}

impl RegistryConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
