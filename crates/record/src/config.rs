//! Record engine configuration via `docrec.toml`
//!
//! Every record created by a `Records` arena is seeded from one
//! `RecordConfig`. Flags can still be flipped per record afterwards.

use docrec_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "docrec.toml";

/// Record engine configuration loaded from `docrec.toml`.
///
/// # Example
///
/// ```toml
/// # Keep fields in insertion order
/// ordered = true
///
/// # Decode the raw buffer only when a field is first accessed
/// lazy_load = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Preserve field insertion order.
    #[serde(default = "default_true")]
    pub ordered: bool,
    /// Decode the raw buffer on first access instead of at construction.
    #[serde(default = "default_true")]
    pub lazy_load: bool,
    /// Capture originals and structural timelines for undo and deltas.
    #[serde(default = "default_true")]
    pub tracking_changes: bool,
    /// Treat names containing `.` or `[` as paths.
    #[serde(default = "default_true")]
    pub allow_chained_access: bool,
    /// Validate before persisting when no session decides it.
    #[serde(default = "default_true")]
    pub validation: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            ordered: true,
            lazy_load: true,
            tracking_changes: true,
            allow_chained_access: true,
            validation: true,
        }
    }
}

impl RecordConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# docrec record engine configuration
#
# Keep fields in insertion order (default: true)
ordered = true

# Decode the raw buffer only when a field is first accessed (default: true)
# When false, records built from a buffer are decoded immediately.
lazy_load = true

# Capture original values and structural timelines (default: true)
# Required for undo and delta streams.
tracking_changes = true

# Treat field names containing '.' or '[' as paths (default: true)
allow_chained_access = true

# Validate records when no session overrides it (default: true)
validation = true
"#
    }

    /// Parse config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::invalid_argument(format!("Failed to parse record config: {}", e)))
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::illegal_state(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::invalid_argument(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::illegal_state(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::illegal_state(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
