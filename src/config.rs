//! YAML configuration
//!
//! ```yaml
//! validation:
//!   except_rules: [FIELD_NAME_CHANGE]
//!   fail_on: [WIRE_INCOMPATIBILITY]
//! compiler:
//!   kind: protoc
//!   protoc_path: /usr/local/bin/protoc
//! ```

use crate::compat::ValidationConfig;
use crate::compiler::CompilerConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub validation: ValidationConfig,
    pub compiler: CompilerConfig,
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from YAML string. An empty document yields the
    /// defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }
}
