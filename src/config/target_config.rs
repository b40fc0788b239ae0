//! Represents the configuration for a deployment target.

use crate::config::connection_config::ConnectionConfig;
use crate::utils;
/// This struct is deserialized from a file using
/// `utils::read_toml_from_file`. It contains the following fields:
/// - `device_kind`: A string distinguishing a physical 'device' from an 'emulator'.
/// - `connection`: An instance of `ConnectionConfig` describing how to reach the target.
/// - `system_log_path`: An optional host path where the target's system log is streamed.
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    // 'device' or 'emulator'
    #[serde(default = "default_device_kind")]
    pub device_kind: String,

    #[serde(rename = "connection", default)]
    pub connection: ConnectionConfig,

    pub system_log_path: Option<PathBuf>,
}

fn default_device_kind() -> String {
    "emulator".to_string()
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            device_kind: default_device_kind(),
            connection: ConnectionConfig::default(),
            system_log_path: None,
        }
    }
}

impl TargetConfig {
    pub fn get_connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    /// Reads the target configuration from a TOML file.
    pub fn from_file(file_path: &std::path::Path) -> anyhow::Result<Self> {
        let path = PathBuf::from(file_path);
        let config: Self = utils::read_toml_from_file(&path)?;
        Ok(config)
    }
}
