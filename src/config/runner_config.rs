//! Runner-level settings: path conventions and version handling.

use crate::utils;
use serde::Deserialize;
use std::path::PathBuf;

/// Device path where v2 components stage coverage profiles.
///
/// This is an internal convention of the target's test manager, kept in
/// configuration so it can be swapped once the session API exposes profile
/// retrieval directly.
const DEFAULT_DEBUG_DATA_PROFILE_DIR: &str =
    "/tmp/test_manager:0/children/debug_data:0/data/llvm-profile";

#[derive(Debug, Deserialize, Clone)]
pub struct RunnerConfig {
    /// Reject unrecognized component versions instead of falling back to
    /// the legacy retrieval strategy.
    #[serde(default)]
    pub strict_component_version: bool,

    /// Device directory holding llvm-profile output for v2 components.
    #[serde(default = "default_debug_data_profile_dir")]
    pub debug_data_profile_dir: String,

    /// Path to the ffx binary; when unset the session only manages its
    /// host-side output directory.
    pub ffx_path: Option<PathBuf>,

    /// Base directory for session output directories. Defaults to a fresh
    /// temporary directory per session.
    pub session_output_base: Option<PathBuf>,
}

fn default_debug_data_profile_dir() -> String {
    DEFAULT_DEBUG_DATA_PROFILE_DIR.to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            strict_component_version: false,
            debug_data_profile_dir: default_debug_data_profile_dir(),
            ffx_path: None,
            session_output_base: None,
        }
    }
}

impl RunnerConfig {
    /// Reads the runner configuration from a TOML file.
    pub fn from_file(file_path: &std::path::Path) -> anyhow::Result<Self> {
        let path = PathBuf::from(file_path);
        let config: Self = utils::read_toml_from_file(&path)?;
        Ok(config)
    }
}
