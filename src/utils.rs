//! Utility types and helpers shared across the runner.
//!
//! This module provides the command output structure returned by target
//! command execution, TOML config loading, and host introspection used by
//! the bot-mode overrides.

use log::error;
use serde::de::DeserializeOwned;
use std::{env, fs, path::PathBuf};

/// The result of a command executed on the target or the host.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code.
    pub exit_code: i32,
}

/// Reads a TOML file into an arbitrary struct.
///
/// # Parameters
///
/// - `path`: The path of the TOML file.
///
/// # Returns
///
/// Returns a struct of the specified type containing deserialized data.
///
/// # Errors
///
/// Returns an error if the file cannot be read or data parsing fails.
pub fn read_toml_from_file<T>(path: &PathBuf) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let content = fs::read_to_string(path)?;
    let config: T = match toml::de::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to parse TOML file {}: {e}", path.display());
            return Err(e.into());
        }
    };
    Ok(config)
}

/// Returns the host CPU architecture, e.g. `x86_64` or `arm64`.
///
/// Normalizes `aarch64` to `arm64` so callers can compare against the
/// names used by build-bot configurations.
pub fn host_arch() -> String {
    let arch = env::consts::ARCH;
    if arch == "aarch64" {
        "arm64".to_string()
    } else {
        arch.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_arch_is_normalized() {
        let arch = host_arch();
        assert_ne!(arch, "aarch64");
        assert!(!arch.is_empty());
    }
}
