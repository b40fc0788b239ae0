//! Deployment-target management.
//!
//! This module provides the unified interface through which the runner
//! talks to the remote embedded-OS target: command execution, file
//! transfer in both directions, and system-log capture.

use anyhow::Result;
use std::cell::RefCell;
use std::path::Path;
use std::process::Child;
use std::rc::Rc;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use crate::config::target_config::TargetConfig;
use crate::utils::CommandOutput;

/// Handle to a deployment target.
///
/// File operations take an optional package/realm scope. When a scope is
/// given, remote paths are resolved inside the isolated data directory of
/// that package under those realms, so artifacts are attributed correctly
/// when several realms run concurrently on the same device.
#[cfg_attr(test, automock)]
pub trait Target {
    /// Boots or attaches to the target, verifying it is reachable.
    fn start(&mut self) -> Result<()>;

    /// Captures a snapshot of the target's system log, filtered to the
    /// given package, into the configured host-side log path.
    fn start_system_log(&mut self, package_name: &str) -> Result<()>;

    /// Executes a command on the target and returns its output.
    fn run_command(&self, command: &str, timeout: Option<Duration>) -> Result<CommandOutput>;

    /// Uploads a local file to the target.
    fn put_file(
        &self,
        local_path: &Path,
        remote_path: &str,
        for_package: Option<String>,
        for_realms: Option<Vec<String>>,
    ) -> Result<()>;

    /// Copies every device file matching `remote_glob` into `dest_dir`
    /// on the host.
    fn copy_file_from_device(
        &self,
        remote_glob: &str,
        dest_dir: &Path,
        for_package: Option<String>,
        for_realms: Option<Vec<String>>,
    ) -> Result<()>;

    /// Establishes reverse port forwarding so the device can reach the
    /// host port `local_port` at its own `remote_port`. The tunnel lives
    /// until the returned handle is stopped or dropped.
    fn forward_remote_port(&self, remote_port: u16, local_port: u16) -> Result<PortForward>;

    /// Releases the connection to the target.
    fn teardown(&mut self) -> Result<()>;
}

/// A live reverse port-forwarding tunnel, torn down on stop or drop.
#[derive(Default)]
pub struct PortForward {
    child: Option<Child>,
}

impl From<Child> for PortForward {
    fn from(child: Child) -> Self {
        Self { child: Some(child) }
    }
}

impl PortForward {
    pub fn stop(mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            child.kill()?;
            child.wait()?;
        }
        Ok(())
    }
}

impl Drop for PortForward {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Shared handle to the target, held by both the orchestration flow and
/// the output-retrieval strategy for the duration of one run.
pub type TargetHandle = Rc<RefCell<Box<dyn Target>>>;

/// Wraps a boxed target in a shared handle.
pub fn share(target: Box<dyn Target>) -> TargetHandle {
    Rc::new(RefCell::new(target))
}

/// Target factory, creating the handle appropriate for a configuration.
pub struct TargetFactory;

impl TargetFactory {
    /// Creates a target handle for the given configuration. Physical
    /// devices and emulators are both reached over SSH.
    pub fn create(config: &TargetConfig) -> Result<Box<dyn Target>> {
        match config.device_kind.as_str() {
            "device" | "emulator" => Ok(Box::new(SshTarget::new(config)?)),
            other => anyhow::bail!("Unknown device kind: {other}"),
        }
    }
}

mod ssh;
pub use ssh::SshTarget;
