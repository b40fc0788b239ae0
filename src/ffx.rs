//! Ephemeral ffx artifact sessions.
//!
//! A session stages device-produced test artifacts into a host-side
//! output directory for the duration of one test run. The directory is
//! only meaningful while the session is live; callers must not hold on
//! to it across sessions.

use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::runner_errors::ValidationError;

/// Creates artifact sessions according to the runner configuration.
#[derive(Debug, Clone, Default)]
pub struct FfxSessionFactory {
    ffx_path: Option<PathBuf>,
    output_base: Option<PathBuf>,
}

impl FfxSessionFactory {
    pub fn new(ffx_path: Option<PathBuf>, output_base: Option<PathBuf>) -> Self {
        Self {
            ffx_path,
            output_base,
        }
    }

    /// Opens a session, creating its output directory. When an ffx binary
    /// is configured, its daemon is started alongside so artifact staging
    /// begins immediately.
    pub fn open(&self) -> Result<FfxSession> {
        let output_dir = match &self.output_base {
            Some(base) => {
                let dir = base.join(format!("ffx-{}", Local::now().format("%Y%m%d-%H%M%S-%f")));
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Unable to create {}", dir.display()))?;
                dir
            }
            None => tempfile::Builder::new()
                .prefix("ffx-session-")
                .tempdir()
                .with_context(|| "Unable to create session output directory")?
                .keep(),
        };

        let daemon = match &self.ffx_path {
            Some(ffx) => {
                debug!("Starting ffx daemon: {}", ffx.display());
                let child = Command::new(ffx)
                    .arg("daemon")
                    .arg("start")
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .with_context(|| format!("Unable to start ffx daemon: {}", ffx.display()))?;
                Some(child)
            }
            None => None,
        };

        debug!("Opened ffx session with output dir {}", output_dir.display());
        Ok(FfxSession {
            output_dir,
            daemon,
            ffx_path: self.ffx_path.clone(),
        })
    }
}

/// A live artifact session.
pub struct FfxSession {
    output_dir: PathBuf,
    daemon: Option<Child>,
    ffx_path: Option<PathBuf>,
}

impl FfxSession {
    /// The host directory into which the session stages artifacts.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Builds the host-side test-run invocation for a package URL,
    /// directing the launcher to stage artifacts into `output_directory`.
    fn test_run_command(
        &self,
        package_url: &str,
        output_directory: &Path,
        child_args: &[String],
    ) -> Result<Command> {
        let ffx = self.ffx_path.as_ref().ok_or_else(|| {
            ValidationError(
                "Running v2 test packages requires an ffx binary; set ffx_path in the runner config"
                    .to_string(),
            )
        })?;
        let mut command = Command::new(ffx);
        command
            .arg("test")
            .arg("run")
            .arg(package_url)
            .arg("--output-directory")
            .arg(output_directory);
        if !child_args.is_empty() {
            command.arg("--");
            command.args(child_args);
        }
        Ok(command)
    }

    /// Runs a test package through the session and returns its exit
    /// code. Artifacts land under `output_directory` while it runs.
    pub fn run_test(
        &self,
        package_url: &str,
        output_directory: &Path,
        child_args: &[String],
    ) -> Result<i32> {
        let mut command = self.test_run_command(package_url, output_directory, child_args)?;
        info!("Running {package_url} through ffx");
        let status = command
            .status()
            .with_context(|| format!("Unable to run {package_url} through ffx"))?;
        match status.code() {
            Some(code) => Ok(code),
            None => {
                warn!("ffx test run was terminated by a signal");
                Ok(1)
            }
        }
    }

    /// Releases the session. The output directory stops being refreshed;
    /// already-staged files remain readable until the caller cleans up.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut daemon) = self.daemon.take() {
            if let Err(e) = daemon.kill() {
                warn!("Unable to stop ffx daemon: {e}");
            }
            let _ = daemon.wait();
        }
        debug!("Closed ffx session at {}", self.output_dir.display());
        Ok(())
    }
}

impl Drop for FfxSession {
    fn drop(&mut self) {
        if let Some(mut daemon) = self.daemon.take() {
            let _ = daemon.kill();
            let _ = daemon.wait();
        }
    }
}
