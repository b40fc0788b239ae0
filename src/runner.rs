//! Deploys the test package to the target and launches it.
//!
//! Thin sequencing over the target handle: push the archive, resolve the
//! package URL, run it under the right launcher for its component
//! generation, and relay the exit code. No retries happen here.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::config::cli_args::CliArgs;
use crate::ffx::FfxSession;
use crate::target::TargetHandle;

/// Launch parameters derived from the common command-line arguments.
#[derive(Debug, Default, Clone)]
pub struct RunTestPackageArgs {
    /// Run hermetically under a named test realm.
    pub use_run_test_component: bool,
    /// Realm label for hermetic runs.
    pub test_realm_label: Option<String>,
    /// Session output directory, set for v2 runs so staged artifacts are
    /// discoverable by the launcher.
    pub output_directory: Option<PathBuf>,
}

impl RunTestPackageArgs {
    pub fn from_common_args(args: &CliArgs) -> Self {
        Self {
            use_run_test_component: args.use_run_test_component,
            test_realm_label: None,
            output_directory: None,
        }
    }
}

/// Runs the test package on the target and returns its exit code.
pub fn run_test_package(
    target: &TargetHandle,
    ffx_session: Option<&FfxSession>,
    package: &Path,
    package_name: &str,
    component_version: &str,
    child_args: &[String],
    args: &RunTestPackageArgs,
) -> Result<i32> {
    let archive_path = format!("/tmp/{package_name}.far");
    target
        .borrow()
        .put_file(package, &archive_path, None, None)
        .with_context(|| format!("Unable to deploy {}", package.display()))?;
    debug!("Deployed {} to {archive_path}", package.display());

    let install = target.borrow().run_command(
        &format!("pkgctl pkg-add {archive_path}"),
        None,
    )?;
    if install.exit_code != 0 {
        anyhow::bail!(
            "Unable to install {package_name}: {}",
            install.stderr.trim()
        );
    }

    let returncode = if component_version == "2" {
        // v2 packages run through the ffx session so their artifacts are
        // staged into the session output directory while they execute.
        let session = match ffx_session {
            Some(session) => session,
            None => anyhow::bail!("v2 test packages require a live ffx session"),
        };
        let output_directory = args
            .output_directory
            .clone()
            .unwrap_or_else(|| session.output_dir().to_path_buf());
        let package_url =
            format!("fuchsia-pkg://fuchsia.com/{package_name}#meta/{package_name}.cm");
        session.run_test(&package_url, &output_directory, child_args)?
    } else {
        let command = launch_command(package_name, child_args, args);
        info!("Running {package_name}");
        let output = target.borrow().run_command(&command, None)?;
        for line in output.stdout.lines() {
            info!("{package_name}: {line}");
        }
        for line in output.stderr.lines() {
            info!("{package_name}: {line}");
        }
        output.exit_code
    };

    debug!("{package_name} finished with exit code {returncode}");
    Ok(returncode)
}

/// Builds the on-device launch command for a v1 package.
fn launch_command(package_name: &str, child_args: &[String], args: &RunTestPackageArgs) -> String {
    let mut command = if args.use_run_test_component {
        let realm = args
            .test_realm_label
            .as_deref()
            .map(|label| format!(" --realm-label={label}"))
            .unwrap_or_default();
        format!(
            "run-test-component{realm} fuchsia-pkg://fuchsia.com/{package_name}#meta/{package_name}.cmx"
        )
    } else {
        format!("run fuchsia-pkg://fuchsia.com/{package_name}#meta/{package_name}.cmx")
    };

    if !child_args.is_empty() {
        command.push_str(" -- ");
        command.push_str(&child_args.join(" "));
    }
    command
}
