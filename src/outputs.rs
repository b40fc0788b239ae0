//! Test-output retrieval.
//!
//! A test package leaves its result and coverage artifacts on the target
//! in one of two ways, depending on the component framework generation it
//! was built for. Legacy (v1) components write into the shared `/tmp`
//! area and files are pulled off the device directly. Modern (v2)
//! components emit custom artifacts that an ffx session stages into a
//! host-side output directory while the test runs.
//!
//! The `TestOutputs` trait abstracts over the two, so the orchestration
//! flow computes device paths and collects artifacts without knowing
//! which generation is in play.

use anyhow::Result;
use log::warn;
use std::path::Path;

use crate::config::runner_config::RunnerConfig;
use crate::ffx::{FfxSession, FfxSessionFactory};
use crate::target::TargetHandle;

/// Shared device temp area where v1 components leave their output.
pub const TEST_DATA_DIR: &str = "/tmp";
/// Custom-artifacts namespace of v2 components.
pub const CUSTOM_ARTIFACTS_DIR: &str = "/custom_artifacts";
/// Directory name under which coverage profiles are written.
pub const TEST_LLVM_PROFILE_DIR: &str = "llvm-profile";

/// Extracts outputs generated by a test run.
///
/// Implementations move through `Unopened -> Open -> Closed` via
/// `setup`/`teardown`. The variants that do not hold a session implement
/// the pair as no-ops; on the session-mediated variant, `ffx_session` and
/// `fetch` are only valid while open. Use [`with_test_outputs`] to get
/// teardown on every exit path.
pub trait TestOutputs {
    /// Acquires whatever resources retrieval needs. Idempotent for
    /// variants without state.
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Releases acquired resources.
    fn teardown(&mut self) -> Result<()> {
        Ok(())
    }

    /// The live artifact session, if this variant uses one. Callers must
    /// check presence before use.
    fn ffx_session(&self) -> Option<&FfxSession>;

    /// Maps a logical relative path to this variant's absolute
    /// device-local path. Panics on an empty input.
    fn device_path(&self, relative: &str) -> String;

    /// Places all files matched by `glob` into `destination` on the
    /// host. All-or-nothing: a failed copy fails the whole call.
    fn fetch(&self, glob: &str, destination: &Path) -> Result<()>;

    /// Places all coverage profiles from the run into `destination`.
    fn fetch_coverage_profiles(&self, destination: &Path) -> Result<()>;
}

/// Runs `f` between `setup` and `teardown`, tearing down on the error
/// path as well. The first error wins.
pub fn with_test_outputs<T>(
    outputs: &mut dyn TestOutputs,
    f: impl FnOnce(&mut dyn TestOutputs) -> Result<T>,
) -> Result<T> {
    outputs.setup()?;
    let result = f(&mut *outputs);
    let teardown = outputs.teardown();
    match result {
        Ok(value) => teardown.map(|_| value),
        Err(e) => {
            if let Err(td) = teardown {
                warn!("Teardown after failure also failed: {td}");
            }
            Err(e)
        }
    }
}

/// Selects the retrieval strategy for a component version.
///
/// `"2"` selects session-mediated retrieval. Other values select the
/// device-path strategy; with `strict_component_version` set, anything
/// but `"1"` and `"2"` is rejected instead of falling back.
pub fn make_test_outputs(
    component_version: &str,
    target: TargetHandle,
    package_name: &str,
    test_realms: &[String],
    config: &RunnerConfig,
) -> Result<Box<dyn TestOutputs>> {
    match component_version {
        "2" => {
            let factory = FfxSessionFactory::new(
                config.ffx_path.clone(),
                config.session_output_base.clone(),
            );
            Ok(Box::new(CustomArtifactsTestOutputs::new(
                target,
                factory,
                config.debug_data_profile_dir.clone(),
            )))
        }
        "1" => Ok(Box::new(DeviceTestOutputs::new(
            target,
            package_name,
            test_realms,
        ))),
        other => {
            if config.strict_component_version {
                anyhow::bail!("Unknown component version: {other}");
            }
            warn!("Unknown component version {other:?}, assuming v1 output retrieval");
            Ok(Box::new(DeviceTestOutputs::new(
                target,
                package_name,
                test_realms,
            )))
        }
    }
}

mod custom_artifacts;
mod device;
pub use custom_artifacts::CustomArtifactsTestOutputs;
pub use device::DeviceTestOutputs;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::MockTarget;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn mock_target() -> TargetHandle {
        Rc::new(RefCell::new(Box::new(MockTarget::new()) as Box<dyn crate::target::Target>))
    }

    fn make(version: &str, strict: bool) -> Result<Box<dyn TestOutputs>> {
        let config = RunnerConfig {
            strict_component_version: strict,
            ..RunnerConfig::default()
        };
        make_test_outputs(version, mock_target(), "my_pkg", &[], &config)
    }

    #[test]
    fn version_two_selects_custom_artifacts() {
        let outputs = make("2", false).unwrap();
        assert_eq!(
            outputs.device_path("test_summary.json"),
            "/custom_artifacts/test_summary.json"
        );
    }

    #[test]
    fn other_versions_select_device_outputs() {
        for version in ["1", "", "3"] {
            let outputs = make(version, false).unwrap();
            assert_eq!(
                outputs.device_path("test_summary.json"),
                "/tmp/test_summary.json",
                "version {version:?}"
            );
        }
    }

    #[test]
    fn strict_mode_rejects_unknown_versions() {
        assert!(make("1", true).is_ok());
        assert!(make("2", true).is_ok());
        assert!(make("", true).is_err());
        assert!(make("3", true).is_err());
    }

    #[test]
    fn scope_helper_tears_down_on_failure() {
        struct Tracking {
            setup: bool,
            teardown: bool,
        }
        impl TestOutputs for Tracking {
            fn setup(&mut self) -> Result<()> {
                self.setup = true;
                Ok(())
            }
            fn teardown(&mut self) -> Result<()> {
                self.teardown = true;
                Ok(())
            }
            fn ffx_session(&self) -> Option<&FfxSession> {
                None
            }
            fn device_path(&self, relative: &str) -> String {
                relative.to_string()
            }
            fn fetch(&self, _glob: &str, _destination: &Path) -> Result<()> {
                Ok(())
            }
            fn fetch_coverage_profiles(&self, _destination: &Path) -> Result<()> {
                Ok(())
            }
        }

        let mut outputs = Tracking {
            setup: false,
            teardown: false,
        };
        let result: Result<()> =
            with_test_outputs(&mut outputs, |_| anyhow::bail!("run failed"));
        assert!(result.is_err());
        assert!(outputs.setup);
        assert!(outputs.teardown);
    }
}
