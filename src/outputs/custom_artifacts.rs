//! Session-mediated output retrieval for v2 components.
//!
//! v2 tests emit files into their `/custom_artifacts` namespace and an
//! ffx session stages them into a host-side output directory while the
//! test runs. Retrieval is therefore a host-local copy out of the
//! session's mirror; no device round trip happens.
//!
//! Coverage profiles are the exception. The session API does not expose
//! them yet, so they are pulled off the device from the test manager's
//! internal debug-data path. That path is injected via `RunnerConfig`
//! so the convention can change without touching this strategy.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

use crate::ffx::{FfxSession, FfxSessionFactory};
use crate::outputs::{TestOutputs, CUSTOM_ARTIFACTS_DIR};
use crate::target::TargetHandle;

pub struct CustomArtifactsTestOutputs {
    target: TargetHandle,
    session_factory: FfxSessionFactory,
    session: Option<FfxSession>,
    closed: bool,
    /// Device directory holding llvm-profile output, from configuration.
    profile_dir: String,
}

impl CustomArtifactsTestOutputs {
    pub fn new(target: TargetHandle, session_factory: FfxSessionFactory, profile_dir: String) -> Self {
        Self {
            target,
            session_factory,
            session: None,
            closed: false,
            profile_dir,
        }
    }

    /// The live session. Panics when called outside the open state; that
    /// is a caller bug, not a recoverable condition.
    fn open_session(&self) -> &FfxSession {
        match &self.session {
            Some(session) => session,
            None => panic!("Artifact session is not open"),
        }
    }
}

impl TestOutputs for CustomArtifactsTestOutputs {
    fn setup(&mut self) -> Result<()> {
        assert!(
            !self.closed && self.session.is_none(),
            "Artifact session cannot be reopened"
        );
        self.session = Some(self.session_factory.open()?);
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            session.close()?;
        }
        self.closed = true;
        Ok(())
    }

    fn ffx_session(&self) -> Option<&FfxSession> {
        self.session.as_ref()
    }

    fn device_path(&self, relative: &str) -> String {
        assert!(!relative.is_empty(), "Device path input must not be empty");
        format!("{CUSTOM_ARTIFACTS_DIR}/{relative}")
    }

    fn fetch(&self, glob: &str, destination: &Path) -> Result<()> {
        // The session has already mirrored the artifacts to the host, so
        // this is a plain local copy.
        let source = self
            .open_session()
            .output_dir()
            .join("artifact-0")
            .join("custom-0")
            .join(glob);
        debug!("Copying staged artifact {} -> {}", source.display(), destination.display());
        std::fs::copy(&source, destination)
            .map(|_| ())
            .with_context(|| format!("Unable to copy staged artifact {}", source.display()))
    }

    fn fetch_coverage_profiles(&self, destination: &Path) -> Result<()> {
        let _ = self.open_session();
        self.target.borrow().copy_file_from_device(
            &format!("{}/*", self.profile_dir),
            destination,
            None,
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{MockTarget, Target};
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::tempdir;

    const PROFILE_DIR: &str = "/tmp/test_manager:0/children/debug_data:0/data/llvm-profile";

    fn share(mock: MockTarget) -> TargetHandle {
        Rc::new(RefCell::new(Box::new(mock) as Box<dyn Target>))
    }

    fn outputs_with(mock: MockTarget, base: &Path) -> CustomArtifactsTestOutputs {
        CustomArtifactsTestOutputs::new(
            share(mock),
            FfxSessionFactory::new(None, Some(base.to_path_buf())),
            PROFILE_DIR.to_string(),
        )
    }

    #[test]
    fn device_path_is_rooted_in_custom_artifacts() {
        let base = tempdir().unwrap();
        let outputs = outputs_with(MockTarget::new(), base.path());
        assert_eq!(
            outputs.device_path("test_summary.json"),
            "/custom_artifacts/test_summary.json"
        );
    }

    #[test]
    fn session_is_only_exposed_while_open() {
        let base = tempdir().unwrap();
        let mut outputs = outputs_with(MockTarget::new(), base.path());
        assert!(outputs.ffx_session().is_none());
        outputs.setup().unwrap();
        assert!(outputs.ffx_session().is_some());
        outputs.teardown().unwrap();
        assert!(outputs.ffx_session().is_none());
    }

    #[test]
    fn fetch_copies_from_session_mirror_without_touching_target() {
        let base = tempdir().unwrap();
        // A MockTarget with no expectations fails the test on any call.
        let mut outputs = outputs_with(MockTarget::new(), base.path());
        outputs.setup().unwrap();

        let staged = outputs
            .ffx_session()
            .unwrap()
            .output_dir()
            .join("artifact-0")
            .join("custom-0");
        fs::create_dir_all(&staged).unwrap();
        fs::write(staged.join("test_summary.json"), "{\"tests\":[]}").unwrap();

        let dest = base.path().join("summary.json");
        outputs.fetch("test_summary.json", &dest).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "{\"tests\":[]}");
        outputs.teardown().unwrap();
    }

    #[test]
    fn fetch_fails_on_missing_staged_artifact() {
        let base = tempdir().unwrap();
        let mut outputs = outputs_with(MockTarget::new(), base.path());
        outputs.setup().unwrap();
        let dest = base.path().join("summary.json");
        assert!(outputs.fetch("test_summary.json", &dest).is_err());
        outputs.teardown().unwrap();
    }

    #[test]
    fn coverage_profiles_come_from_injected_debug_data_path() {
        let mut mock = MockTarget::new();
        mock.expect_copy_file_from_device()
            .withf(|glob, _dest, package, realms| {
                glob == "/tmp/test_manager:0/children/debug_data:0/data/llvm-profile/*"
                    && !glob.starts_with("/custom_artifacts")
                    && package.is_none()
                    && realms.is_none()
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let base = tempdir().unwrap();
        let mut outputs = outputs_with(mock, base.path());
        outputs.setup().unwrap();
        outputs
            .fetch_coverage_profiles(&base.path().join("coverage"))
            .unwrap();
        outputs.teardown().unwrap();
    }

    #[test]
    #[should_panic(expected = "not open")]
    fn fetch_before_setup_is_a_contract_violation() {
        let base = tempdir().unwrap();
        let outputs = outputs_with(MockTarget::new(), base.path());
        let _ = outputs.fetch("test_summary.json", &base.path().join("x"));
    }

    #[test]
    #[should_panic(expected = "not open")]
    fn fetch_after_teardown_is_a_contract_violation() {
        let base = tempdir().unwrap();
        let mut outputs = outputs_with(MockTarget::new(), base.path());
        outputs.setup().unwrap();
        outputs.teardown().unwrap();
        let _ = outputs.fetch("test_summary.json", &base.path().join("x"));
    }

    #[test]
    #[should_panic(expected = "reopened")]
    fn reopening_a_closed_session_is_a_contract_violation() {
        let base = tempdir().unwrap();
        let mut outputs = outputs_with(MockTarget::new(), base.path());
        outputs.setup().unwrap();
        outputs.teardown().unwrap();
        let _ = outputs.setup();
    }
}
