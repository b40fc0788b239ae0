//! Device-path output retrieval for v1 components.
//!
//! v1 tests write their artifacts into the shared `/tmp` area on the
//! device; retrieval pulls them over the target's file-copy channel,
//! scoped to the package and realms of the run so files land in the
//! right place when several realms share a device.

use anyhow::Result;
use std::path::Path;

use crate::ffx::FfxSession;
use crate::outputs::{TestOutputs, TEST_DATA_DIR, TEST_LLVM_PROFILE_DIR};
use crate::target::TargetHandle;

pub struct DeviceTestOutputs {
    target: TargetHandle,
    package_name: String,
    test_realms: Vec<String>,
}

impl DeviceTestOutputs {
    pub fn new(target: TargetHandle, package_name: &str, test_realms: &[String]) -> Self {
        Self {
            target,
            package_name: package_name.to_string(),
            test_realms: test_realms.to_vec(),
        }
    }
}

impl TestOutputs for DeviceTestOutputs {
    fn ffx_session(&self) -> Option<&FfxSession> {
        // ffx is not used to run v1 tests.
        None
    }

    fn device_path(&self, relative: &str) -> String {
        assert!(!relative.is_empty(), "Device path input must not be empty");
        format!("{TEST_DATA_DIR}/{relative}")
    }

    fn fetch(&self, glob: &str, destination: &Path) -> Result<()> {
        self.target.borrow().copy_file_from_device(
            &self.device_path(glob),
            destination,
            Some(self.package_name.clone()),
            Some(self.test_realms.clone()),
        )
    }

    fn fetch_coverage_profiles(&self, destination: &Path) -> Result<()> {
        // Copy the files in the profile directory individually; recursive
        // copies of the directory itself hit permission errors.
        self.target.borrow().copy_file_from_device(
            &self.device_path(&format!("{TEST_LLVM_PROFILE_DIR}/*")),
            destination,
            None,
            None,
        )
    }
}
