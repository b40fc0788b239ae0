//! Maps run failures to process exit codes for the build system.
//!
//! The build system distinguishes flag/config mistakes from
//! infrastructure trouble, so validation, connection, and I/O failures
//! each get their own code. A successful orchestration relays the test
//! process's own exit code instead.

use log::error;
use std::fmt;

/// Exit code for bad flags or configuration.
pub const EXIT_CODE_VALIDATION: i32 = 64;
/// Exit code for target connection failures.
pub const EXIT_CODE_CONNECTION: i32 = 65;
/// Exit code for host or device I/O failures.
pub const EXIT_CODE_IO: i32 = 66;
/// Exit code for anything else.
pub const EXIT_CODE_GENERIC: i32 = 1;

/// A value-validation failure raised before any retrieval occurs.
#[derive(Debug)]
pub struct ValidationError(pub String);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

/// A failure to reach or keep a connection to the target.
#[derive(Debug)]
pub struct ConnectionError(pub String);

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConnectionError {}

/// Logs the error chain and picks the exit code for it.
pub fn handle_error_and_return_exit_code(err: &anyhow::Error) -> i32 {
    error!("Test run failed: {err:#}");
    for cause in err.chain() {
        if cause.downcast_ref::<ValidationError>().is_some() {
            return EXIT_CODE_VALIDATION;
        }
        if cause.downcast_ref::<ConnectionError>().is_some() {
            return EXIT_CODE_CONNECTION;
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return EXIT_CODE_IO;
        }
        if cause.downcast_ref::<ssh2::Error>().is_some() {
            return EXIT_CODE_CONNECTION;
        }
    }
    EXIT_CODE_GENERIC
}
