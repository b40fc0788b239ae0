//! Configuration types for the runner.
//!
//! Command-line arguments, target connection settings, and the runner's
//! path conventions each live in their own submodule.

pub mod cli_args;
pub mod connection_config;
pub mod runner_config;
pub mod target_config;
