//! Orchestrates one test run against the target.
//!
//! Validates arguments, translates launcher flags into arguments for the
//! test process, deploys and runs the package, then collects result and
//! coverage artifacts through the output-retrieval strategy.

use anyhow::{Context, Result};
use log::debug;
use std::io::{Read, Write};
use std::rc::Rc;

use crate::config::cli_args::CliArgs;
use crate::config::runner_config::RunnerConfig;
use crate::config::target_config::TargetConfig;
use crate::outputs::{make_test_outputs, with_test_outputs};
use crate::runner::{run_test_package, RunTestPackageArgs};
use crate::runner_errors::{handle_error_and_return_exit_code, ValidationError};
use crate::target::{share, TargetFactory};
use crate::test_server::setup_test_server;
use crate::utils::host_arch;

const DEFAULT_TEST_SERVER_CONCURRENCY: u32 = 4;

const TEST_FILTER_PATH: &str = "/tmp/test_filter.txt";
const TEST_PERF_RESULT_FILE: &str = "test_perf_summary.json";
const TEST_RESULT_FILE: &str = "test_summary.json";

const TEST_REALM_NAME: &str = "chromium_tests";

/// Directory required to contain registered filter files.
const FILTER_DIR: &str = "testing/buildbot/filters";

/// Runs the whole flow, converting any failure into an exit code.
pub fn run(args: CliArgs) -> i32 {
    match run_inner(args) {
        Ok(exit_code) => exit_code,
        Err(e) => handle_error_and_return_exit_code(&e),
    }
}

fn run_inner(mut args: CliArgs) -> Result<i32> {
    // out-dir is required for tests launched with this runner.
    let out_dir = args
        .out_dir
        .clone()
        .ok_or_else(|| ValidationError("out-dir must be specified".to_string()))?;

    if args.component_version == "2" {
        args.use_run_test_component = false;
    }

    if args.code_coverage && args.component_version != "2" && !args.use_run_test_component {
        if args.enable_test_server {
            // v1 suites that need the test server cannot run as a test
            // component, but coverage collection requires one. Force the
            // component anyway; suites reaching for the external server
            // are expected to fail.
            args.use_run_test_component = true;
        } else {
            return Err(ValidationError(
                "Collecting code coverage info requires using run-test-component".to_string(),
            )
            .into());
        }
    }

    apply_test_bot_overrides(&mut args);

    let package = args
        .package
        .clone()
        .ok_or_else(|| ValidationError("package must be specified".to_string()))?;
    let package_name = args
        .package_name
        .clone()
        .ok_or_else(|| ValidationError("package-name must be specified".to_string()))?;

    let target_config = match &args.target_config {
        Some(path) => TargetConfig::from_file(path)?,
        None => TargetConfig::default(),
    };
    let runner_config = match &args.runner_config {
        Some(path) => RunnerConfig::from_file(path)?,
        None => RunnerConfig::default(),
    };

    let test_realms = if args.use_run_test_component {
        vec![TEST_REALM_NAME.to_string()]
    } else {
        Vec::new()
    };

    let concurrency = test_concurrency(&args);
    let mut child_args = build_child_args(&args, concurrency);

    let target = share(TargetFactory::create(&target_config)?);
    let mut outputs = make_test_outputs(
        &args.component_version,
        Rc::clone(&target),
        &package_name,
        &test_realms,
        &runner_config,
    )?;

    with_test_outputs(outputs.as_mut(), |outputs| {
        if args.test_launcher_summary_output.is_some() {
            child_args.push(format!(
                "--test-launcher-summary-output={}",
                outputs.device_path(TEST_RESULT_FILE)
            ));
        }
        if args.isolated_script_test_output.is_some() {
            child_args.push(format!(
                "--isolated-script-test-output={}",
                outputs.device_path(TEST_RESULT_FILE)
            ));
        }
        if args.isolated_script_test_perf_output.is_some() {
            child_args.push(format!(
                "--isolated-script-test-perf-output={}",
                outputs.device_path(TEST_PERF_RESULT_FILE)
            ));
        }

        target.borrow_mut().start()?;
        target.borrow_mut().start_system_log(&package_name)?;

        if let Some(filter_files) = &args.test_launcher_filter_file {
            if args.component_version == "2" {
                // Filter files must ship inside the test package; there
                // is no way to push a file to a v2 component at run time.
                let mapped = filter_files
                    .split(';')
                    .map(map_filter_file_to_package_file)
                    .collect::<Result<Vec<_>>>()?;
                child_args.push(format!("--test-launcher-filter-file={}", mapped.join(";")));
            } else {
                let mut combined = tempfile::NamedTempFile::new()?;
                for filter_file in filter_files.split(';') {
                    let path = out_dir.join(filter_file);
                    let mut contents = Vec::new();
                    std::fs::File::open(&path)
                        .with_context(|| format!("Unable to open filter file {}", path.display()))?
                        .read_to_end(&mut contents)?;
                    combined.write_all(&contents)?;
                }
                combined.flush()?;
                target.borrow().put_file(
                    combined.path(),
                    TEST_FILTER_PATH,
                    Some(package_name.clone()),
                    Some(test_realms.clone()),
                )?;
                child_args.push(format!("--test-launcher-filter-file={TEST_FILTER_PATH}"));
            }
        }

        let test_server = if args.enable_test_server {
            let concurrency = concurrency
                .expect("Test server requires a concurrency value");
            Some(setup_test_server(
                &target,
                concurrency,
                &package_name,
                &test_realms,
            )?)
        } else {
            None
        };

        let mut run_package_args = RunTestPackageArgs::from_common_args(&args);
        if args.use_run_test_component {
            run_package_args.test_realm_label = Some(TEST_REALM_NAME.to_string());
            run_package_args.use_run_test_component = true;
        }
        if args.component_version == "2" {
            run_package_args.output_directory = outputs
                .ffx_session()
                .map(|session| session.output_dir().to_path_buf());
        }

        let returncode = run_test_package(
            &target,
            outputs.ffx_session(),
            &package,
            &package_name,
            &args.component_version,
            &child_args,
            &run_package_args,
        )?;

        if let Some(server) = test_server {
            server.stop()?;
        }

        if args.code_coverage {
            outputs.fetch_coverage_profiles(&args.code_coverage_dir)?;
        }

        if let Some(summary_output) = &args.test_launcher_summary_output {
            outputs.fetch(TEST_RESULT_FILE, summary_output)?;
        }
        if let Some(script_output) = &args.isolated_script_test_output {
            outputs.fetch(TEST_RESULT_FILE, script_output)?;
        }
        if let Some(perf_output) = &args.isolated_script_test_perf_output {
            outputs.fetch(TEST_PERF_RESULT_FILE, perf_output)?;
        }

        target.borrow_mut().teardown()?;
        Ok(returncode)
    })
}

/// Caps resource use when running on shared test bots.
fn apply_test_bot_overrides(args: &mut CliArgs) {
    if !args.test_launcher_bot_mode {
        return;
    }

    if host_arch() == "arm64" {
        // ARM bots use container-level isolation, so the reported core
        // count reflects physical cores rather than this task's budget.
        args.cpu_cores = args.cpu_cores.min(4);
    }
}

/// Filter files for v2 components are read from the test package itself.
fn map_filter_file_to_package_file(filter_file: &str) -> Result<String> {
    let Some(idx) = filter_file.find(FILTER_DIR) else {
        return Err(ValidationError(
            "v2 tests only support registered filter files present in the test package"
                .to_string(),
        )
        .into());
    };
    Ok(format!("/pkg/{}", &filter_file[idx..]))
}

/// Number of parallel jobs for the test launcher.
///
/// Only forced when the caller asks for it or the test server is in
/// play; the server must be sized to match the launcher's parallelism.
fn test_concurrency(args: &CliArgs) -> Option<u32> {
    if let Some(jobs) = args.test_launcher_jobs {
        Some(jobs)
    } else if args.enable_test_server {
        if args.device == "device" {
            Some(DEFAULT_TEST_SERVER_CONCURRENCY)
        } else {
            Some(args.cpu_cores)
        }
    } else {
        None
    }
}

/// Translates launcher flags into arguments for the test process.
fn build_child_args(args: &CliArgs, test_concurrency: Option<u32>) -> Vec<String> {
    let mut child_args = Vec::new();
    if let Some(shard_index) = args.test_launcher_shard_index {
        child_args.push(format!("--test-launcher-shard-index={shard_index}"));
    }
    if let Some(total_shards) = args.test_launcher_total_shards {
        child_args.push(format!("--test-launcher-total-shards={total_shards}"));
    }
    if args.single_process_tests {
        child_args.push("--single-process-tests".to_string());
    }
    if args.test_launcher_bot_mode {
        child_args.push("--test-launcher-bot-mode".to_string());
    }
    if let Some(batch_limit) = args.test_launcher_batch_limit {
        child_args.push(format!("--test-launcher-batch-limit={batch_limit}"));
    }
    if let Some(concurrency) = test_concurrency {
        child_args.push(format!("--test-launcher-jobs={concurrency}"));
    }
    if let Some(print_stdio) = &args.test_launcher_print_test_stdio {
        child_args.push(format!("--test-launcher-print-test-stdio={print_stdio}"));
    }

    if let Some(gtest_filter) = &args.gtest_filter {
        child_args.push(format!("--gtest_filter={gtest_filter}"));
    }
    if let Some(gtest_repeat) = &args.gtest_repeat {
        child_args.push(format!("--gtest_repeat={gtest_repeat}"));
        child_args.push("--test-launcher-timeout=-1".to_string());
    }
    if let Some(retry_limit) = &args.test_launcher_retry_limit {
        child_args.push(format!("--test-launcher-retry-limit={retry_limit}"));
    }
    if args.gtest_break_on_failure {
        child_args.push("--gtest_break_on_failure".to_string());
    }
    if args.gtest_also_run_disabled_tests {
        child_args.push("--gtest_also_run_disabled_tests".to_string());
    }

    if let Some(extra_args) = &args.child_arg {
        child_args.extend(extra_args.iter().cloned());
    }
    child_args.extend(args.child_args.iter().cloned());

    debug!("Child args: {child_args:?}");
    child_args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner_errors::EXIT_CODE_VALIDATION;

    fn base_args() -> CliArgs {
        CliArgs {
            component_version: "1".to_string(),
            device: "emulator".to_string(),
            cpu_cores: 8,
            use_run_test_component: true,
            code_coverage_dir: ".".into(),
            ..CliArgs::default()
        }
    }

    #[test]
    fn missing_out_dir_is_a_validation_error() {
        let exit_code = run(base_args());
        assert_eq!(exit_code, EXIT_CODE_VALIDATION);
    }

    #[test]
    fn coverage_without_test_component_is_rejected() {
        let mut args = base_args();
        args.out_dir = Some("out/device".into());
        args.code_coverage = true;
        args.use_run_test_component = false;
        let exit_code = run(args);
        assert_eq!(exit_code, EXIT_CODE_VALIDATION);
    }

    #[test]
    fn filter_files_must_be_registered_for_v2() {
        let err = map_filter_file_to_package_file("somewhere/else/filter.txt").unwrap_err();
        assert!(err.to_string().contains("registered filter files"));

        let mapped =
            map_filter_file_to_package_file("../../testing/buildbot/filters/base.filter").unwrap();
        assert_eq!(mapped, "/pkg/testing/buildbot/filters/base.filter");
    }

    #[test]
    fn shards_and_jobs_come_first_in_child_args() {
        let mut args = base_args();
        args.test_launcher_shard_index = Some(1);
        args.test_launcher_total_shards = Some(4);
        args.gtest_filter = Some("Suite.*".to_string());
        let child_args = build_child_args(&args, Some(8));
        assert_eq!(
            child_args,
            vec![
                "--test-launcher-shard-index=1",
                "--test-launcher-total-shards=4",
                "--test-launcher-jobs=8",
                "--gtest_filter=Suite.*",
            ]
        );
    }

    #[test]
    fn gtest_repeat_disables_launcher_timeout() {
        let mut args = base_args();
        args.gtest_repeat = Some("10".to_string());
        let child_args = build_child_args(&args, None);
        assert!(child_args.contains(&"--gtest_repeat=10".to_string()));
        assert!(child_args.contains(&"--test-launcher-timeout=-1".to_string()));
    }

    #[test]
    fn explicit_jobs_win_over_server_sizing() {
        let mut args = base_args();
        args.test_launcher_jobs = Some(2);
        args.enable_test_server = true;
        assert_eq!(test_concurrency(&args), Some(2));
    }

    #[test]
    fn server_sizing_depends_on_device_kind() {
        let mut args = base_args();
        args.enable_test_server = true;
        args.device = "device".to_string();
        assert_eq!(test_concurrency(&args), Some(DEFAULT_TEST_SERVER_CONCURRENCY));
        args.device = "emulator".to_string();
        assert_eq!(test_concurrency(&args), Some(8));
    }

    #[test]
    fn no_concurrency_without_jobs_or_server() {
        let args = base_args();
        assert_eq!(test_concurrency(&args), None);
    }

    #[test]
    fn bot_mode_caps_cores_on_arm_hosts() {
        let mut args = base_args();
        args.test_launcher_bot_mode = true;
        apply_test_bot_overrides(&mut args);
        if host_arch() == "arm64" {
            assert_eq!(args.cpu_cores, 4);
        } else {
            assert_eq!(args.cpu_cores, 8);
        }
    }

    #[test]
    fn child_arg_flags_precede_positionals() {
        let mut args = base_args();
        args.child_arg = Some(vec!["--from-flag".to_string()]);
        args.child_args = vec!["positional".to_string()];
        let child_args = build_child_args(&args, None);
        assert_eq!(child_args, vec!["--from-flag", "positional"]);
    }
}
