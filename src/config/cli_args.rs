use clap::Parser;
use std::path::PathBuf;

// devicetest - deploy and run a test package on a remote embedded-OS target
#[derive(Parser, Debug, Default)]
#[clap(
    name = "devicetest",
    version,
    about = "Deploys and runs a test package on a remote embedded-OS target",
    after_help = "COMPONENT VERSIONS:\n  --component-version 1  Legacy components; artifacts land in the shared /tmp area\n  --component-version 2  Modern components; artifacts are staged through an ffx session\n\nEXAMPLES:\n  devicetest --out-dir out/device --package out/device/base_unittests.far \\\n      --package-name base_unittests --test-launcher-summary-output /tmp/summary.json\n  devicetest --out-dir out/device --package out/device/net_unittests.far \\\n      --package-name net_unittests --component-version 2 --code-coverage"
)]
pub struct CliArgs {
    // Output directory of the build, required for every run
    #[clap(long = "out-dir", help = "Build output directory")]
    pub out_dir: Option<PathBuf>,

    // Path to the test package archive to deploy
    #[clap(long = "package", help = "Path to the test package to deploy")]
    pub package: Option<PathBuf>,

    // Name under which the package runs on the target
    #[clap(long = "package-name", help = "Name of the test package on the target")]
    pub package_name: Option<String>,

    // Component framework generation of the package; "2" selects
    // session-mediated artifact retrieval
    #[clap(
        long = "component-version",
        default_value = "1",
        help = "Component framework version of the test package"
    )]
    pub component_version: String,

    // Device kind - physical device or emulator
    #[clap(
        long = "device",
        default_value = "emulator",
        help = "Target kind: 'device' or 'emulator'"
    )]
    pub device: String,

    // Core count given to the emulator, also used for job sizing
    #[clap(long = "cpu-cores", default_value = "4", help = "CPU cores assigned to the emulator")]
    pub cpu_cores: u32,

    // Target connection configuration file
    #[clap(long = "target-config", help = "Target connection configuration file")]
    pub target_config: Option<PathBuf>,

    // Runner configuration file (path conventions, strictness)
    #[clap(long = "runner-config", help = "Runner configuration file")]
    pub runner_config: Option<PathBuf>,

    #[clap(short = 'v', long = "verbose", help = "Enable verbose logging")]
    pub verbose: bool,

    #[clap(short = 'q', long = "quiet", help = "Suppress non-essential output")]
    pub quiet: bool,

    #[clap(long = "gtest_filter", help = "GTest filter to use in place of any default")]
    pub gtest_filter: Option<String>,

    // Repeat also disables the launcher timeout
    #[clap(
        long = "gtest_repeat",
        help = "GTest repeat value; also disables the test launcher timeout"
    )]
    pub gtest_repeat: Option<String>,

    #[clap(
        long = "test-launcher-retry-limit",
        help = "Number of times the suite retries failing tests; multiplicative with --gtest_repeat"
    )]
    pub test_launcher_retry_limit: Option<String>,

    #[clap(
        long = "test-launcher-print-test-stdio",
        value_parser = ["auto", "always", "never"],
        help = "Controls when full test output is printed; auto prints it on failure"
    )]
    pub test_launcher_print_test_stdio: Option<String>,

    #[clap(
        long = "test-launcher-shard-index",
        env = "GTEST_SHARD_INDEX",
        help = "Index of this instance amongst swarming shards"
    )]
    pub test_launcher_shard_index: Option<u32>,

    #[clap(
        long = "test-launcher-total-shards",
        env = "GTEST_TOTAL_SHARDS",
        help = "Total number of swarming shards of this suite"
    )]
    pub test_launcher_total_shards: Option<u32>,

    #[clap(
        long = "gtest_break_on_failure",
        help = "Break on failure; useful with --gtest_repeat"
    )]
    pub gtest_break_on_failure: bool,

    #[clap(
        long = "single-process-tests",
        help = "Run the tests and the launcher in the same process; useful for debugging"
    )]
    pub single_process_tests: bool,

    #[clap(
        long = "test-launcher-batch-limit",
        help = "Limit of tests batched into a single process"
    )]
    pub test_launcher_batch_limit: Option<u32>,

    // Specified relative to --out-dir, so it stays a plain string
    #[clap(
        long = "test-launcher-filter-file",
        help = "Filter file(s) passed to the target test process; separate multiple files with ';'"
    )]
    pub test_launcher_filter_file: Option<String>,

    #[clap(long = "test-launcher-jobs", help = "Number of parallel test jobs")]
    pub test_launcher_jobs: Option<u32>,

    #[clap(
        long = "test-launcher-summary-output",
        help = "Host path where the test launcher writes its JSON summary"
    )]
    pub test_launcher_summary_output: Option<PathBuf>,

    #[clap(long = "enable-test-server", help = "Enable the test server spawner")]
    pub enable_test_server: bool,

    #[clap(
        long = "test-launcher-bot-mode",
        help = "Enable special allowances for running on a test bot"
    )]
    pub test_launcher_bot_mode: bool,

    #[clap(
        long = "isolated-script-test-output",
        help = "If present, store test results on this path"
    )]
    pub isolated_script_test_output: Option<PathBuf>,

    #[clap(
        long = "isolated-script-test-perf-output",
        help = "If present, store chartjson results on this path"
    )]
    pub isolated_script_test_perf_output: Option<PathBuf>,

    // --use-run opts out of hermetic execution under a test realm
    #[clap(
        long = "use-run",
        action = clap::ArgAction::SetFalse,
        help = "Run the package with plain run rather than hermetically with run-test-component"
    )]
    pub use_run_test_component: bool,

    #[clap(
        long = "code-coverage",
        help = "Gather code coverage information and place it in the coverage directory"
    )]
    pub code_coverage: bool,

    #[clap(
        long = "code-coverage-dir",
        default_value = ".",
        help = "Directory for code coverage information; only relevant with --code-coverage"
    )]
    pub code_coverage_dir: PathBuf,

    #[clap(
        long = "child-arg",
        allow_hyphen_values = true,
        help = "Extra argument for the test process; repeatable"
    )]
    pub child_arg: Option<Vec<String>>,

    #[clap(long = "gtest_also_run_disabled_tests", help = "Run tests prefixed with DISABLED_")]
    pub gtest_also_run_disabled_tests: bool,

    // Trailing arguments forwarded to the test process
    #[clap(help = "Arguments for the test process")]
    pub child_args: Vec<String>,
}

impl CliArgs {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get log level
    pub fn get_log_level(&self) -> &str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
