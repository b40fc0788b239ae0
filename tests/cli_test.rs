use assert_cmd::Command;

// Validation failures must surface before any connection is attempted,
// so these run without a device.

#[test]
fn help_lists_the_launcher_flags() {
    let mut cmd = Command::cargo_bin("devicetest").unwrap();
    let result = cmd.arg("--help").assert();

    result
        .success()
        .stdout(predicates::str::contains("--out-dir"))
        .stdout(predicates::str::contains("--component-version"))
        .stdout(predicates::str::contains("--test-launcher-summary-output"))
        .stdout(predicates::str::contains("--code-coverage"));
}

#[test]
fn missing_out_dir_exits_with_usage_code() {
    let mut cmd = Command::cargo_bin("devicetest").unwrap();
    cmd.env("RUST_LOG", "error")
        .assert()
        .code(64);
}

#[test]
fn coverage_without_test_component_exits_with_usage_code() {
    let mut cmd = Command::cargo_bin("devicetest").unwrap();
    cmd.args([
        "--out-dir",
        "out/device",
        "--package",
        "out/device/base_unittests.far",
        "--package-name",
        "base_unittests",
        "--code-coverage",
        "--use-run",
    ])
    .env("RUST_LOG", "error")
    .assert()
    .code(64);
}

#[test]
fn unknown_stdio_choice_is_rejected_by_the_parser() {
    let mut cmd = Command::cargo_bin("devicetest").unwrap();
    cmd.args(["--test-launcher-print-test-stdio", "sometimes"])
        .assert()
        .failure()
        .code(2);
}
