use std::{
    fs,
    io::Write,
    process::{Command, Stdio},
};

use crate::common::{fixture, BINARY_PATH};

#[test]
fn help_lists_subcommands() {
    let output = Command::new(BINARY_PATH)
        .arg("--help")
        .output()
        .expect("process should start");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for needle in ["run", "init", "version", "--config", "--verbosity"] {
        assert!(stdout.contains(needle), "help should mention {needle}: {stdout}");
    }
}

#[test]
fn version_prints_json() {
    let output = Command::new(BINARY_PATH)
        .arg("version")
        .output()
        .expect("process should start");

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("version output is JSON");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn run_without_config_file_points_to_init() {
    let home = tempfile::tempdir().expect("can create temporary home");
    let missing = home.path().join("missing.yaml");

    let output = Command::new(BINARY_PATH)
        .env("HOME", home.path())
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&missing)
        .arg("run")
        .output()
        .expect("process should start");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Run occ init to create one."),
        "stderr: {stderr}"
    );
}

#[test]
fn invalid_config_is_reported() {
    let home = tempfile::tempdir().expect("can create temporary home");

    let output = Command::new(BINARY_PATH)
        .env("HOME", home.path())
        .arg(format!(
            "--config={}",
            fixture("tests/fixtures/config_relative_ops_utils.yaml")
        ))
        .arg("run")
        .output()
        .expect("process should start");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ops_utils_dir"), "stderr: {stderr}");
}

#[test]
fn init_writes_config_from_stdin() {
    let home = tempfile::tempdir().expect("can create temporary home");
    let config_path = home.path().join(".config/occ/config.yaml");

    let mut child = Command::new(BINARY_PATH)
        .env("HOME", home.path())
        .arg("init")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("process should start");
    child
        .stdin
        .take()
        .expect("child stdin")
        .write_all(b"alice\ntoken-123\n\n")
        .expect("can answer prompts");
    let output = child.wait_with_output().expect("process should finish");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Config file has been written to"), "{stdout}");
    let written = fs::read_to_string(&config_path).expect("config should be written");
    assert!(written.contains("ocm_user: alice"));
    assert!(written.contains("offline_access_token: token-123"));
}
