#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the catalog-server binary.

use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn run_catalog_server(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_catalog-server"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute catalog-server")
}

fn write_config(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write config file");
    path.to_str().unwrap().to_owned()
}

#[test]
fn help_lists_subcommands_and_options() {
    let output = run_catalog_server(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("check"));
    assert!(stdout.contains("--config"));
    assert!(stdout.contains("--print-config"));
}

#[test]
fn version_is_printed() {
    let output = run_catalog_server(&["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("catalog-server"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_subcommand_fails() {
    let output = run_catalog_server(&["invalid-command"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "{stderr}");
}

#[test]
fn missing_config_file_fails() {
    let output = run_catalog_server(&["-c", "/nonexistent/catalog.yaml", "check"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "{stderr}");
}

#[test]
fn invalid_yaml_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "invalid.yaml", "invalid: yaml: content: [unclosed");

    let output = run_catalog_server(&["--config", &path, "check"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parse"), "{stderr}");
}

#[test]
fn unknown_config_key_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "unknown.yaml", "modules:\n  foo: {}\n");

    let output = run_catalog_server(&["--config", &path, "check"]);
    assert!(!output.status.success());
}

#[test]
fn check_accepts_valid_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "valid.yaml",
        r#"
server:
  bind_addr: 127.0.0.1:0
logging:
  level: error
catalog:
  storage:
    backend: database
    dsn: "sqlite::memory:"
"#,
    );

    let output = run_catalog_server(&["--config", &path, "check"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Configuration is valid"));
}

#[test]
fn run_rejects_invalid_bind_address() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "bad_addr.yaml", "server:\n  bind_addr: nowhere\n");

    let output = run_catalog_server(&["--config", &path, "run"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("address"), "{stderr}");
}

#[test]
fn print_config_is_yaml_with_overrides_applied() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "print.yaml",
        r"
catalog:
  storage:
    backend: database
    dsn: postgres://catalog:hunter2@db/catalog
",
    );

    let output = run_catalog_server(&["--config", &path, "--port", "9191", "--print-config"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("9191"), "{stdout}");
    assert!(!stdout.contains("hunter2"), "{stdout}");

    let parsed: serde_json::Value = serde_saphyr::from_str(&stdout).expect("valid YAML");
    assert!(parsed["server"]["bind_addr"].is_string());
}

#[test]
fn mock_flag_selects_sqlite_memory() {
    let output = run_catalog_server(&["--mock", "--print-config"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sqlite::memory:"), "{stdout}");
}
