use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn qory(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qory"))
        .args(args)
        .env("QORY_HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_BASE_URL")
        .output()
        .expect("Failed to run qory")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    let output = qory(home.path(), &["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_config_round_trip() {
    let home = TempDir::new().unwrap();

    let output = qory(home.path(), &["--config", "model", "get"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "No value for model\n");

    let output = qory(home.path(), &["--config", "model", "set", "gpt-4o"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(std::fs::read_to_string(home.path().join("model")).unwrap(), "gpt-4o");

    let output = qory(home.path(), &["--config", "model", "get"]);
    assert_eq!(stdout(&output), "gpt-4o\n");

    let output = qory(home.path(), &["--config", "model", "unset"]);
    assert!(output.status.success());
    assert!(!home.path().join("model").exists());
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let home = TempDir::new().unwrap();
    let output = qory(home.path(), &["--config", "base-url", "set", "http://localhost:8080"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("must end with a '/'"));
    assert!(!home.path().join("base_url").exists());
}

#[test]
fn test_query_without_model_fails() {
    let home = TempDir::new().unwrap();
    let output = qory(home.path(), &["what", "is", "rust?"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("model is not set"));
    assert!(stdout(&output).is_empty());

    // Words matching an action name are still query text
    let output = qory(home.path(), &["history", "of", "rome"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("model is not set"));
}

#[test]
fn test_history() {
    let home = TempDir::new().unwrap();

    let output = qory(home.path(), &["--history"]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());

    std::fs::write(
        home.path().join("sessions").join("work"),
        r#"{"messages":[{"role":"user","content":"hi\n"},{"role":"assistant","content":"hello"}]}"#,
    )
    .unwrap();

    let output = qory(home.path(), &["--history"]);
    let listing = stdout(&output);
    assert!(listing.starts_with("=== work ("));
    assert!(listing.ends_with(") ===\nhi\n"));

    let output = qory(home.path(), &["--history", "work"]);
    assert_eq!(
        stdout(&output),
        "=== USER ===\nhi\n\n=== ASSISTANT ===\nhello\n"
    );
}

#[test]
fn test_history_errors() {
    let home = TempDir::new().unwrap();

    let output = qory(home.path(), &["--history", "../etc"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("invalid session id"));

    let output = qory(home.path(), &["--history", "missing"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unknown session id 'missing'"));
}
