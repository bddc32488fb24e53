//! CLI integration tests for the Ymir command-line interface.
//!
//! These tests cover help output, argument parsing and configuration
//! display. None of them start the server.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "APP_URL",
    "AUTH_URL",
    "SESSION_SECRET",
    "DLAI_OAUTH_CLIENT_ID",
    "DLAI_OAUTH_CLIENT_SECRET",
    "DLAI_API_URL",
    "YMIR_BIND",
    "YMIR_LOGOUT_STRATEGY",
    "YMIR_SECURE_COOKIES",
];

/// A `ymir` command isolated from the user's config and environment.
fn ymir(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ymir").unwrap();
    cmd.current_dir(dir.path()).env("YMIR_CONFIG_DIR", dir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn complete_env(cmd: &mut Command) -> &mut Command {
    cmd.env("APP_URL", "http://localhost:3000")
        .env("AUTH_URL", "https://auth.example.com")
        .env("SESSION_SECRET", "super-secret-session-value-0123456789")
        .env("DLAI_OAUTH_CLIENT_ID", "ymir-client")
        .env("DLAI_OAUTH_CLIENT_SECRET", "super-secret-client-value")
}

#[test]
fn test_help_displays() {
    let dir = TempDir::new().unwrap();
    ymir(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ymir"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    ymir(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ymir"));
}

#[test]
fn test_start_help_lists_overrides() {
    let dir = TempDir::new().unwrap();
    ymir(&dir)
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_unknown_command_fails() {
    let dir = TempDir::new().unwrap();
    ymir(&dir).arg("frobnicate").assert().failure();
}

#[test]
fn test_config_shows_resolved_values_redacted() {
    let dir = TempDir::new().unwrap();
    let mut cmd = ymir(&dir);
    complete_env(&mut cmd)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("app_url          = http://localhost:3000"))
        .stdout(predicate::str::contains("client_id        = ymir-client"))
        .stdout(predicate::str::contains("logout_strategy  = sign-out-page"))
        .stdout(predicate::str::contains("https://platform-api-dev.dlai.link"))
        .stdout(predicate::str::contains("<redacted>"))
        .stdout(predicate::str::contains("super-secret").not());
}

#[test]
fn test_config_reads_project_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("ymir.toml"),
        r#"
[server]
bind = "0.0.0.0:8088"

[auth]
logout_strategy = "end-session"
"#,
    )
    .unwrap();

    let mut cmd = ymir(&dir);
    complete_env(&mut cmd)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ loaded"))
        .stdout(predicate::str::contains("bind_address     = 0.0.0.0:8088"))
        .stdout(predicate::str::contains("logout_strategy  = end-session"));
}

#[test]
fn test_config_missing_secret_fails() {
    let dir = TempDir::new().unwrap();
    ymir(&dir)
        .env("APP_URL", "http://localhost:3000")
        .env("AUTH_URL", "https://auth.example.com")
        .env("DLAI_OAUTH_CLIENT_ID", "ymir-client")
        .env("DLAI_OAUTH_CLIENT_SECRET", "client-secret")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("session_secret"))
        .stderr(predicate::str::contains("SESSION_SECRET"));
}

#[test]
fn test_start_without_config_fails() {
    let dir = TempDir::new().unwrap();
    ymir(&dir)
        .arg("start")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required field"));
}
