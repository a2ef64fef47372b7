//! End-to-end tests for the rbac-sync binary.
//!
//! These tests use assert_cmd to run the compiled binary against temporary
//! desired-state files and, for `sync`, a wiremock stand-in for the
//! directory.

use assert_cmd::Command;
use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use rbac_test_utils::ConfigDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SETTINGS_VARIABLES: &[&str] = &[
    "TENANT_ID",
    "BACKEND_CLIENT_ID",
    "BACKEND_CLIENT_SECRET",
    "LOGTO_BASE_URL",
    "API_BASE_URL",
    "TENANT_DOMAIN",
    "RBAC_CONFIG",
    "RUST_LOG",
];

/// A Command for the rbac-sync binary with a clean settings environment,
/// running inside `dir`.
fn rbac_cmd(dir: &ConfigDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rbac-sync"));
    cmd.current_dir(dir.root());
    for var in SETTINGS_VARIABLES {
        cmd.env_remove(var);
    }
    cmd
}

// ============================================================================
// Help and Version
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let dir = ConfigDir::new();
    rbac_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_sync_help_lists_flags() {
    let dir = ConfigDir::new();
    rbac_cmd(&dir)
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--cleanup"))
        .stdout(predicate::str::contains("--skip-permissions"));
}

#[test]
fn test_version_output() {
    let dir = ConfigDir::new();
    rbac_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rbac-sync"));
}

// ============================================================================
// Validate
// ============================================================================

#[test]
fn test_validate_sample_config() {
    let dir = ConfigDir::new().with_sample_config();
    rbac_cmd(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("sample-tenant"))
        .stdout(predicate::str::contains("2 resources (3 scopes)"))
        .stdout(predicate::str::contains("Configuration is valid."));
}

#[test]
fn test_validate_with_explicit_config_path() {
    let dir = ConfigDir::new();
    dir.write("conf/rbac.yml", rbac_test_utils::SAMPLE_CONFIG);
    rbac_cmd(&dir)
        .args(["validate", "--config", "conf/rbac.yml"])
        .assert()
        .success();
}

#[test]
fn test_validate_missing_config_fails() {
    let dir = ConfigDir::new();
    rbac_cmd(&dir)
        .arg("validate")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("Configuration not found"));
}

#[test]
fn test_validate_reports_unknown_permission() {
    let dir = ConfigDir::new();
    dir.write(
        "config.yml",
        r#"
metadata:
  name: broken
  version: "1.0"
user_roles:
  - id: support
    name: Support
    permissions:
      - id: "frobnicate:widgets"
"#,
    );
    rbac_cmd(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration validation failed"))
        .stderr(predicate::str::contains("frobnicate:widgets"));
}

// ============================================================================
// Sync
// ============================================================================

#[test]
fn test_sync_requires_credentials() {
    let dir = ConfigDir::new().with_sample_config();
    rbac_cmd(&dir)
        .args(["sync", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Missing required environment variables: TENANT_ID",
        ));
}

#[test]
fn test_sync_reads_credentials_from_env_file() {
    let dir = ConfigDir::new().with_sample_config();
    dir.write(
        "tenant.env",
        "TENANT_ID=acme\nBACKEND_CLIENT_ID=client\nBACKEND_CLIENT_SECRET=secret\nLOGTO_BASE_URL=http://127.0.0.1:9\n",
    );
    // Credentials load, so the failure moves on to the connection check
    rbac_cmd(&dir)
        .args(["--env-file", "tenant.env", "sync", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to connect to the directory"));
}

async fn directory_stub() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oidc/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "test-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_dry_run_renders_json() {
    let server = directory_stub().await;
    let dir = ConfigDir::new().with_sample_config();

    let mut cmd = rbac_cmd(&dir);
    cmd.args(["sync", "--dry-run", "--output", "json"])
        .env("TENANT_ID", "acme")
        .env("BACKEND_CLIENT_ID", "client")
        .env("BACKEND_CLIENT_SECRET", "secret")
        .env("LOGTO_BASE_URL", server.uri());

    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    output.assert().success();

    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["dry_run"], true);
    assert_eq!(result["success"], true);
    assert_eq!(result["operations"].as_array().unwrap().len(), 0);

    // Only the token exchange and the connection check reached the directory
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() != "POST" || r.url.path() == "/oidc/token"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_rejected_credentials_fail_before_reconciling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oidc/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;
    let dir = ConfigDir::new().with_sample_config();

    let mut cmd = rbac_cmd(&dir);
    cmd.args(["sync"])
        .env("TENANT_ID", "acme")
        .env("BACKEND_CLIENT_ID", "client")
        .env("BACKEND_CLIENT_SECRET", "wrong")
        .env("LOGTO_BASE_URL", server.uri());

    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    output
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to connect to the directory"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() == "/oidc/token"));
}
