use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("revq").unwrap();
    // Keep host credentials out of the tests.
    cmd.env_remove("AZURE_DEVOPS_PAT");
    cmd.env_remove("GITHUB_PAT");
    cmd
}

// --- Help & version ---

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("review comments"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("revq"));
}

#[test]
fn status_help() {
    cmd()
        .args(["status", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("THREAD_ID"));
}

// --- Status mutator ---

#[test]
fn status_set_writes_status_file() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["status", "87663", "4501", "COMPLETED", "--note", "fixed in abc123"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "updated thread #4501 to [COMPLETED - fixed in abc123]",
        ));

    let content = fs::read_to_string(tmp.path().join("pr-87663-status.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["pr_number"], 87663);
    assert_eq!(value["threads"]["4501"]["status"], "COMPLETED");
    assert_eq!(value["threads"]["4501"]["note"], "fixed in abc123");
}

#[test]
fn status_clear_removes_record() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().to_str().unwrap();
    cmd()
        .args(["--dir", dir, "status", "87663", "4501", "SKIPPED"])
        .assert()
        .success();
    cmd()
        .args(["--dir", dir, "status", "87663", "4501", "--clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cleared stored status for thread #4501"));

    let content = fs::read_to_string(tmp.path().join("pr-87663-status.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(value["threads"].as_object().unwrap().is_empty());
}

#[test]
fn status_clear_without_record_is_a_noop() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["status", "87663", "4501", "--clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("thread #4501 had no stored status"));
    assert!(!tmp.path().join("pr-87663-status.json").exists());
}

#[test]
fn status_github_node_id_accepted() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap(), "--platform", "github"])
        .args(["status", "5", "PRRT_kwDOAbc123", "IN_PROGRESS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("updated thread #PRRT_kwDOAbc123"));
}

// --- Status mutator validation ---

#[test]
fn status_invalid_value_rejected_and_nothing_written() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["status", "87663", "4501", "DONE"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid status 'DONE'"))
        .stderr(predicate::str::contains("COMPLETED"));
    assert!(!tmp.path().join("pr-87663-status.json").exists());
}

#[test]
fn status_malformed_thread_id_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["status", "87663", "not-a-number", "COMPLETED"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid thread id 'not-a-number'"))
        .stderr(predicate::str::contains("numeric"));
}

#[test]
fn status_and_clear_conflict() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["status", "87663", "4501", "COMPLETED", "--clear"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("usage error"));
}

#[test]
fn status_without_value_or_clear() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["status", "87663", "4501"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("a status is required"));
}

#[test]
fn status_missing_thread_id_is_a_clap_error() {
    cmd()
        .args(["status", "87663"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("THREAD_ID"));
}

// --- Corrupt state ---

#[test]
fn corrupt_status_file_is_reported_and_preserved() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("pr-87663-status.json");
    fs::write(&path, "{ not json !!").unwrap();

    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["status", "87663", "4501", "COMPLETED"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("corrupt status file"))
        .stderr(predicate::str::contains("pr-87663-status.json"));

    assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json !!");
}

// --- Config errors ---

#[test]
fn unknown_platform_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap(), "--platform", "bitbucket"])
        .args(["status", "1", "2", "COMPLETED"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown platform: bitbucket"));
}

#[test]
fn config_file_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["--config", "/nonexistent/config.toml"])
        .args(["status", "1", "2", "COMPLETED"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn invalid_toml_config() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg_dir = tmp.path().join(".revq");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("config.toml"), "not valid {{{{ toml").unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["status", "1", "2", "COMPLETED"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn unknown_config_field_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg_dir = tmp.path().join(".revq");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("config.toml"), "bogus = \"value\"\n").unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["status", "1", "2", "COMPLETED"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown field"));
}

#[test]
fn config_platform_governs_id_validation() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg_dir = tmp.path().join(".revq");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("config.toml"), "platform = \"github\"\n").unwrap();
    // A GraphQL node id passes under the configured platform.
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["status", "5", "PRRT_abc", "COMPLETED"])
        .assert()
        .success();
}

// --- Token diagnostics ---

#[test]
fn token_from_env_is_masked() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap(), "token"])
        .env("AZURE_DEVOPS_PAT", "abcdefghij0123456789")
        .assert()
        .success()
        .stdout(predicate::str::contains("environment variable (AZURE_DEVOPS_PAT)"))
        .stdout(predicate::str::contains("abcd...6789"))
        .stdout(predicate::str::contains("abcdefghij0123456789").not());
}

#[test]
fn token_missing_everywhere_fails() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap(), "token"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no usable token"))
        .stderr(predicate::str::contains("AZURE_DEVOPS_PAT"));
}

// --- Network commands stay offline-safe ---

#[test]
fn review_without_token_fails_before_any_fetch() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["review", "87663"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no usable token"));
    // No status file appears from a failed fetch path.
    assert!(!tmp.path().join("pr-87663-status.json").exists());
}

#[test]
fn review_with_token_but_no_repo_config_fails() {
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .args(["--dir", tmp.path().to_str().unwrap()])
        .args(["review", "87663"])
        .env("AZURE_DEVOPS_PAT", "abcdefghij0123456789")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing [azure] config"));
}
