//! Integration tests for the gatekeep CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
[checks.echo-ok]
description = "Always passes"
command = "sh"
args = ["-c", "exit 0"]
file_patterns = ["*.txt"]

[checks.always-fail]
enabled = false
command = "sh"
args = ["-c", "echo broken; exit 3"]
"#;

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("gatekeep.toml"), CONFIG).unwrap();
    fs::write(dir.path().join("notes.txt"), "hello\n").unwrap();
    dir
}

fn gatekeep(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gatekeep").unwrap();
    cmd.current_dir(dir)
        .env_remove("SKIP")
        .env_remove("GATEKEEP_SKIP")
        .env_remove("RUST_LOG");
    cmd
}

fn write_plugin(dir: &Path, manifest: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("plugin.yaml"), manifest).unwrap();
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("gatekeep").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("pre-commit"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("gatekeep").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gatekeep"));
}

#[test]
fn test_invalid_subcommand() {
    let mut cmd = Command::cargo_bin("gatekeep").unwrap();
    cmd.arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[cfg(unix)]
#[test]
fn test_run_passing_checks() {
    let dir = project();
    gatekeep(dir.path())
        .args(["run", "-f", "notes.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("echo-ok"))
        .stdout(predicate::str::contains("1 passed, 0 failed"));
}

#[cfg(unix)]
#[test]
fn test_run_disabled_check_by_name_fails() {
    let dir = project();
    gatekeep(dir.path())
        .args(["run", "always-fail", "-f", "notes.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("always-fail failed"))
        .stderr(predicate::str::contains("sh exited with status 3"))
        .stderr(predicate::str::contains("broken"));
}

#[test]
fn test_run_unknown_only_name() {
    let dir = project();
    gatekeep(dir.path())
        .args(["run", "--only", "echo-ok,nope", "-f", "notes.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown check 'nope'"));
}

#[test]
fn test_skip_env_var_merges_with_selection() {
    let dir = project();
    gatekeep(dir.path())
        .env("SKIP", "echo-ok")
        .args(["run", "--only", "echo-ok", "-f", "notes.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no checks to run"));
}

#[cfg(unix)]
#[test]
fn test_run_json_report() {
    let dir = project();
    let assert = gatekeep(dir.path())
        .args(["run", "--only", "echo-ok", "-f", "notes.txt", "--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["passed"], 1);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["results"][0]["name"], "echo-ok");
    assert_eq!(report["results"][0]["files"][0], "notes.txt");
}

#[test]
fn test_run_outside_git_without_files() {
    let dir = project();
    gatekeep(dir.path())
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--files"));
}

#[test]
fn test_list_shows_configured_checks() {
    let dir = project();
    gatekeep(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("echo-ok"))
        .stdout(predicate::str::contains("always-fail"))
        .stdout(predicate::str::contains("fmt"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("gatekeep.toml"), "timeout = \"forever\"\n").unwrap();
    gatekeep(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout"));
}

#[test]
fn test_plugin_validate() {
    let dir = TempDir::new().unwrap();
    write_plugin(
        &dir.path().join("good"),
        "name: license\nversion: 1.0.0\ndescription: License headers\nfile_patterns: [\"*.go\"]\nexecutable: check.sh\n",
    );
    write_plugin(&dir.path().join("bad"), "name: bad\nversion: 1.0.0\n");

    gatekeep(dir.path())
        .args(["plugin", "validate", "good"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Plugin 'license' is valid"));

    gatekeep(dir.path())
        .args(["plugin", "validate", "bad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'executable' is required"));
}

#[test]
fn test_plugin_info() {
    let dir = project();
    write_plugin(
        &dir.path().join(".pre-commit-plugins").join("license"),
        "name: license\nversion: 2.1.0\ndescription: License headers\nauthor: Tools Team\nfile_patterns: [\"*.go\"]\nexecutable: check.sh\nargs: [\"--strict\"]\n",
    );

    gatekeep(dir.path())
        .args(["plugin", "info", "license"])
        .assert()
        .success()
        .stdout(predicate::str::contains("license"))
        .stdout(predicate::str::contains("v2.1.0"))
        .stdout(predicate::str::contains("Tools Team"))
        .stdout(predicate::str::contains("check.sh --strict"));

    gatekeep(dir.path())
        .args(["plugin", "info", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("plugin 'missing' not found"));
}

#[test]
fn test_plugin_list_warns_about_duplicates() {
    let dir = project();
    let manifest = "name: same\nversion: 1.0.0\ndescription: Twin\nfile_patterns: [\"*.go\"]\nexecutable: check.sh\n";
    let plugins = dir.path().join(".pre-commit-plugins");
    write_plugin(&plugins.join("a"), manifest);
    write_plugin(&plugins.join("b"), manifest);

    gatekeep(dir.path())
        .args(["plugin", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("same"))
        .stdout(predicate::str::contains("duplicate plugin name 'same'"));
}

#[cfg(unix)]
#[test]
fn test_run_plugin_check() {
    let dir = project();
    fs::write(
        dir.path().join("gatekeep.toml"),
        format!("{CONFIG}\n[plugins]\nenabled = true\ndirectory = \"plugins\"\n"),
    )
    .unwrap();
    let plugin_dir = dir.path().join("plugins").join("word-count");
    write_plugin(
        &plugin_dir,
        "name: word-count\nversion: 1.0.0\ndescription: Counts words\nfile_patterns: [\"*.txt\"]\nexecutable: /bin/sh\nargs: [\"check.sh\"]\n",
    );
    fs::write(
        plugin_dir.join("check.sh"),
        "cat > /dev/null\necho '{\"success\": false, \"error\": \"too many words\", \"suggestion\": \"write less\"}'\n",
    )
    .unwrap();

    gatekeep(dir.path())
        .args(["run", "--only", "word-count", "-f", "notes.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("too many words"))
        .stderr(predicate::str::contains("write less"));
}

#[test]
fn test_install_requires_git_repository() {
    let dir = TempDir::new().unwrap();
    gatekeep(dir.path())
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not inside a Git repository"));
}

#[test]
fn test_install_and_uninstall_hook() {
    let dir = TempDir::new().unwrap();
    git2::Repository::init(dir.path()).unwrap();

    gatekeep(dir.path()).arg("install").assert().success();
    let hook = dir.path().join(".git").join("hooks").join("pre-commit");
    assert!(fs::read_to_string(&hook).unwrap().contains("gatekeep run"));

    gatekeep(dir.path()).arg("uninstall").assert().success();
    assert!(!hook.exists());
}
