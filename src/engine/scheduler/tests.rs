use super::*;
use crate::engine::check::CommandTemplate;
use crate::plugins::{DEFAULT_PLUGIN_TIMEOUT, Plugin, PluginManifest};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn shell_check(name: &str, script: &str) -> Check {
    Check::builtin(name, CommandTemplate::new("sh").args(["-c", script])).requires_files(false)
}

fn policy<'a>(root: &'a Path, cancel: &'a CancellationToken) -> RunPolicy<'a> {
    RunPolicy {
        root,
        parallelism: 0,
        fail_fast: false,
        graceful_degradation: false,
        debug_timeout_detail: false,
        timeout_override: None,
        cancel,
    }
}

fn names(report: &RunReport) -> Vec<&str> {
    report.results.iter().map(|r| r.name.as_str()).collect()
}

/// Progress callback that records every event.
fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let callback: ProgressCallback = Box::new(move |event: &ProgressEvent| {
        sink.lock().unwrap().push(event.clone());
    });
    (callback, events)
}

#[test]
fn test_pool_size() {
    assert_eq!(pool_size(4, 10), 4);
    assert_eq!(pool_size(4, 2), 2);
    assert_eq!(pool_size(1, 0), 1);
    let auto = pool_size(0, 3);
    assert!((1..=3).contains(&auto));
}

#[test]
fn test_report_follows_selection_order_not_completion_order() {
    let checks = [
        shell_check("slow", "sleep 0.4"),
        shell_check("medium", "sleep 0.2"),
        shell_check("fast", "true"),
    ];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    let mut policy = policy(Path::new("."), &cancel);
    policy.parallelism = 3;
    let (callback, events) = recorder();

    let report = run(&selected, &[], &policy, Some(callback)).unwrap();

    assert_eq!(names(&report), vec!["slow", "medium", "fast"]);
    assert_eq!(report.passed, 3);

    let events = events.lock().unwrap();
    let finished: Vec<&str> = events
        .iter()
        .filter(|e| e.status.is_terminal())
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(finished, vec!["fast", "medium", "slow"]);
}

#[test]
fn test_every_dispatched_check_reports_running_then_terminal() {
    let checks = [
        shell_check("a", "true"),
        shell_check("b", "exit 1"),
        shell_check("c", "true"),
    ];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    let (callback, events) = recorder();

    run(&selected, &[], &policy(Path::new("."), &cancel), Some(callback)).unwrap();

    let events = events.lock().unwrap();
    for check in &checks {
        let statuses: Vec<CheckStatus> = events
            .iter()
            .filter(|e| e.name == check.name)
            .map(|e| e.status)
            .collect();
        assert_eq!(statuses.len(), 2, "events for {}: {statuses:?}", check.name);
        assert_eq!(statuses[0], CheckStatus::Running);
        assert!(statuses[1].is_terminal());
    }
    assert!(events.iter().all(|e| e.total == 3));
}

#[test]
fn test_counts_always_add_up() {
    let checks = [
        shell_check("pass", "true"),
        shell_check("fail", "exit 1"),
        Check::builtin("needs-go", CommandTemplate::new("true"))
            .file_patterns(&["*.go"])
            .unwrap(),
    ];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();

    let report = run(&selected, &["README.md".to_string()], &policy(Path::new("."), &cancel), None).unwrap();

    assert_eq!((report.passed, report.failed, report.skipped), (1, 1, 1));
    assert_eq!(report.passed + report.failed + report.skipped, report.results.len());
    assert_eq!(report.results.len(), selected.len());
    assert!(!report.is_success());
}

#[test]
fn test_fail_fast_stops_dispatch_but_reports_every_check() {
    let dir = TempDir::new().unwrap();
    let checks: Vec<Check> = (0..5)
        .map(|i| {
            if i == 1 {
                shell_check("check-1", "exit 1")
            } else {
                shell_check(&format!("check-{i}"), &format!("touch marker-{i}"))
            }
        })
        .collect();
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    let mut policy = policy(dir.path(), &cancel);
    policy.parallelism = 1;
    policy.fail_fast = true;
    let (callback, events) = recorder();

    let report = run(&selected, &[], &policy, Some(callback)).unwrap();

    assert_eq!(report.results.len(), 5);
    assert!(dir.path().join("marker-0").exists());
    for i in 2..5 {
        assert!(!dir.path().join(format!("marker-{i}")).exists(), "check-{i} ran");
        let result = &report.results[i];
        assert!(result.skipped);
        assert!(!result.gracefully_skipped);
        assert!(result.error.is_none());
    }
    assert_eq!((report.passed, report.failed, report.skipped), (1, 1, 3));
    assert!(!cancel.is_cancelled(), "fail-fast must not cancel the caller's token");

    let events = events.lock().unwrap();
    let undispatched: Vec<_> = events.iter().filter(|e| e.index >= 2).collect();
    assert_eq!(undispatched.len(), 3);
    assert!(undispatched.iter().all(|e| e.status == CheckStatus::Skipped));
}

#[test]
fn test_fail_fast_lets_running_checks_finish() {
    let dir = TempDir::new().unwrap();
    let checks = [
        shell_check("slow", "sleep 0.3; touch slow-done"),
        shell_check("boom", "exit 1"),
    ];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    let mut policy = policy(dir.path(), &cancel);
    policy.parallelism = 2;
    policy.fail_fast = true;

    let report = run(&selected, &[], &policy, None).unwrap();

    assert!(dir.path().join("slow-done").exists());
    assert_eq!(report.results[0].outcome(), Outcome::Passed);
    assert_eq!(report.results[1].outcome(), Outcome::Failed);
}

#[test]
fn test_graceful_degradation_skips_missing_tools() {
    let checks = [Check::builtin(
        "gofumpt",
        CommandTemplate::new("gatekeep-missing-tool-for-test")
            .install_hint("go install mvdan.cc/gofumpt@latest"),
    )
    .requires_files(false)];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    let mut policy = policy(Path::new("."), &cancel);

    policy.graceful_degradation = true;
    let report = run(&selected, &[], &policy, None).unwrap();
    let result = &report.results[0];
    assert!(result.success);
    assert!(result.gracefully_skipped);
    assert_eq!(result.outcome(), Outcome::Skipped);
    assert_eq!(
        result.suggestion.as_deref(),
        Some("go install mvdan.cc/gofumpt@latest")
    );
    assert!(report.is_success());

    policy.graceful_degradation = false;
    let report = run(&selected, &[], &policy, None).unwrap();
    let result = &report.results[0];
    assert!(!result.success);
    assert_eq!(result.outcome(), Outcome::Failed);
    assert!(result.error.as_deref().unwrap().contains("not found"));
    assert!(result.suggestion.is_some());
}

#[test]
fn test_graceful_degradation_does_not_hide_real_failures() {
    let checks = [shell_check("lint", "exit 2")];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    let mut policy = policy(Path::new("."), &cancel);
    policy.graceful_degradation = true;

    let report = run(&selected, &[], &policy, None).unwrap();
    assert_eq!(report.results[0].outcome(), Outcome::Failed);
}

#[test]
fn test_file_filter_and_required_files() {
    let check = Check::builtin(
        "go-only",
        CommandTemplate::new("sh").args(["-c", "echo \"$@\"", "sh", "{files}"]),
    )
    .file_patterns(&["*.go"])
    .unwrap();
    let checks = [check];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    let policy = policy(Path::new("."), &cancel);

    let files = vec!["cmd/main.go".to_string(), "README.md".to_string()];
    let report = run(&selected, &files, &policy, None).unwrap();
    let result = &report.results[0];
    assert_eq!(result.outcome(), Outcome::Passed);
    assert_eq!(result.files, vec!["cmd/main.go"]);
    assert_eq!(result.output, "cmd/main.go\n");

    let report = run(&selected, &["README.md".to_string()], &policy, None).unwrap();
    let result = &report.results[0];
    assert!(result.gracefully_skipped);
    assert!(result.success);
    assert!(result.command.is_none(), "check must not be invoked");
}

#[test]
fn test_builtin_timeout_hides_partial_output_unless_debugging() {
    let checks = [shell_check("hang", "echo partial; sleep 10")];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    let mut policy = policy(Path::new("."), &cancel);
    policy.timeout_override = Some(Duration::from_millis(150));

    let started = Instant::now();
    let report = run(&selected, &[], &policy, None).unwrap();
    assert!(started.elapsed() < Duration::from_secs(3));
    let result = &report.results[0];
    assert_eq!(result.outcome(), Outcome::Failed);
    assert_eq!(
        result.error.as_deref(),
        Some("check 'hang' timed out after 150ms")
    );
    assert!(result.output.is_empty());
    assert!(
        result
            .suggestion
            .as_deref()
            .unwrap()
            .starts_with("Consider increasing the timeout")
    );

    policy.debug_timeout_detail = true;
    let report = run(&selected, &[], &policy, None).unwrap();
    let result = &report.results[0];
    assert!(result.error.as_deref().unwrap().contains("(elapsed "));
    assert_eq!(result.output, "partial\n");
}

#[test]
fn test_runs_are_idempotent() {
    let checks = [
        shell_check("a", "true"),
        shell_check("b", "exit 1"),
        shell_check("c", "sleep 0.05"),
    ];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    let policy = policy(Path::new("."), &cancel);

    let first = run(&selected, &[], &policy, None).unwrap();
    let second = run(&selected, &[], &policy, None).unwrap();

    assert_eq!(names(&first), names(&second));
    assert_eq!(
        (first.passed, first.failed, first.skipped),
        (second.passed, second.failed, second.skipped)
    );
}

#[test]
fn test_cancelled_run_dispatches_nothing() {
    let checks = [shell_check("a", "true"), shell_check("b", "true")];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run(&selected, &[], &policy(Path::new("."), &cancel), None).unwrap();
    assert_eq!(report.skipped, 2);
    assert!(report.results.iter().all(|r| r.skipped && r.error.is_none()));
}

#[test]
fn test_cancelling_mid_run_kills_in_flight_checks() {
    let checks = [shell_check("hang", "sleep 10"), shell_check("queued", "true")];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let mut policy = policy(Path::new("."), &cancel);
    policy.parallelism = 1;

    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(150));
        trigger.cancel();
    });
    let started = Instant::now();
    let report = run(&selected, &[], &policy, None).unwrap();
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(report.results[0].outcome(), Outcome::Failed);
    assert_eq!(report.results[0].error.as_deref(), Some("cancelled"));
    assert!(report.results[1].skipped);
}

fn shell_plugin(dir: &Path, name: &str, script: &str) -> Arc<Plugin> {
    let plugin_dir = dir.join(name);
    std::fs::create_dir_all(&plugin_dir).unwrap();
    std::fs::write(plugin_dir.join("check.sh"), script).unwrap();
    let manifest = PluginManifest {
        name: name.into(),
        version: "1.0.0".into(),
        description: "fixture".into(),
        executable: "/bin/sh".into(),
        args: vec!["check.sh".into()],
        file_patterns: vec!["*.go".into()],
        requires_files: true,
        ..Default::default()
    };
    Arc::new(Plugin::from_manifest(manifest, &plugin_dir, DEFAULT_PLUGIN_TIMEOUT).unwrap())
}

#[test]
fn test_plugins_and_builtins_share_the_pool() {
    let dir = TempDir::new().unwrap();
    let checks = [
        shell_check("builtin", "true"),
        Check::from_plugin(shell_plugin(
            dir.path(),
            "files",
            r#"cat > /dev/null; echo '{"success": true, "modified": ["main.go"]}'"#,
        )),
        Check::from_plugin(shell_plugin(dir.path(), "broken", r#"echo '{"success": tru}'"#)),
    ];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();
    let files = vec!["main.go".to_string(), "notes.txt".to_string()];

    let report = run(&selected, &files, &policy(dir.path(), &cancel), None).unwrap();

    assert_eq!(names(&report), vec!["builtin", "files", "broken"]);
    let plugin = &report.results[1];
    assert_eq!(plugin.outcome(), Outcome::Passed);
    assert_eq!(plugin.files, vec!["main.go"]);
    assert_eq!(plugin.modified, vec!["main.go"]);
    assert_eq!(plugin.command.as_deref(), Some("/bin/sh"));
    let broken = &report.results[2];
    assert_eq!(broken.outcome(), Outcome::Failed);
    assert!(broken.error.as_deref().unwrap().contains("invalid response"));
}

#[test]
fn test_plugin_timeout_keeps_partial_output() {
    let dir = TempDir::new().unwrap();
    let mut plugin = shell_plugin(dir.path(), "sleepy", "echo working; sleep 10");
    Arc::get_mut(&mut plugin).unwrap().timeout = Duration::from_millis(100);
    let checks = [Check::from_plugin(plugin)];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let report = run(&selected, &["a.go".to_string()], &policy(dir.path(), &cancel), None).unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    let result = &report.results[0];
    assert_eq!(result.outcome(), Outcome::Failed);
    assert!(result.error.as_deref().unwrap().contains("plugin 'sleepy' timed out"));
    assert_eq!(result.output, "working\n");
}

#[test]
fn test_plugin_without_matching_files_is_not_invoked() {
    let dir = TempDir::new().unwrap();
    let checks = [Check::from_plugin(shell_plugin(
        dir.path(),
        "marker",
        "touch invoked; echo '{\"success\": true}'",
    ))];
    let selected: Vec<&Check> = checks.iter().collect();
    let cancel = CancellationToken::new();

    let report = run(&selected, &["README.md".to_string()], &policy(dir.path(), &cancel), None).unwrap();

    assert!(report.results[0].gracefully_skipped);
    assert!(!dir.path().join("marker").join("invoked").exists());
}
