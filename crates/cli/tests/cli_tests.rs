//! CLI integration tests

use std::process::Command;

fn fleetctl(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "fleet-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_cli_help() {
    let output = fleetctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Fleet Supervisor"), "Should show app name");
    for command in ["workers", "agents", "violations", "metrics", "check", "monitor", "stop"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
    assert!(stdout.contains("--api-url"));
}

#[test]
fn test_cli_version() {
    let output = fleetctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("fleetctl"), "Should show binary name");
}

#[test]
fn test_violations_help() {
    let output = fleetctl(&["violations", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--hours"), "Should show hours option");
}

#[test]
fn test_stop_requires_name() {
    let output = fleetctl(&["stop"]);
    assert!(!output.status.success(), "Stop without a name should fail");
}

#[test]
fn test_unreachable_supervisor_fails_cleanly() {
    let output = fleetctl(&["--api-url", "http://127.0.0.1:9", "metrics"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Failed to send request"));
}
