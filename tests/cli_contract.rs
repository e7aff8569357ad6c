#![allow(clippy::expect_used)]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const HELLO: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
                     data: {}\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"!\"}}]}\n\n\
                     data: [DONE]\n";

/// Command isolated from the caller's environment and `.env` files.
fn devtools(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("devtools-rs"));
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("DASHSCOPE_API_KEY")
        .env_remove("DEVTOOLS_BASE_URL")
        .env_remove("DEVTOOLS_MODEL")
        .env_remove("DEVTOOLS_TIMEOUT_SECS")
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path.to_string_lossy().into_owned()
}

#[test]
fn tools_lists_catalog() {
    let dir = TempDir::new().expect("temp dir");
    devtools(dir.path())
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("arch-master"))
        .stdout(predicate::str::contains("rfp-solver"));
}

#[test]
fn tools_json_is_array_of_specs() {
    let dir = TempDir::new().expect("temp dir");
    devtools(dir.path())
        .args(["--format", "json", "tools"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"key\": \"metamorph\""))
        .stdout(predicate::str::contains("\"streaming\""));
}

#[test]
fn replay_prints_aggregated_text() {
    let dir = TempDir::new().expect("temp dir");
    let transcript = write(dir.path(), "hello.sse", HELLO);
    devtools(dir.path())
        .args(["replay", &transcript])
        .assert()
        .success()
        .stdout("Hello!\n");
}

#[test]
fn replay_json_reports_publishes() {
    let dir = TempDir::new().expect("temp dir");
    let transcript = write(dir.path(), "hello.sse", HELLO);
    devtools(dir.path())
        .args(["--format", "json", "replay", &transcript])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"text\": \"Hello!\""))
        .stdout(predicate::str::contains("\"publishes\": 3"))
        .stdout(predicate::str::contains("\"state\": \"completed\""));
}

#[test]
fn replay_failure_keeps_partial_output() {
    let dir = TempDir::new().expect("temp dir");
    let transcript = write(
        dir.path(),
        "broken.sse",
        "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\ndata: {broken\n",
    );
    devtools(dir.path())
        .args(["replay", &transcript])
        .assert()
        .failure()
        .stdout("partial\n")
        .stderr(predicate::str::contains("malformed chunk"));
}

#[test]
fn extract_reads_stdin() {
    let dir = TempDir::new().expect("temp dir");
    let mut cmd = devtools(dir.path());
    cmd.arg("extract");
    assert_cmd::Command::from_std(cmd)
        .write_stdin("intro\n```\ncode line 1\ncode line 2\n```\noutro")
        .assert()
        .success()
        .stdout("code line 1\ncode line 2\n");
}

#[test]
fn detect_reads_file() {
    let dir = TempDir::new().expect("temp dir");
    let file = write(dir.path(), "snippet.txt", "puts 'hi'\n");
    devtools(dir.path())
        .args(["detect", &file])
        .assert()
        .success()
        .stdout("ruby\n");
}

#[test]
fn run_with_replay_streams_response() {
    let dir = TempDir::new().expect("temp dir");
    let transcript = write(dir.path(), "hello.sse", HELLO);
    devtools(dir.path())
        .args(["--replay", &transcript, "run", "test-craft", "fn add() {}"])
        .assert()
        .success()
        .stdout("Hello!\n");
}

#[test]
fn run_without_api_key_fails() {
    let dir = TempDir::new().expect("temp dir");
    devtools(dir.path())
        .args(["run", "arch-master", "a queue service"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DASHSCOPE_API_KEY"));
}

#[test]
fn run_unknown_tool_json_error_on_stdout() {
    let dir = TempDir::new().expect("temp dir");
    devtools(dir.path())
        .args(["--format", "json", "run", "no-such-tool", "x"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"error\""))
        .stdout(predicate::str::contains("unknown tool"));
}

#[test]
fn generate_run_requires_allow_exec() {
    let dir = TempDir::new().expect("temp dir");
    devtools(dir.path())
        .args(["generate", "print the first ten primes", "--run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--allow-exec"));
}

#[test]
fn verbose_logs_go_to_stderr() {
    let dir = TempDir::new().expect("temp dir");
    let transcript = write(dir.path(), "hello.sse", HELLO);
    devtools(dir.path())
        .args(["-v", "replay", &transcript])
        .assert()
        .success()
        .stdout("Hello!\n")
        .stderr(predicate::str::contains("response stream completed"));
}

const TRUNCATED: &str =
    "data: {\"choices\":[{\"delta\":{\"content\":\"partial answer\"}}]}\n\ndata: {not json\n";

#[test]
fn replay_json_failure_carries_partial_text() {
    let dir = TempDir::new().expect("temp dir");
    let transcript = write(dir.path(), "truncated.sse", TRUNCATED);
    devtools(dir.path())
        .args(["--format", "json", "replay", &transcript])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"partial\": \"partial answer\""))
        .stdout(predicate::str::contains("malformed chunk at line 3"));
}

#[test]
fn run_json_failure_carries_partial_text() {
    let dir = TempDir::new().expect("temp dir");
    let transcript = write(dir.path(), "truncated.sse", TRUNCATED);
    devtools(dir.path())
        .args(["--replay", &transcript, "--format", "json", "run", "logic-lens", "repo"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"partial\": \"partial answer\""))
        .stdout(predicate::str::contains("malformed chunk at line 3"));
}
