#![cfg(unix)]

use scanpdfa::tools::CancelToken;
use scanpdfa::tools::process::{Runner, require_output};
use std::process::Command;
use std::time::{Duration, Instant};

fn sh(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script);
    cmd
}

#[test]
fn captures_stdout() {
    let runner = Runner::new(10, CancelToken::new());
    let out = runner.stdout(sh("echo 'Pages: 3'")).unwrap();
    assert_eq!(out.trim(), "Pages: 3");
}

#[test]
fn non_zero_exit_reports_stderr() {
    let runner = Runner::new(10, CancelToken::new());
    let err = runner.run(sh("echo 'no such file' >&2; exit 2")).unwrap_err();
    assert!(format!("{err:#}").contains("no such file"));
}

#[test]
fn multi_line_stderr_becomes_one_line() {
    let runner = Runner::new(10, CancelToken::new());
    let err = runner
        .run(sh("printf 'Error: bad xref\\n\\nError: giving up\\n' >&2; exit 1"))
        .unwrap_err();
    let msg = format!("{err:#}");
    assert!(!msg.contains('\n'), "{msg}");
    assert!(msg.contains("Error: bad xref; Error: giving up"), "{msg}");
}

#[test]
fn slow_tool_is_killed_at_timeout() {
    let runner = Runner::new(1, CancelToken::new());
    let started = Instant::now();
    assert!(runner.run(sh("exec sleep 30")).is_err());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn cancellation_kills_running_tool() {
    let cancel = CancelToken::new();
    let runner = Runner::new(0, cancel.clone());
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(200));
        cancel.cancel();
    });

    let started = Instant::now();
    assert!(runner.run(sh("exec sleep 30")).is_err());
    assert!(started.elapsed() < Duration::from_secs(10));
    canceller.join().unwrap();

    // nothing new starts once cancelled
    assert!(runner.run(sh("true")).is_err());
}

#[test]
fn empty_output_file_is_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.pnm");
    assert!(require_output(&path, "render").is_err());
    std::fs::write(&path, b"").unwrap();
    assert!(require_output(&path, "render").is_err());
    std::fs::write(&path, b"P4").unwrap();
    assert!(require_output(&path, "render").is_ok());
}
