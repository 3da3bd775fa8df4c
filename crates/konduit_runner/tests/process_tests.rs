//! Integration tests for the OS process runner.
//!
//! These spawn real POSIX utilities (`sh`, `cat`, `sleep`) and are skipped
//! on other platforms.

#![cfg(unix)]

use std::time::{Duration, Instant};

use konduit_runner::{pipe, CancellationToken, OsRunner, ProcessRunner, RunOptions, RunnerError};
use tokio::io::AsyncWriteExt;

fn sh(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string()]
}

/// Test a zero exit is success.
#[tokio::test]
async fn test_run_success() {
    let runner = OsRunner::new();
    let cancel = CancellationToken::new();

    runner
        .run(&cancel, "sh", &sh("exit 0"), RunOptions::new().stdout(tokio::io::sink()))
        .await
        .unwrap();
}

/// Test a non-zero exit carries its code.
#[tokio::test]
async fn test_run_non_zero_exit() {
    let runner = OsRunner::new();
    let cancel = CancellationToken::new();

    let err = runner
        .run(&cancel, "sh", &sh("exit 3"), RunOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Process { .. }));
    assert_eq!(err.exit_code(), Some(3));
}

/// Test unresolvable commands fail before spawning.
#[tokio::test]
async fn test_run_executable_not_found() {
    let runner = OsRunner::new();
    let cancel = CancellationToken::new();

    let err = runner
        .run(&cancel, "konduit-no-such-tool", &[], RunOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::ExecutableNotFound(_)));
}

/// Test stdin and stdout redirection round-trip through a child.
#[tokio::test]
async fn test_output_with_stdin() {
    let runner = OsRunner::new();
    let cancel = CancellationToken::new();

    let output = runner
        .output(&cancel, "cat", &[], RunOptions::new().stdin(&b"a: 1\n"[..]))
        .await
        .unwrap();

    assert_eq!(output, b"a: 1\n");
}

/// Test the working directory override.
#[tokio::test]
async fn test_run_in_dir() {
    let runner = OsRunner::new();
    let cancel = CancellationToken::new();
    let dir = tempfile::tempdir().unwrap();

    let output = runner
        .output(&cancel, "sh", &sh("pwd"), RunOptions::new().dir(dir.path()))
        .await
        .unwrap();

    let printed = String::from_utf8(output).unwrap();
    assert_eq!(
        std::fs::canonicalize(printed.trim()).unwrap(),
        std::fs::canonicalize(dir.path()).unwrap()
    );
}

/// Test an error marker on the input pipe ends the child's input and
/// surfaces as a pipe error instead of hanging.
#[tokio::test]
async fn test_broken_input_pipe_terminates_child() {
    let runner = OsRunner::new();
    let cancel = CancellationToken::new();
    let (mut writer, reader) = pipe();

    let producer = tokio::spawn(async move {
        writer.write_all(b"partial output\n").await.unwrap();
        writer
            .close_with_error(std::io::Error::new(std::io::ErrorKind::Other, "producer failed"))
            .await;
    });

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        runner.run(
            &cancel,
            "cat",
            &[],
            RunOptions::new().stdin(reader).stdout(tokio::io::sink()),
        ),
    )
    .await
    .expect("consumer must not hang");

    producer.await.unwrap();
    assert!(matches!(result.unwrap_err(), RunnerError::Pipe { .. }));
}

/// Test cancellation kills a running child promptly.
#[tokio::test]
async fn test_cancellation_kills_child() {
    let runner = OsRunner::new();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = runner
        .run(&cancel, "sleep", &["30".to_string()], RunOptions::new())
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(10));
}

/// Test an already-cancelled token prevents the spawn.
#[tokio::test]
async fn test_cancelled_before_start() {
    let runner = OsRunner::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = runner
        .run(&cancel, "sh", &sh("exit 0"), RunOptions::new())
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}
