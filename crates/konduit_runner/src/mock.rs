//! Mock process runner for testing.
//!
//! Provides a configurable implementation of the ProcessRunner trait that
//! captures every call and replays scripted responses per command, without
//! spawning anything.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::error::{RunnerError, RunnerResult};
use crate::runner::{ProcessRunner, RunOptions};

/// Scripted outcome for one run of a command.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub not_found: bool,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            not_found: false,
            delay: None,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            not_found: false,
            delay: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            not_found: true,
            ..Self::success("")
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub command: String,
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
    /// Everything read from the provided stdin, if one was provided
    pub stdin: Option<Vec<u8>>,
    pub stdout_redirected: bool,
}

/// Mock process runner for testing.
///
/// Responses are queued per command name; the last queued response for a
/// command is repeated once the queue runs dry, and unknown commands
/// succeed with no output.
#[derive(Clone, Default)]
pub struct MockRunner {
    responses: Arc<RwLock<HashMap<String, VecDeque<MockResponse>>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next run of `command`.
    pub fn respond(self, command: impl Into<String>, response: MockResponse) -> Self {
        self.responses
            .write()
            .entry(command.into())
            .or_default()
            .push_back(response);
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.captured_calls.read().len()
    }

    /// Get calls to a specific command.
    pub fn get_command_calls(&self, command: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.command == command)
            .cloned()
            .collect()
    }

    fn record_call(&self, call: CapturedCall) {
        self.captured_calls.write().push(call);
    }

    fn next_response(&self, command: &str) -> MockResponse {
        let mut responses = self.responses.write();
        match responses.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| MockResponse::success("")),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| MockResponse::success("")),
            None => MockResponse::success(""),
        }
    }
}

#[async_trait]
impl ProcessRunner for MockRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        command: &str,
        args: &[String],
        options: RunOptions,
    ) -> RunnerResult<()> {
        let response = self.next_response(command);
        let RunOptions { stdin, stdout, dir } = options;

        let mut call = CapturedCall {
            command: command.to_string(),
            args: args.to_vec(),
            dir,
            stdin: None,
            stdout_redirected: stdout.is_some(),
        };

        if response.not_found {
            self.record_call(call);
            return Err(RunnerError::ExecutableNotFound(command.to_string()));
        }

        if let Some(delay) = response.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    self.record_call(call);
                    return Err(RunnerError::Cancelled(command.to_string()));
                }
            }
        }

        if cancel.is_cancelled() {
            self.record_call(call);
            return Err(RunnerError::Cancelled(command.to_string()));
        }

        let mut read_error = None;
        if let Some(mut source) = stdin {
            let mut input = Vec::new();
            if let Err(e) = source.read_to_end(&mut input).await {
                read_error = Some(e);
            }
            call.stdin = Some(input);
        }
        self.record_call(call);

        if let Some(source) = read_error {
            return Err(RunnerError::Pipe {
                command: command.to_string(),
                source,
            });
        }

        if let Some(mut sink) = stdout {
            let written = async {
                sink.write_all(response.stdout.as_bytes()).await?;
                sink.flush().await
            };
            written.await.map_err(|source| RunnerError::Pipe {
                command: command.to_string(),
                source,
            })?;
        }

        if response.exit_code != 0 {
            return Err(RunnerError::Process {
                command: command.to_string(),
                code: Some(response.exit_code),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::pipe;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_mock_runner_captures_call() {
        let runner = MockRunner::new();
        let cancel = CancellationToken::new();

        runner
            .run(&cancel, "helm", &args(&["template", "my-release"]), RunOptions::new().dir("/work"))
            .await
            .unwrap();

        let calls = runner.get_command_calls("helm");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, args(&["template", "my-release"]));
        assert_eq!(calls[0].dir, Some(PathBuf::from("/work")));
        assert!(calls[0].stdin.is_none());
        assert!(!calls[0].stdout_redirected);
    }

    #[tokio::test]
    async fn test_mock_runner_replays_queue_then_repeats_last() {
        let runner = MockRunner::new()
            .respond("kustomize", MockResponse::failure(1))
            .respond("kustomize", MockResponse::success("ok"));
        let cancel = CancellationToken::new();

        let first = runner.run(&cancel, "kustomize", &[], RunOptions::new()).await;
        assert_eq!(first.unwrap_err().exit_code(), Some(1));

        assert!(runner.run(&cancel, "kustomize", &[], RunOptions::new()).await.is_ok());
        assert!(runner.run(&cancel, "kustomize", &[], RunOptions::new()).await.is_ok());
        assert_eq!(runner.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_runner_writes_stdout_and_reads_stdin() {
        let runner = MockRunner::new().respond("cat", MockResponse::success("out"));
        let cancel = CancellationToken::new();

        let output = runner
            .output(&cancel, "cat", &[], RunOptions::new().stdin(&b"in"[..]))
            .await
            .unwrap();

        assert_eq!(output, b"out");
        assert_eq!(runner.get_calls()[0].stdin.as_deref(), Some(&b"in"[..]));
    }

    #[tokio::test]
    async fn test_mock_runner_surfaces_broken_input() {
        let runner = MockRunner::new();
        let cancel = CancellationToken::new();
        let (writer, reader) = pipe();

        writer
            .close_with_error(std::io::Error::new(std::io::ErrorKind::Other, "upstream failed"))
            .await;

        let err = runner
            .run(&cancel, "cat", &[], RunOptions::new().stdin(reader))
            .await
            .unwrap_err();
        assert!(matches!(err, RunnerError::Pipe { .. }));
    }

    #[tokio::test]
    async fn test_mock_runner_honours_cancellation() {
        let runner = MockRunner::new()
            .respond("helm", MockResponse::success("").with_delay(Duration::from_secs(30)));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = runner.run(&cancel, "helm", &[], RunOptions::new()).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_mock_runner_not_found() {
        let runner = MockRunner::new().respond("kustomize", MockResponse::not_found());
        let cancel = CancellationToken::new();

        let err = runner.run(&cancel, "kustomize", &[], RunOptions::new()).await.unwrap_err();
        assert!(matches!(err, RunnerError::ExecutableNotFound(_)));
    }
}
