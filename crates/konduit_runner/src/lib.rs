//! # konduit_runner
//!
//! External process execution for konduit.
//!
//! This crate runs the programs konduit orchestrates (the templating tool,
//! the overlay-build tool, user post-renderers, the CUE CLI) with optional
//! stream redirection and cooperative cancellation.
//!
//! # Features
//!
//! - **ProcessRunner trait**: the seam every consumer depends on
//! - **OsRunner**: search-path lookup, inherited or redirected streams,
//!   kill-on-cancel
//! - **In-memory pipe**: bounded byte pipe whose write side can be closed
//!   with an error marker
//! - **Mock Runner**: scripted responses and captured calls for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use konduit_runner::{OsRunner, ProcessRunner, RunOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = OsRunner::new();
//!     let cancel = CancellationToken::new();
//!
//!     let args = vec!["build".to_string(), "/tmp/konduit-1234".to_string()];
//!     runner.run(&cancel, "kustomize", &args, RunOptions::new()).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod mock;
pub mod os;
pub mod pipe;
pub mod runner;

pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use os::{find_executable, OsRunner};
pub use pipe::{pipe, PipeReader, PipeWriter};
pub use runner::{format_command, BoxedReader, BoxedWriter, ProcessRunner, RunOptions};

pub use tokio_util::sync::CancellationToken;
