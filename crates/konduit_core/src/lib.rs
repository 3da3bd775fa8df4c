//! # konduit_core
//!
//! Invocation synthesis for konduit.
//!
//! This crate turns the user's inputs into one templating-tool command line
//! with evaluated values and the overlay filter threaded in, and runs it.
//!
//! # Architecture
//!
//! - **EvaluationRouter**: splits files into static and to-be-evaluated by
//!   the engine's extension
//! - **ClassifiedArgs**: pulls values and post-renderer flags out of the
//!   templating tool's own arguments
//! - **Evaluator**: the capability every evaluation engine implements
//! - **Instance**: validated configuration, built once per invocation
//! - **Invocation**: the synthesized command line, printable as JSON
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use konduit_core::{Instance, InstanceConfig, NoopEvaluator};
//! use konduit_runner::{CancellationToken, OsRunner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InstanceConfig::new(vec!["template".into(), "my-release".into(), "./chart".into()])
//!     .patches(vec!["patches.yaml".into()]);
//!
//! let instance = Instance::new(config, Arc::new(NoopEvaluator), Arc::new(OsRunner::new()))?;
//! instance.execute(&CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod error;
pub mod evaluator;
pub mod instance;
pub mod invocation;
pub mod router;

pub use classifier::ClassifiedArgs;
pub use error::{Category, CoreError, CoreResult};
pub use evaluator::{Evaluation, EvaluationError, Evaluator, NoopEvaluator};
pub use instance::{Instance, InstanceConfig, DEFAULT_HELM_COMMAND};
pub use invocation::{self_command, Invocation, FILTER_SUBCOMMAND, VALUES_FILE};
pub use router::{EvaluationRouter, Routed};
