//! # konduit_cue
//!
//! CUE evaluation engine for konduit.
//!
//! Values and patches written in CUE are exported to YAML by the `cue`
//! command-line tool. Scope documents given on the command line are unified
//! and made available to every evaluated file under the `#Konduit`
//! definition.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use konduit_cue::{CueEvaluator, CueOptions};
//! use konduit_runner::OsRunner;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = CueOptions::new().scopes(vec![r#"{"env": "prod"}"#.to_string()]);
//! let eval = CueEvaluator::new(Arc::new(OsRunner::new()), options);
//!
//! let yaml = eval.export(&["values.cue".to_string()]).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod evaluator;
pub mod options;
pub mod scope;

pub use error::{CueError, CueResult};
pub use evaluator::{package_name, CueEvaluator};
pub use options::{CueOptions, DEFAULT_CUE_COMMAND, DEFAULT_SCOPE_PATH};
pub use scope::unify_scopes;
