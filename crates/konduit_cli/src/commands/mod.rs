//! CLI command definitions.
//!
//! `cue` is the user-facing command. `kustomize` is the filter the templating
//! tool calls back into through its post-render hook, so it stays hidden.

use clap::{Parser, Subcommand, ValueEnum};

pub mod cue;
pub mod kustomize;

/// konduit - evaluate values and patches, then run helm with them
#[derive(Parser)]
#[command(name = "konduit")]
#[command(version, about = "konduit - evaluate values and patches, then run helm with them")]
#[command(long_about = r#"
konduit wraps a helm invocation. CUE values are evaluated before helm runs,
and patches are applied to the rendered manifests with kustomize through
helm's post-renderer hook, chaining any post-renderer you already use.

USAGE:
  konduit cue -v values.cue -p patches.yaml -- template my-release ./chart

EXIT CODES:
  0   - Success
  1   - General error
  2   - Invalid arguments or configuration
  130 - Cancelled
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log verbosity (RUST_LOG takes precedence when set)
    #[arg(
        long,
        global = true,
        env = "KONDUIT_LOG_LEVEL",
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Warn
    )]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(
        long,
        global = true,
        env = "KONDUIT_LOG_FORMAT",
        value_enum,
        ignore_case = true,
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate CUE values and patches, then run helm
    Cue(cue::CueArgs),

    /// Post-render filter: apply the prepared overlay to manifests on stdin
    #[command(hide = true)]
    Kustomize(kustomize::KustomizeArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
