//! konduit CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 130: Cancelled by a signal

use std::process::ExitCode;

use clap::Parser;
use konduit_core::CoreError;
use konduit_kustomize::KustomizeError;
use konduit_runner::{CancellationToken, RunnerError};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands, LogFormat, LogLevel};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const CANCELLED: u8 = 130;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = match cli.command {
        Commands::Cue(args) => commands::cue::execute(args, cancel).await,
        Commands::Kustomize(args) => commands::kustomize::execute(args, cancel).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {}", render_error(&e));
            ExitCode::from(exit_code)
        }
    }
}

/// Log to stderr; stdout carries manifests in the filter command.
///
/// `RUST_LOG` overrides `--log-level` when set.
fn init_logging(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    let log_result = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Cancel running work on Ctrl+C or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
    cancel.cancel();
}

/// Join the error chain, skipping causes already spelled out by their parent.
fn render_error(e: &anyhow::Error) -> String {
    let mut message = String::new();
    for cause in e.chain() {
        let text = cause.to_string();
        if message.ends_with(&text) {
            continue;
        }
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&text);
    }
    message
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<CoreError>() {
            if err.is_cancelled() {
                return ExitCodes::CANCELLED;
            }
            if err.is_configuration() {
                return ExitCodes::INVALID_ARGS;
            }
        }
        if let Some(err) = cause.downcast_ref::<KustomizeError>() {
            if err.runner_error().is_some_and(RunnerError::is_cancelled) {
                return ExitCodes::CANCELLED;
            }
        }
        if let Some(err) = cause.downcast_ref::<RunnerError>() {
            if err.is_cancelled() {
                return ExitCodes::CANCELLED;
            }
        }
    }
    ExitCodes::GENERAL_ERROR
}
