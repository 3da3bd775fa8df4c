//! The CUE-backed evaluator.
//!
//! Evaluation shells out to `cue export --out yaml`, so any module layout
//! and language version the installed CLI understands works here too.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use konduit_core::{EvaluationError, Evaluator};
use konduit_runner::{CancellationToken, ProcessRunner, RunOptions};
use regex::Regex;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{CueError, CueResult};
use crate::options::{CueOptions, DEFAULT_CUE_COMMAND};
use crate::scope::unify_scopes;

const CUE_EXTENSION: &str = ".cue";

fn package_clause() -> Option<&'static Regex> {
    static PACKAGE: OnceLock<Option<Regex>> = OnceLock::new();
    PACKAGE
        .get_or_init(|| Regex::new(r"(?m)^\s*package\s+([A-Za-z_][A-Za-z0-9_]*)\s*$").ok())
        .as_ref()
}

/// Package name declared by a CUE source, if any.
pub fn package_name(source: &str) -> Option<&str> {
    package_clause()?
        .captures(source)?
        .get(1)
        .map(|name| name.as_str())
}

/// Evaluator that runs the `cue` command-line tool.
pub struct CueEvaluator {
    runner: Arc<dyn ProcessRunner>,
    options: CueOptions,
    command: String,
    cancel: CancellationToken,
}

impl CueEvaluator {
    pub fn new(runner: Arc<dyn ProcessRunner>, options: CueOptions) -> Self {
        Self {
            runner,
            options,
            command: DEFAULT_CUE_COMMAND.to_string(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use a different `cue` executable.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Stop running evaluations when `cancel` fires.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &CueOptions {
        &self.options
    }

    /// Evaluate `files` into one YAML document.
    pub async fn export(&self, files: &[String]) -> CueResult<Vec<u8>> {
        if files.is_empty() {
            return Err(CueError::NoFiles);
        }

        let resolved = resolve_paths(files)?;
        let scope_file = match unify_scopes(&self.options.scopes)? {
            Some(scope) => Some(self.write_scope_file(&resolved[0], &scope)?),
            None => None,
        };

        let mut args = vec!["export".to_string(), "--out".to_string(), "yaml".to_string()];
        args.extend(resolved.iter().map(|path| path.to_string_lossy().into_owned()));
        if let Some(file) = &scope_file {
            args.push(file.path().to_string_lossy().into_owned());
        }

        let mut options = RunOptions::new();
        if let Some(dir) = self.options.load_dir() {
            options = options.dir(dir);
        }

        let output = self
            .runner
            .output(&self.cancel, &self.command, &args, options)
            .await?;

        // Keep the scope file until the engine has finished with it.
        drop(scope_file);
        Ok(output)
    }

    /// Write the scope as a definition alongside `first`, in its package.
    ///
    /// The engine requires all named files to live in one directory.
    fn write_scope_file(&self, first: &Path, scope: &serde_json::Value) -> CueResult<NamedTempFile> {
        let source = std::fs::read_to_string(first).map_err(CueError::Io)?;
        let dir = first.parent().unwrap_or_else(|| Path::new("."));

        let mut content = String::new();
        if let Some(package) = package_name(&source) {
            content.push_str(&format!("package {}\n\n", package));
        }
        content.push_str(&format!("{}: {}\n", scope_label(&self.options.scope_path), serde_json::to_string(scope)?));

        let mut file = tempfile::Builder::new()
            .prefix("konduit-scope-")
            .suffix(CUE_EXTENSION)
            .tempfile_in(dir)
            .map_err(CueError::WriteScope)?;
        file.write_all(content.as_bytes()).map_err(CueError::WriteScope)?;
        file.flush().map_err(CueError::WriteScope)?;

        debug!("Wrote scope file {:?}", file.path());
        Ok(file)
    }
}

#[async_trait]
impl Evaluator for CueEvaluator {
    fn supported_extension(&self) -> &'static str {
        CUE_EXTENSION
    }

    async fn evaluate(&self, files: &[String]) -> Result<Vec<u8>, EvaluationError> {
        Ok(self.export(files).await?)
    }
}

/// Make `files` absolute so they survive the engine's directory change.
fn resolve_paths(files: &[String]) -> CueResult<Vec<PathBuf>> {
    let cwd = std::env::current_dir()?;
    Ok(files.iter().map(|file| cwd.join(file)).collect())
}

/// Turn a dotted scope path into nested CUE labels.
fn scope_label(path: &str) -> String {
    path.split('.').collect::<Vec<_>>().join(": ")
}
