//! Synthesis and execution of the templating-tool invocation.

use std::io::Write;
use std::path::{Path, PathBuf};

use konduit_kustomize::{create_exclusive, OverlaySpecBuilder};
use konduit_runner::{format_command, CancellationToken, RunOptions};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Category, CoreError, CoreResult};
use crate::evaluator::Evaluation;
use crate::instance::Instance;

/// Evaluated values written into the working directory.
pub const VALUES_FILE: &str = "evaluated.yaml";

/// Name of the internal filter subcommand.
pub const FILTER_SUBCOMMAND: &str = "kustomize";

const VALUES_FLAG: &str = "--values";
const POST_RENDERER_FLAG: &str = "--post-renderer";
const POST_RENDERER_ARGS_FLAG: &str = "--post-renderer-args";
const DIR_FLAG: &str = "--dir";

/// Path of the running executable, used to register it as the filter.
pub fn self_command() -> CoreResult<String> {
    match std::env::current_exe() {
        Ok(path) => path_arg(&path),
        Err(_) => Ok("konduit".to_string()),
    }
}

/// A path as a command-line argument; non-UTF-8 paths are rejected.
fn path_arg(path: &Path) -> CoreResult<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| CoreError::Configuration(format!("path is not valid UTF-8: {:?}", path)))
}

/// The final templating-tool command line and what it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
    pub evaluated_values: Evaluation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    pub evaluated_patches: Evaluation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<String>,
}

impl Invocation {
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write the evaluated values, if any, into `dir`.
    pub fn write_values(&self, dir: &Path) -> CoreResult<Option<PathBuf>> {
        if self.evaluated_values.is_empty() {
            return Ok(None);
        }

        let path = dir.join(VALUES_FILE);
        debug!("Writing evaluated values to {:?}", path);

        let mut file = create_exclusive(&path)?;
        file.write_all(self.evaluated_values.result.as_bytes())?;
        Ok(Some(path))
    }

    /// Merge evaluated and static patches into the overlay specification in
    /// `dir`. Does nothing without patches.
    pub fn write_overlay_spec(&self, dir: &Path) -> CoreResult<Option<PathBuf>> {
        if self.evaluated_patches.is_empty() && self.patches.is_empty() {
            return Ok(None);
        }

        let mut documents = Vec::with_capacity(self.patches.len() + 1);
        if !self.evaluated_patches.result.is_empty() {
            documents.push(self.evaluated_patches.result.clone().into_bytes());
        }
        for patch in &self.patches {
            let content = std::fs::read(patch).map_err(|source| CoreError::ReadPatch {
                path: PathBuf::from(patch),
                source,
            })?;
            documents.push(content);
        }

        let kustomization = OverlaySpecBuilder::merge(documents)?;
        Ok(Some(OverlaySpecBuilder::write_spec(dir, &kustomization)?))
    }
}

impl Instance {
    /// Build the invocation against the configured working directory.
    ///
    /// Without one, paths inside the working directory render relative.
    pub async fn construct(&self) -> CoreResult<Invocation> {
        let dir = self.work_dir.clone().unwrap_or_default();
        self.construct_in(&dir).await
    }

    /// Build the invocation for working directory `dir`, evaluating each
    /// category at most once.
    pub async fn construct_in(&self, dir: &Path) -> CoreResult<Invocation> {
        let mut invocation = Invocation {
            command: self.helm_command.clone(),
            args: self.build_args(dir)?,
            evaluated_values: Evaluation::new(self.values_to_evaluate.clone()),
            values: self.values.clone(),
            evaluated_patches: Evaluation::new(self.patches_to_evaluate.clone()),
            patches: self.patches.clone(),
        };

        invocation.evaluated_values.result = self.evaluate(Category::Values, &self.values_to_evaluate).await?;
        invocation.evaluated_patches.result = self.evaluate(Category::Patches, &self.patches_to_evaluate).await?;

        Ok(invocation)
    }

    async fn evaluate(&self, category: Category, files: &[String]) -> CoreResult<String> {
        if files.is_empty() {
            return Ok(String::new());
        }

        debug!("Evaluating {} from {:?}", category, files);
        let result = self
            .evaluator
            .evaluate(files)
            .await
            .map_err(|source| CoreError::Evaluation { category, source })?;

        Ok(String::from_utf8_lossy(&result).into_owned())
    }

    /// Assemble the templating tool's argument vector.
    fn build_args(&self, dir: &Path) -> CoreResult<Vec<String>> {
        let mut args = self.helm_args.clone();

        // Evaluated values go first so static files override them.
        if !self.values_to_evaluate.is_empty() {
            args.push(VALUES_FLAG.to_string());
            args.push(path_arg(&dir.join(VALUES_FILE))?);
        }

        for value in &self.values {
            args.push(VALUES_FLAG.to_string());
            args.push(value.clone());
        }

        if self.has_patches() {
            args.push(POST_RENDERER_FLAG.to_string());
            args.push(self_command()?);

            let filter_args = [FILTER_SUBCOMMAND.to_string(), DIR_FLAG.to_string(), path_arg(dir)?];
            push_filter_args(&mut args, filter_args);

            // One level of nesting: the filter strips it again on receipt.
            if let Some(post_renderer) = &self.post_renderer {
                push_filter_args(&mut args, [POST_RENDERER_FLAG.to_string(), post_renderer.clone()]);
                for arg in &self.post_renderer_args {
                    push_filter_args(&mut args, [POST_RENDERER_ARGS_FLAG.to_string(), arg.clone()]);
                }
            }
        } else if let Some(post_renderer) = &self.post_renderer {
            args.push(POST_RENDERER_FLAG.to_string());
            args.push(post_renderer.clone());
            push_filter_args(&mut args, self.post_renderer_args.iter().cloned());
        }

        Ok(args)
    }

    /// Run the templating tool with evaluated artifacts in place.
    ///
    /// Uses the configured working directory, or a temporary one removed
    /// afterwards.
    pub async fn execute(&self, cancel: &CancellationToken) -> CoreResult<()> {
        let temp_dir;
        let dir = match &self.work_dir {
            Some(dir) => dir.clone(),
            None => {
                temp_dir = tempfile::Builder::new()
                    .prefix("konduit-")
                    .tempdir()
                    .map_err(|e| CoreError::stage("create working directory")(e.into()))?;
                temp_dir.path().to_path_buf()
            }
        };
        debug!("Using working directory {:?}", dir);

        let invocation = self
            .construct_in(&dir)
            .await
            .map_err(CoreError::stage("construct invocation"))?;

        invocation
            .write_values(&dir)
            .map_err(CoreError::stage("write evaluated values"))?;
        invocation
            .write_overlay_spec(&dir)
            .map_err(CoreError::stage("prepare overlay specification"))?;

        info!("Running {}", format_command(&invocation.command, &invocation.args));
        self.runner
            .run(cancel, &invocation.command, &invocation.args, RunOptions::new())
            .await
            .map_err(|e| CoreError::stage("run invocation")(e.into()))?;

        Ok(())
    }
}

/// Append each value as a separate `--post-renderer-args` flag.
fn push_filter_args(args: &mut Vec<String>, values: impl IntoIterator<Item = String>) {
    for value in values {
        args.push(POST_RENDERER_ARGS_FLAG.to_string());
        args.push(value);
    }
}
