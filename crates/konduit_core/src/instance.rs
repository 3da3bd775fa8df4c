//! Instance configuration and validation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use konduit_runner::ProcessRunner;
use tracing::debug;

use crate::classifier::ClassifiedArgs;
use crate::error::{Category, CoreError, CoreResult};
use crate::evaluator::Evaluator;
use crate::router::EvaluationRouter;

/// Default templating-tool executable.
pub const DEFAULT_HELM_COMMAND: &str = "helm";

/// Everything needed to build an [`Instance`].
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub helm_command: String,
    /// Arguments for the templating tool, as given after `--`.
    pub args: Vec<String>,
    /// Values files given explicitly, routed by extension.
    pub values: Vec<String>,
    /// Patch files, routed by extension.
    pub patches: Vec<String>,
    /// Working directory to use instead of a temporary one.
    pub work_dir: Option<PathBuf>,
    /// Reject mixing evaluated and static files within a category.
    pub strict: bool,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            helm_command: DEFAULT_HELM_COMMAND.to_string(),
            args: Vec::new(),
            values: Vec::new(),
            patches: Vec::new(),
            work_dir: None,
            strict: false,
        }
    }
}

impl InstanceConfig {
    pub fn new(args: Vec<String>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    pub fn helm_command(mut self, command: impl Into<String>) -> Self {
        self.helm_command = command.into();
        self
    }

    pub fn values(mut self, values: Vec<String>) -> Self {
        self.values = values;
        self
    }

    pub fn patches(mut self, patches: Vec<String>) -> Self {
        self.patches = patches;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// A validated templating-tool invocation, ready to construct and execute.
pub struct Instance {
    pub(crate) helm_command: String,
    pub(crate) helm_args: Vec<String>,
    pub(crate) post_renderer: Option<String>,
    pub(crate) post_renderer_args: Vec<String>,
    pub(crate) values: Vec<String>,
    pub(crate) values_to_evaluate: Vec<String>,
    pub(crate) patches: Vec<String>,
    pub(crate) patches_to_evaluate: Vec<String>,
    pub(crate) work_dir: Option<PathBuf>,
    pub(crate) evaluator: Arc<dyn Evaluator>,
    pub(crate) runner: Arc<dyn ProcessRunner>,
}

impl Instance {
    /// Classify the configured inputs and validate them.
    pub fn new(
        config: InstanceConfig,
        evaluator: Arc<dyn Evaluator>,
        runner: Arc<dyn ProcessRunner>,
    ) -> CoreResult<Self> {
        if config.args.is_empty() {
            return Err(CoreError::Configuration(
                "no arguments provided to Helm".to_string(),
            ));
        }

        let router = EvaluationRouter::new(evaluator.supported_extension());
        let mut values = router.partition(&config.values);
        let patches = router.partition(&config.patches);

        let classified = ClassifiedArgs::classify(&config.args);
        values.static_files.extend(classified.values);

        if config.strict {
            values.check_strict(Category::Values)?;
            patches.check_strict(Category::Patches)?;
        }

        debug!(
            "Classified {} pass-through args, {} static and {} evaluated values, {} static and {} evaluated patches",
            classified.passthrough.len(),
            values.static_files.len(),
            values.to_evaluate.len(),
            patches.static_files.len(),
            patches.to_evaluate.len()
        );

        Ok(Self {
            helm_command: config.helm_command,
            helm_args: classified.passthrough,
            post_renderer: classified.post_renderer,
            post_renderer_args: classified.post_renderer_args,
            values: values.static_files,
            values_to_evaluate: values.to_evaluate,
            patches: patches.static_files,
            patches_to_evaluate: patches.to_evaluate,
            work_dir: config.work_dir,
            evaluator,
            runner,
        })
    }

    pub fn helm_command(&self) -> &str {
        &self.helm_command
    }

    /// Pass-through arguments for the templating tool.
    pub fn helm_args(&self) -> &[String] {
        &self.helm_args
    }

    pub fn post_renderer(&self) -> Option<&str> {
        self.post_renderer.as_deref()
    }

    pub fn post_renderer_args(&self) -> &[String] {
        &self.post_renderer_args
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn values_to_evaluate(&self) -> &[String] {
        &self.values_to_evaluate
    }

    pub fn patches(&self) -> &[String] {
        &self.patches
    }

    pub fn patches_to_evaluate(&self) -> &[String] {
        &self.patches_to_evaluate
    }

    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    /// Whether the overlay filter has to be interposed.
    pub fn has_patches(&self) -> bool {
        !self.patches.is_empty() || !self.patches_to_evaluate.is_empty()
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("helm_command", &self.helm_command)
            .field("helm_args", &self.helm_args)
            .field("post_renderer", &self.post_renderer)
            .field("post_renderer_args", &self.post_renderer_args)
            .field("values", &self.values)
            .field("values_to_evaluate", &self.values_to_evaluate)
            .field("patches", &self.patches)
            .field("patches_to_evaluate", &self.patches_to_evaluate)
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}
