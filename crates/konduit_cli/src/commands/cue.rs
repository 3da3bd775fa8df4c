//! Cue command - Run helm with CUE-evaluated values and patches.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use konduit_core::{CoreError, Instance, InstanceConfig, DEFAULT_HELM_COMMAND};
use konduit_cue::{CueEvaluator, CueOptions};
use konduit_runner::{CancellationToken, OsRunner, ProcessRunner};

#[derive(Args, Debug)]
pub struct CueArgs {
    /// Print the resulting helm invocation as JSON instead of running it
    #[arg(long)]
    pub show: bool,

    /// Helm values files; .cue files are evaluated first
    #[arg(short, long)]
    pub values: Vec<String>,

    /// Kustomize patch files; .cue files are evaluated first
    #[arg(short, long)]
    pub patches: Vec<String>,

    /// JSON/YAML data (or @filename) to inject under the #Konduit definition
    #[arg(short, long)]
    pub scopes: Vec<String>,

    /// Helm command or path to an executable
    #[arg(long, default_value = DEFAULT_HELM_COMMAND)]
    pub helm_command: String,

    /// Directory CUE runs in; defaults to the current directory
    #[arg(long)]
    pub cue_base_dir: Option<PathBuf>,

    /// Directory that contains the cue.mod directory and packages
    #[arg(long)]
    pub cue_module_root: Option<PathBuf>,

    /// Disallow evaluated and static files of the same kind together
    #[arg(long)]
    pub strict: bool,

    /// Arguments after the leading -- are passed through to helm
    #[arg(last = true)]
    pub helm_args: Vec<String>,
}

impl CueArgs {
    fn cue_options(&self) -> CueOptions {
        let mut options = CueOptions::new().scopes(self.scopes.clone());
        if let Some(dir) = &self.cue_base_dir {
            options = options.base_dir(dir);
        }
        if let Some(dir) = &self.cue_module_root {
            options = options.module_root(dir);
        }
        options
    }

    fn instance_config(self) -> InstanceConfig {
        InstanceConfig::new(self.helm_args)
            .helm_command(self.helm_command)
            .values(self.values)
            .patches(self.patches)
            .strict(self.strict)
    }
}

pub async fn execute(args: CueArgs, cancel: CancellationToken) -> Result<()> {
    if args.helm_args.is_empty() {
        return Err(CoreError::Configuration("must use -- to pass through Helm arguments".to_string()).into());
    }

    let runner: Arc<dyn ProcessRunner> = Arc::new(OsRunner::new());
    let evaluator = CueEvaluator::new(runner.clone(), args.cue_options()).cancel_token(cancel.clone());

    let show = args.show;
    let instance = Instance::new(args.instance_config(), Arc::new(evaluator), runner).context("init")?;

    if show {
        let invocation = instance.construct().await.context("construct invocation")?;
        println!("{}", invocation.to_json().context("encode invocation")?);
        return Ok(());
    }

    info!("Running {}", instance.helm_command());
    instance.execute(&cancel).await.context("execute")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> CueArgs {
        let cli = Cli::try_parse_from(std::iter::once("konduit").chain(args.iter().copied())).unwrap();
        match cli.command {
            Commands::Cue(args) => args,
            Commands::Kustomize(_) => panic!("expected the cue command"),
        }
    }

    #[test]
    fn test_parse_flags_and_helm_args() {
        let args = parse(&[
            "cue",
            "-v",
            "values.cue",
            "--values",
            "base.yaml",
            "-p",
            "patches.cue",
            "-s",
            r#"{"env": "prod"}"#,
            "-s",
            "@scope.yaml",
            "--strict",
            "--",
            "template",
            "my-release",
            "--post-renderer",
            "./render.sh",
            "-f",
            "extra.yaml",
        ]);

        assert_eq!(args.values, vec!["values.cue", "base.yaml"]);
        assert_eq!(args.patches, vec!["patches.cue"]);
        assert_eq!(args.scopes, vec![r#"{"env": "prod"}"#, "@scope.yaml"]);
        assert!(args.strict);
        assert!(!args.show);
        assert_eq!(args.helm_command, "helm");
        assert_eq!(
            args.helm_args,
            vec!["template", "my-release", "--post-renderer", "./render.sh", "-f", "extra.yaml"]
        );
    }

    #[test]
    fn test_parse_engine_options() {
        let args = parse(&[
            "cue",
            "--cue-base-dir",
            "./defs",
            "--cue-module-root",
            "/mod",
            "--helm-command",
            "/usr/local/bin/helm",
            "--show",
            "--",
            "template",
        ]);

        assert!(args.show);
        assert_eq!(args.helm_command, "/usr/local/bin/helm");

        let options = args.cue_options();
        assert_eq!(options.base_dir, Some(PathBuf::from("./defs")));
        assert_eq!(options.module_root, Some(PathBuf::from("/mod")));
    }

    #[test]
    fn test_helm_args_require_separator() {
        let result = Cli::try_parse_from(["konduit", "cue", "template", "my-release"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_helm_args_is_configuration_error() {
        let args = parse(&["cue", "-v", "values.yaml"]);
        let err = execute(args, CancellationToken::new()).await.unwrap_err();

        let core = err.downcast_ref::<CoreError>().unwrap();
        assert!(core.is_configuration());
        assert_eq!(err.to_string(), "must use -- to pass through Helm arguments");
    }
}
