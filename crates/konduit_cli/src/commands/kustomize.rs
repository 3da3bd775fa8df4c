//! Kustomize command - Post-render filter invoked by helm.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use konduit_core::CoreError;
use konduit_kustomize::{PostRenderProxy, DEFAULT_KUSTOMIZE_COMMAND};
use konduit_runner::{CancellationToken, OsRunner};

#[derive(Args, Debug)]
pub struct KustomizeArgs {
    /// Directory holding the prepared kustomization
    #[arg(long)]
    pub dir: PathBuf,

    /// Original helm post-renderer to chain to
    #[arg(long)]
    pub post_renderer: Option<String>,

    /// Original helm post-renderer arguments to pass through
    #[arg(long, allow_hyphen_values = true)]
    pub post_renderer_args: Vec<String>,

    /// Kustomize command or path to an executable
    #[arg(long, default_value = DEFAULT_KUSTOMIZE_COMMAND)]
    pub kustomize_command: String,

    /// Additional arguments to pass to kustomize build
    #[arg(long, allow_hyphen_values = true)]
    pub kustomize_build_args: Vec<String>,
}

impl KustomizeArgs {
    fn proxy(self) -> PostRenderProxy {
        PostRenderProxy::new(Arc::new(OsRunner::new()), self.dir)
            .kustomize_command(self.kustomize_command)
            .kustomize_build_args(self.kustomize_build_args)
            .chain(self.post_renderer.unwrap_or_default(), self.post_renderer_args)
    }
}

pub async fn execute(args: KustomizeArgs, cancel: CancellationToken) -> Result<()> {
    if std::io::stdin().is_terminal() {
        return Err(CoreError::Configuration("no manifests from stdin".to_string()).into());
    }

    debug!("Post-rendering in {:?}", args.dir);
    let mut proxy = args.proxy();
    proxy
        .run(&cancel, tokio::io::stdin())
        .await
        .context("post-render")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> KustomizeArgs {
        let cli = Cli::try_parse_from(std::iter::once("konduit").chain(args.iter().copied())).unwrap();
        match cli.command {
            Commands::Kustomize(args) => args,
            Commands::Cue(_) => panic!("expected the kustomize command"),
        }
    }

    #[test]
    fn test_parse_nested_post_renderer_args() {
        let args = parse(&[
            "kustomize",
            "--dir",
            "/tmp/konduit-1",
            "--post-renderer-args",
            "--post-renderer",
            "--post-renderer-args",
            "./render.sh",
            "--post-renderer-args",
            "--post-renderer-args",
            "--post-renderer-args",
            "--flag",
        ]);

        assert_eq!(args.dir, PathBuf::from("/tmp/konduit-1"));
        assert_eq!(args.post_renderer, None);
        assert_eq!(
            args.post_renderer_args,
            vec!["--post-renderer", "./render.sh", "--post-renderer-args", "--flag"]
        );
        assert_eq!(args.kustomize_command, "kustomize");
    }

    #[test]
    fn test_parse_unwrapped_chain() {
        let args = parse(&[
            "kustomize",
            "--dir",
            "/tmp/konduit-1",
            "--post-renderer",
            "./render.sh",
            "--post-renderer-args",
            "--flag",
            "--kustomize-command",
            "/opt/kustomize",
            "--kustomize-build-args",
            "--enable-helm",
        ]);

        assert_eq!(args.post_renderer.as_deref(), Some("./render.sh"));
        assert_eq!(args.post_renderer_args, vec!["--flag"]);
        assert_eq!(args.kustomize_command, "/opt/kustomize");
        assert_eq!(args.kustomize_build_args, vec!["--enable-helm"]);
    }

    #[test]
    fn test_dir_is_required() {
        assert!(Cli::try_parse_from(["konduit", "kustomize"]).is_err());
    }
}
