//! The post-render filter: persist the rendered stream, build the overlay,
//! and optionally hand the result to a chained post-renderer.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use konduit_runner::{pipe, BoxedWriter, CancellationToken, ProcessRunner, RunOptions, RunnerError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::{KustomizeError, KustomizeResult};
use crate::spec::{OverlaySpecBuilder, KUSTOMIZATION_FILE};

/// Default overlay-build executable.
pub const DEFAULT_KUSTOMIZE_COMMAND: &str = "kustomize";

/// Where the overlay specification comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlaySource {
    /// The invoking process already wrote the specification into the directory.
    Prepared,
    /// Patch documents to merge, in order, into a fresh specification.
    Patches(Vec<Vec<u8>>),
}

/// Progress of one filter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Start,
    ManifestPersisted,
    OverlayBuilt,
    Direct,
    BothRunning,
    Joined,
    Done,
    Failed,
}

impl fmt::Display for ProxyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::ManifestPersisted => "manifest-persisted",
            Self::OverlayBuilt => "overlay-built",
            Self::Direct => "direct",
            Self::BothRunning => "both-running",
            Self::Joined => "joined",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The post-render filter invoked by the templating tool.
pub struct PostRenderProxy {
    runner: Arc<dyn ProcessRunner>,
    dir: PathBuf,
    overlay: OverlaySource,
    kustomize_command: String,
    kustomize_build_args: Vec<String>,
    post_renderer: Option<String>,
    post_renderer_args: Vec<String>,
    stdout: Option<BoxedWriter>,
    state: ProxyState,
}

impl PostRenderProxy {
    /// Create a filter working in `dir`, using a prepared specification.
    pub fn new(runner: Arc<dyn ProcessRunner>, dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            dir: dir.into(),
            overlay: OverlaySource::Prepared,
            kustomize_command: DEFAULT_KUSTOMIZE_COMMAND.to_string(),
            kustomize_build_args: Vec::new(),
            post_renderer: None,
            post_renderer_args: Vec::new(),
            stdout: None,
            state: ProxyState::Start,
        }
    }

    /// Build the specification from these patch documents instead.
    pub fn patches(mut self, patches: Vec<Vec<u8>>) -> Self {
        self.overlay = OverlaySource::Patches(patches);
        self
    }

    pub fn kustomize_command(mut self, command: impl Into<String>) -> Self {
        self.kustomize_command = command.into();
        self
    }

    /// Extra arguments appended after `build <dir>`.
    pub fn kustomize_build_args(mut self, args: Vec<String>) -> Self {
        self.kustomize_build_args = args;
        self
    }

    /// Chain the overlay output into another post-renderer.
    ///
    /// An empty command leaves the filter unchained.
    pub fn chain(mut self, command: impl Into<String>, args: Vec<String>) -> Self {
        let command = command.into();
        self.post_renderer = (!command.is_empty()).then_some(command);
        self.post_renderer_args = args;
        self
    }

    /// Send the final output here instead of this process's stdout.
    pub fn stdout(mut self, stdout: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.stdout = Some(Box::new(stdout));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> ProxyState {
        self.state
    }

    fn transition(&mut self, state: ProxyState) {
        debug!("post-render {} -> {}", self.state, state);
        self.state = state;
    }

    /// Run the filter over `manifests` to completion.
    pub async fn run<R>(&mut self, cancel: &CancellationToken, manifests: R) -> KustomizeResult<()>
    where
        R: AsyncRead + Unpin,
    {
        let result = self.run_stages(cancel, manifests).await;
        let end = if result.is_ok() { ProxyState::Done } else { ProxyState::Failed };
        self.transition(end);
        result
    }

    async fn run_stages<R>(&mut self, cancel: &CancellationToken, manifests: R) -> KustomizeResult<()>
    where
        R: AsyncRead + Unpin,
    {
        let manifests_path = OverlaySpecBuilder::write_manifest(&self.dir, manifests).await?;
        self.transition(ProxyState::ManifestPersisted);

        let result = self.build_and_filter(cancel).await;

        if let Err(e) = tokio::fs::remove_file(&manifests_path).await {
            warn!("Failed to remove {:?}: {}", manifests_path, e);
        }

        result
    }

    async fn build_and_filter(&mut self, cancel: &CancellationToken) -> KustomizeResult<()> {
        self.prepare_overlay()?;
        self.transition(ProxyState::OverlayBuilt);

        let dir = self
            .dir
            .to_str()
            .ok_or_else(|| KustomizeError::NonUtf8Path(self.dir.clone()))?;
        let mut build_args = vec!["build".to_string(), dir.to_string()];
        build_args.extend(self.kustomize_build_args.iter().cloned());

        match self.post_renderer.clone() {
            None => self.run_direct(cancel, &build_args).await,
            Some(post_renderer) => self.run_chained(cancel, &build_args, post_renderer).await,
        }
    }

    fn prepare_overlay(&self) -> KustomizeResult<()> {
        match &self.overlay {
            OverlaySource::Prepared => {
                let path = self.dir.join(KUSTOMIZATION_FILE);
                if !path.is_file() {
                    return Err(KustomizeError::MissingSpec(path));
                }
                Ok(())
            }
            OverlaySource::Patches(patches) => {
                let kustomization = OverlaySpecBuilder::merge(patches)?;
                OverlaySpecBuilder::write_spec(&self.dir, &kustomization)?;
                Ok(())
            }
        }
    }

    async fn run_direct(&mut self, cancel: &CancellationToken, build_args: &[String]) -> KustomizeResult<()> {
        self.transition(ProxyState::Direct);

        let mut options = RunOptions::new();
        options.stdout = self.stdout.take();

        self.runner
            .run(cancel, &self.kustomize_command, build_args, options)
            .await
            .map_err(KustomizeError::OverlayBuild)
    }

    async fn run_chained(
        &mut self,
        cancel: &CancellationToken,
        build_args: &[String],
        post_renderer: String,
    ) -> KustomizeResult<()> {
        info!("Chaining post-renderer {}", post_renderer);
        self.transition(ProxyState::BothRunning);

        let (writer, reader) = pipe();
        let (done_tx, done_rx) = oneshot::channel();

        let mut chained_options = RunOptions::new().stdin(reader);
        chained_options.stdout = self.stdout.take();

        let runner = Arc::clone(&self.runner);
        let chained_cancel = cancel.clone();
        let chained_args = self.post_renderer_args.clone();
        tokio::spawn(async move {
            let result = runner
                .run(&chained_cancel, &post_renderer, &chained_args, chained_options)
                .await;
            let _ = done_tx.send(result);
        });

        let built = self
            .runner
            .run(
                cancel,
                &self.kustomize_command,
                build_args,
                RunOptions::new().stdout(writer.clone()),
            )
            .await;

        // Only now has the producer finished writing.
        match &built {
            Ok(()) => writer.close(),
            Err(e) => {
                writer
                    .close_with_error(io::Error::new(
                        io::ErrorKind::Other,
                        format!("overlay build failed: {}", e),
                    ))
                    .await
            }
        }

        let chained = done_rx.await.unwrap_or_else(|_| {
            Err(RunnerError::Io(io::Error::new(
                io::ErrorKind::Other,
                "post-renderer task ended without a result",
            )))
        });
        self.transition(ProxyState::Joined);

        settle_chain(built, chained)
    }
}

/// Pick the filter's outcome from both processes.
///
/// The chained filter's own failure wins; a chained failure that only
/// reflects the overlay error arriving through the pipe defers to it.
fn settle_chain(
    built: Result<(), RunnerError>,
    chained: Result<(), RunnerError>,
) -> KustomizeResult<()> {
    match (built, chained) {
        (Err(built), Err(RunnerError::Pipe { .. })) => Err(KustomizeError::OverlayBuild(built)),
        (_, Err(chained)) => Err(KustomizeError::ChainedFilter(chained)),
        (Err(built), Ok(())) => Err(KustomizeError::OverlayBuild(built)),
        (Ok(()), Ok(())) => Ok(()),
    }
}
