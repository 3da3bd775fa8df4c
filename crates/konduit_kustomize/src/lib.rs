//! # konduit_kustomize
//!
//! Kustomize integration for konduit.
//!
//! This crate owns the working-directory layout shared between the
//! top-level invocation and the post-render filter, and the filter itself.
//!
//! ## Features
//!
//! - Merge patch documents into a single `kustomization.yaml`
//! - Exclusive-create persistence of manifests and specification
//! - Post-render filter that runs `kustomize build`, optionally chained
//!   into a user post-renderer through an in-memory pipe
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use konduit_kustomize::PostRenderProxy;
//! use konduit_runner::{CancellationToken, OsRunner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut proxy = PostRenderProxy::new(Arc::new(OsRunner::new()), "/tmp/konduit-1234")
//!     .patches(vec![b"namePrefix: test-\n".to_vec()])
//!     .chain("./bin/renderer", vec!["--flag".to_string()]);
//!
//! proxy.run(&CancellationToken::new(), tokio::io::stdin()).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod proxy;
pub mod spec;

pub use error::{KustomizeError, KustomizeResult};
pub use proxy::{OverlaySource, PostRenderProxy, ProxyState, DEFAULT_KUSTOMIZE_COMMAND};
pub use spec::{create_exclusive, Kustomization, OverlaySpecBuilder, KUSTOMIZATION_FILE, MANIFESTS_FILE};
