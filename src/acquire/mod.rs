//! Acquisition pipeline: obtain a repository directory, then render it.
//!
//! An [`Acquirer`] owns an ordered list of [`AcquisitionStrategy`] values
//! (direct clone first, snapshot archive second) and a [`Renderer`]. For
//! each call it:
//!   - opens a fresh [`Workspace`]
//!   - evaluates strategies in order, stopping at the first success
//!   - if all fail, reports the *first* strategy's failure reason
//!   - hands the directory and revision to the renderer
//!   - closes the workspace on every exit path
//!
//! The acquirer holds no per-request state and is shared across
//! concurrent requests; isolation comes from each call's own workspace.

pub mod archive;
pub mod git;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::AcquireConfig;
use crate::contract::{
    AcquisitionResult, Cloner, PageGenerator, RenderedPage, Renderer, Strategy, UNKNOWN_REVISION,
};
use crate::error::{AcquireError, FetchError, RenderError};
use crate::render::HtmlRenderer;
use crate::workspace::Workspace;

pub use archive::{ArchiveFallback, HttpArchiveFetcher};
pub use git::GitCli;

/// Outcome of one strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Succeeded { directory: PathBuf, revision: String },
    Failed(String),
}

/// One way of getting a repository onto local disk.
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    fn kind(&self) -> Strategy;

    async fn attempt(&self, repo_url: &str, workspace: &Workspace) -> Attempt;
}

/// Direct clone, followed by a head revision lookup.
pub struct CloneStrategy {
    cloner: Arc<dyn Cloner>,
}

impl CloneStrategy {
    pub fn new(cloner: Arc<dyn Cloner>) -> Self {
        Self { cloner }
    }
}

#[async_trait]
impl AcquisitionStrategy for CloneStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Clone
    }

    async fn attempt(&self, repo_url: &str, workspace: &Workspace) -> Attempt {
        let dest = workspace.clone_dir();
        if let Err(e) = self.cloner.clone_repo(repo_url, &dest).await {
            return Attempt::Failed(e.to_string());
        }
        match self.cloner.head_revision(&dest).await {
            Ok(revision) => Attempt::Succeeded {
                directory: dest,
                revision,
            },
            Err(e) => Attempt::Failed(e.to_string()),
        }
    }
}

/// Snapshot archive download. Always reports [`UNKNOWN_REVISION`].
pub struct ArchiveStrategy {
    fallback: ArchiveFallback,
}

impl ArchiveStrategy {
    pub fn new(fallback: ArchiveFallback) -> Self {
        Self { fallback }
    }
}

#[async_trait]
impl AcquisitionStrategy for ArchiveStrategy {
    fn kind(&self) -> Strategy {
        Strategy::Archive
    }

    async fn attempt(&self, repo_url: &str, workspace: &Workspace) -> Attempt {
        match self
            .fallback
            .try_archive(repo_url, &workspace.archive_dir())
            .await
        {
            Some(directory) => Attempt::Succeeded {
                directory,
                revision: UNKNOWN_REVISION.to_string(),
            },
            None => Attempt::Failed("no archive candidate could be downloaded".to_string()),
        }
    }
}

pub struct Acquirer {
    strategies: Vec<Box<dyn AcquisitionStrategy>>,
    renderer: Arc<dyn Renderer>,
    workspace_root: Option<PathBuf>,
}

impl Acquirer {
    pub fn new(
        strategies: Vec<Box<dyn AcquisitionStrategy>>,
        renderer: Arc<dyn Renderer>,
        workspace_root: Option<PathBuf>,
    ) -> Self {
        Self {
            strategies,
            renderer,
            workspace_root,
        }
    }

    /// Clone-then-archive acquirer with the default HTML renderer.
    pub fn from_config(config: &AcquireConfig) -> Result<Self, AcquireSetupError> {
        let git = GitCli::new(config.git_binary.clone())
            .with_timeout(config.clone_timeout_secs.map(Duration::from_secs));
        let fetcher = HttpArchiveFetcher::new(Duration::from_secs(config.archive_timeout_secs))?
            .with_max_bytes(config.archive_max_bytes);
        let strategies: Vec<Box<dyn AcquisitionStrategy>> = vec![
            Box::new(CloneStrategy::new(Arc::new(git))),
            Box::new(ArchiveStrategy::new(ArchiveFallback::new(
                Arc::new(fetcher),
                config.archive_base_url.clone(),
            ))),
        ];
        let renderer = HtmlRenderer::new()?;
        Ok(Self::new(
            strategies,
            Arc::new(renderer),
            config.workspace_root.clone(),
        ))
    }

    /// Run the strategies in order inside `workspace`.
    pub async fn resolve(
        &self,
        repo_url: &str,
        workspace: &Workspace,
    ) -> Result<AcquisitionResult, AcquireError> {
        let mut first_failure: Option<String> = None;
        for strategy in &self.strategies {
            let kind = strategy.kind();
            match strategy.attempt(repo_url, workspace).await {
                Attempt::Succeeded {
                    directory,
                    revision,
                } => {
                    info!(
                        repo_url = repo_url,
                        strategy = %kind,
                        revision = %revision,
                        path = %directory.display(),
                        "Repository acquired"
                    );
                    return Ok(AcquisitionResult {
                        directory,
                        revision,
                        strategy: kind,
                    });
                }
                Attempt::Failed(reason) => {
                    warn!(
                        repo_url = repo_url,
                        strategy = %kind,
                        reason = %reason,
                        "Acquisition strategy failed"
                    );
                    if first_failure.is_none() {
                        first_failure = Some(reason);
                    }
                }
            }
        }
        Err(AcquireError::Exhausted(first_failure.unwrap_or_else(|| {
            "no acquisition strategy configured".to_string()
        })))
    }

    /// Acquire `repo_url` and render it, with `max_bytes` as the per-file budget.
    pub async fn acquire(
        &self,
        repo_url: &str,
        max_bytes: u64,
    ) -> Result<RenderedPage, AcquireError> {
        let workspace =
            Workspace::open(self.workspace_root.as_deref()).map_err(AcquireError::Workspace)?;
        let result = self.acquire_in(repo_url, max_bytes, &workspace).await;
        workspace.close();
        if let Err(e) = &result {
            error!(repo_url = repo_url, error = %e, "Failed to render repository");
        }
        result
    }

    async fn acquire_in(
        &self,
        repo_url: &str,
        max_bytes: u64,
        workspace: &Workspace,
    ) -> Result<RenderedPage, AcquireError> {
        let acquired = self.resolve(repo_url, workspace).await?;

        let renderer = Arc::clone(&self.renderer);
        let repo_url_owned = repo_url.to_string();
        let page = tokio::task::spawn_blocking(move || -> Result<RenderedPage, RenderError> {
            let files = renderer.collect_files(&acquired.directory, max_bytes)?;
            info!(
                files = files.len(),
                max_bytes = max_bytes,
                "Collected repository files"
            );
            renderer.build_html(
                &repo_url_owned,
                &acquired.directory,
                &acquired.revision,
                &files,
            )
        })
        .await
        .map_err(|e| AcquireError::Join(e.to_string()))??;

        info!(repo_url = repo_url, bytes = page.as_str().len(), "Rendered repository page");
        Ok(page)
    }
}

#[async_trait]
impl PageGenerator for Acquirer {
    async fn generate(&self, repo_url: &str, max_bytes: u64) -> Result<RenderedPage, AcquireError> {
        self.acquire(repo_url, max_bytes).await
    }
}

/// Failure building the default acquirer.
#[derive(Debug, thiserror::Error)]
pub enum AcquireSetupError {
    #[error("failed to build archive client: {0}")]
    Client(#[from] FetchError),
    #[error("failed to build renderer: {0}")]
    Renderer(#[from] RenderError),
}
