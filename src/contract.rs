//! # contract: seams between the pipeline stages
//!
//! This module holds the traits the acquisition pipeline is assembled from,
//! together with the plain data passed between them:
//! - [`Cloner`]: direct version-control clone plus head revision lookup.
//! - [`ArchiveFetcher`]: downloads a snapshot archive as raw bytes.
//! - [`Renderer`]: turns a local directory into a single HTML document.
//! - [`PageGenerator`]: the whole acquire-then-render pipeline, as seen by
//!   the request dispatcher.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall` so tests can replace real git,
//!   network and rendering with deterministic mocks.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{AcquireError, CloneError, FetchError, RenderError};

/// Revision reported when the repository was obtained without version-control metadata.
pub const UNKNOWN_REVISION: &str = "(unknown)";

/// Which strategy produced a repository directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Clone,
    Archive,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Clone => f.write_str("clone"),
            Strategy::Archive => f.write_str("archive"),
        }
    }
}

/// A usable repository directory inside one request's workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionResult {
    pub directory: PathBuf,
    pub revision: String,
    pub strategy: Strategy,
}

/// Body of one collected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    /// Not valid UTF-8 or contains NUL bytes.
    Binary,
    /// Larger than the byte budget; content was not read.
    TooLarge,
}

/// A single file found in the repository directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    pub size: u64,
    pub content: FileContent,
}

/// Rendered HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage(String);

impl RenderedPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Direct clone of a remote repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Cloner: Send + Sync {
    /// Populate `destination` with a checkout of `url`.
    async fn clone_repo(&self, url: &str, destination: &Path) -> Result<(), CloneError>;

    /// Current head revision of a checkout.
    async fn head_revision(&self, path: &Path) -> Result<String, CloneError>;
}

/// Download of a snapshot archive.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Turns a repository directory into an HTML document.
///
/// Implementations do blocking filesystem work; callers run them off the
/// async executor.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Renderer: Send + Sync {
    fn collect_files(&self, directory: &Path, max_bytes: u64) -> Result<Vec<FileInfo>, RenderError>;

    fn build_html(
        &self,
        repo_url: &str,
        directory: &Path,
        revision: &str,
        files: &[FileInfo],
    ) -> Result<RenderedPage, RenderError>;
}

/// The full pipeline: acquire a repository, render it, clean up.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PageGenerator: Send + Sync {
    async fn generate(&self, repo_url: &str, max_bytes: u64) -> Result<RenderedPage, AcquireError>;
}
