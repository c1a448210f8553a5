//! Error types shared across the acquisition pipeline and the dispatcher.

use thiserror::Error;

/// Failure of the direct version-control clone.
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("git {command} exited with {status}: {stderr}")]
    Failed {
        command: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("git clone timed out after {0} seconds")]
    TimedOut(u64),
    #[error("git rev-parse returned an empty revision")]
    EmptyRevision,
}

/// Failure while downloading a snapshot archive.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("archive request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("archive request returned status {0}")]
    Status(u16),
    #[error("archive exceeds {0} bytes")]
    TooLarge(u64),
}

/// Failure inside the renderer (file collection or HTML build).
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("io error while collecting files: {0}")]
    Io(#[from] std::io::Error),
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

/// Failure of the whole acquire-and-render pipeline for one request.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("failed to create workspace: {0}")]
    Workspace(#[source] std::io::Error),
    /// Every strategy failed; carries the reason reported by the first one.
    #[error("{0}")]
    Exhausted(String),
    #[error("{0}")]
    Render(#[from] RenderError),
    #[error("render task did not complete: {0}")]
    Join(String),
}

/// Caller-facing input problems. These map to 4xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("missing repo_url")]
    MissingRepoUrl,
    #[error("repo_url must start with http:// or https://")]
    BadScheme,
}
