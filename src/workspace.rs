use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "rendergit_";

/// A uniquely named temporary directory owned by exactly one request.
///
/// The directory is removed by [`Workspace::close`] or, on any other exit
/// path, when the value is dropped. Removal errors are ignored.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace under `root`, or under the system temp dir when `None`.
    pub fn open(root: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path().display(), "Opened workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Destination for a direct clone.
    pub fn clone_dir(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    /// Destination for archive extraction.
    pub fn archive_dir(&self) -> PathBuf {
        self.dir.path().join("archive")
    }

    /// Recursively remove the workspace.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "Closed workspace"),
            Err(e) => warn!(error = ?e, path = %path.display(), "Failed to remove workspace; ignoring"),
        }
    }
}
