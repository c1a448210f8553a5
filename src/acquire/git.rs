use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::contract::Cloner;
use crate::error::CloneError;

/// [`Cloner`] backed by the `git` command line client.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    timeout: Option<Duration>,
}

impl GitCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Bound the clone. Without a timeout a clone may block indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

#[async_trait]
impl Cloner for GitCli {
    async fn clone_repo(&self, url: &str, destination: &Path) -> Result<(), CloneError> {
        // `git clone --depth 1 <url> <destination>`
        let mut cmd = self.command();
        cmd.arg("clone").arg("--depth").arg("1").arg(url).arg(destination);

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(res) => res,
                Err(_) => {
                    warn!(
                        repo_url = url,
                        timeout_secs = limit.as_secs(),
                        "git clone timed out"
                    );
                    return Err(CloneError::TimedOut(limit.as_secs()));
                }
            },
            None => cmd.output().await,
        };
        let output = output.map_err(|source| CloneError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(
                repo_url = url,
                path = %destination.display(),
                status = ?output.status,
                stderr = %stderr,
                "git clone exited with non-zero code"
            );
            return Err(CloneError::Failed {
                command: "clone",
                status: output.status,
                stderr,
            });
        }

        info!(
            repo_url = url,
            path = %destination.display(),
            "Successfully cloned git repository"
        );
        Ok(())
    }

    async fn head_revision(&self, path: &Path) -> Result<String, CloneError> {
        let output = self
            .command()
            .arg("-C")
            .arg(path)
            .arg("rev-parse")
            .arg("HEAD")
            .output()
            .await
            .map_err(|source| CloneError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CloneError::Failed {
                command: "rev-parse",
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if revision.is_empty() {
            return Err(CloneError::EmptyRevision);
        }
        Ok(revision)
    }
}
