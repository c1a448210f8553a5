//! Snapshot-archive fallback for repositories that cannot be cloned.
//!
//! Given a hosting-service URL, downloads
//! `{base}/{owner}/{repo}/zip/refs/heads/{ref}` for each candidate ref in
//! order (the URL's own ref, then `main`, then `master`) and extracts the
//! first archive that succeeds. Candidate failures are never surfaced; the
//! caller only learns whether some candidate produced a directory.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::contract::ArchiveFetcher;
use crate::error::FetchError;
use crate::url_parser::{self, RepoRef};

pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://codeload.github.com";
pub const DEFAULT_ARCHIVE_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_ARCHIVE_MAX_BYTES: u64 = 256 * 1024 * 1024;

const DEFAULT_REFS: [&str; 2] = ["main", "master"];

/// [`ArchiveFetcher`] over HTTP with a per-request timeout and a body size cap.
#[derive(Debug, Clone)]
pub struct HttpArchiveFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpArchiveFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rendergit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            max_bytes: DEFAULT_ARCHIVE_MAX_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        if resp.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(FetchError::TooLarge(self.max_bytes));
        }

        // The cap also applies when Content-Length is absent.
        let mut data = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if data.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }
}

/// Ordered, de-duplicated list of refs to try.
pub fn candidate_refs(reference: Option<&str>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    for r in reference.into_iter().chain(DEFAULT_REFS) {
        if !r.is_empty() && !candidates.iter().any(|c| c == r) {
            candidates.push(r.to_string());
        }
    }
    candidates
}

pub struct ArchiveFallback {
    fetcher: Arc<dyn ArchiveFetcher>,
    base_url: String,
}

impl ArchiveFallback {
    pub fn new(fetcher: Arc<dyn ArchiveFetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn archive_url(&self, owner: &str, repo: &str, reference: &str) -> String {
        format!(
            "{}/{}/{}/zip/refs/heads/{}",
            self.base_url, owner, repo, reference
        )
    }

    /// Download and extract an archive of `repo_url` into `dest_dir`.
    ///
    /// Returns the extracted top-level directory, or `None` when the URL is
    /// unparseable or every candidate fails.
    pub async fn try_archive(&self, repo_url: &str, dest_dir: &Path) -> Option<PathBuf> {
        let (owner, repo, reference) = match url_parser::parse(repo_url) {
            RepoRef::Parsed {
                owner,
                repo,
                reference,
            } => (owner, repo, reference),
            RepoRef::Unparseable => {
                debug!(repo_url = repo_url, "No owner/repo in URL; skipping archive fallback");
                return None;
            }
        };

        for candidate in candidate_refs(reference.as_deref()) {
            let zip_url = self.archive_url(&owner, &repo, &candidate);
            debug!(url = %zip_url, reference = %candidate, "Trying archive candidate");

            let data = match self.fetcher.fetch(&zip_url).await {
                Ok(data) => data,
                Err(e) => {
                    debug!(url = %zip_url, error = %e, "Archive download failed");
                    continue;
                }
            };

            let dest = dest_dir.to_path_buf();
            let extracted =
                tokio::task::spawn_blocking(move || extract_archive(&data, &dest)).await;
            match extracted {
                Ok(Ok(Some(dir))) => {
                    info!(
                        url = %zip_url,
                        path = %dir.display(),
                        "Extracted repository archive"
                    );
                    return Some(dir);
                }
                Ok(Ok(None)) => {
                    debug!(url = %zip_url, "Archive contained no top-level directory");
                }
                Ok(Err(e)) => {
                    debug!(url = %zip_url, error = %e, "Archive extraction failed");
                }
                Err(e) => {
                    warn!(url = %zip_url, error = %e, "Archive extraction task failed");
                }
            }
        }
        None
    }
}

/// Validate and extract a zip archive into a freshly emptied `dest_dir`,
/// returning its lexicographically first top-level directory.
fn extract_archive(data: &[u8], dest_dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    if dest_dir.exists() {
        std::fs::remove_dir_all(dest_dir)?;
    }
    std::fs::create_dir_all(dest_dir)?;

    archive
        .extract(dest_dir)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dest_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            subdirs.push(path);
        }
    }
    subdirs.sort();
    Ok(subdirs.into_iter().next())
}
