//! Extracts owner, repository and optional ref from hosting-service URLs
//! such as `https://github.com/{owner}/{repo}[.git][/tree/{ref}]`.

use tracing::debug;
use url::Url;

/// Path markers after which the next segment names a ref.
const REF_MARKERS: [&str; 4] = ["tree", "commit", "releases", "tags"];

/// Result of parsing a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoRef {
    Parsed {
        owner: String,
        repo: String,
        reference: Option<String>,
    },
    /// The URL did not have a recognizable `{owner}/{repo}` shape.
    Unparseable,
}

impl RepoRef {
    pub fn is_unparseable(&self) -> bool {
        matches!(self, RepoRef::Unparseable)
    }
}

/// Parse a repository URL. Never fails: anything unrecognized is [`RepoRef::Unparseable`].
pub fn parse(url: &str) -> RepoRef {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            debug!(url = url, error = %e, "Repository URL is not an absolute URL");
            return RepoRef::Unparseable;
        }
    };

    let segments: Vec<&str> = parsed
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.len() < 2 {
        return RepoRef::Unparseable;
    }

    let owner = segments[0].to_string();
    let repo = segments[1]
        .strip_suffix(".git")
        .unwrap_or(segments[1])
        .to_string();
    let reference = if segments.len() >= 4 && REF_MARKERS.contains(&segments[2]) {
        Some(segments[3].to_string())
    } else {
        None
    };

    RepoRef::Parsed {
        owner,
        repo,
        reference,
    }
}
