use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::acquire::archive::{
    DEFAULT_ARCHIVE_BASE_URL, DEFAULT_ARCHIVE_MAX_BYTES, DEFAULT_ARCHIVE_TIMEOUT,
};
use crate::render::MAX_DEFAULT_BYTES;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub render: RenderConfig,
    pub acquire: AcquireConfig,
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    pub fn trace_loaded(&self) {
        info!(
            bind = %self.server.bind,
            default_max_bytes = self.render.default_max_bytes,
            archive_base_url = %self.acquire.archive_base_url,
            clone_timeout_secs = ?self.acquire.clone_timeout_secs,
            "Loaded config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Byte budget used when a request omits `max_bytes` or sends garbage.
    pub default_max_bytes: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_max_bytes: MAX_DEFAULT_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquireConfig {
    pub git_binary: String,
    /// `None` leaves the clone unbounded.
    pub clone_timeout_secs: Option<u64>,
    pub archive_base_url: String,
    pub archive_timeout_secs: u64,
    /// Largest snapshot archive accepted, in bytes.
    pub archive_max_bytes: u64,
    /// Parent directory for per-request workspaces; system temp dir when `None`.
    pub workspace_root: Option<PathBuf>,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            git_binary: "git".to_string(),
            clone_timeout_secs: None,
            archive_base_url: DEFAULT_ARCHIVE_BASE_URL.to_string(),
            archive_timeout_secs: DEFAULT_ARCHIVE_TIMEOUT.as_secs(),
            archive_max_bytes: DEFAULT_ARCHIVE_MAX_BYTES,
            workspace_root: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Put the raw failure text into 500 bodies instead of a generic message.
    pub expose_error_details: bool,
    /// Apply the http/https scheme check to body-style requests too.
    pub validate_body_scheme: bool,
}
