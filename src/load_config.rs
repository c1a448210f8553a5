use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing::{error, info};

use crate::config::AppConfig;

pub const ENV_BIND: &str = "RENDERGIT_BIND";
pub const ENV_MAX_BYTES: &str = "RENDERGIT_MAX_BYTES";

/// Loads an optional YAML config file and applies environment overrides.
/// Without a path, starts from defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => {
            info!("No config file given, using defaults");
            AppConfig::default()
        }
    };

    apply_env_overrides(&mut config)?;

    if config.render.default_max_bytes == 0 {
        error!("render.default_max_bytes must be positive");
        anyhow::bail!("render.default_max_bytes must be a positive integer");
    }

    config.trace_loaded();
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<AppConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow::anyhow!("Failed to read config file {:?}: {}", path, e));
        }
    };

    // An empty file is a valid "all defaults" config.
    if content.trim().is_empty() {
        return Ok(AppConfig::default());
    }

    match serde_yaml::from_str(&content) {
        Ok(conf) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

fn apply_env_overrides(config: &mut AppConfig) -> Result<()> {
    if let Ok(bind) = std::env::var(ENV_BIND) {
        info!(bind = %bind, "{ENV_BIND} found in env");
        config.server.bind = bind;
    }

    if let Ok(var) = std::env::var(ENV_MAX_BYTES) {
        match var.trim().parse::<u64>() {
            Ok(n) if n > 0 => {
                info!(max_bytes = n, "{ENV_MAX_BYTES} found in env");
                config.render.default_max_bytes = n;
            }
            Ok(_) => {
                error!(var = ?var, "{ENV_MAX_BYTES} must be positive");
                anyhow::bail!("{ENV_MAX_BYTES} must be a positive integer");
            }
            Err(e) => {
                error!(error = ?e, var = ?var, "{ENV_MAX_BYTES} must be a valid integer");
                return Err(anyhow::anyhow!("{ENV_MAX_BYTES} must be a valid integer: {e}"));
            }
        }
    }
    Ok(())
}
