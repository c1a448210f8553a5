use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::acquire::Acquirer;
use crate::load_config::load_config;
use crate::server::serve;

/// CLI for rendergit: flatten a git repository into one HTML page.
#[derive(Parser)]
#[clap(
    name = "rendergit",
    version,
    about = "Render a remote git repository as a single HTML page, once or as an HTTP service"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the render endpoint over HTTP
    Serve {
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Address to bind, overriding the config file
        #[clap(long)]
        bind: Option<String>,
    },
    /// Render one repository and write the HTML page
    Render {
        /// Repository URL to clone (or download as an archive)
        repo_url: String,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Per-file byte budget
        #[clap(long)]
        max_bytes: Option<u64>,
        /// Output file; stdout when omitted
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let result = match cli.command {
        Commands::Serve { config, bind } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            serve(&config).await
        }
        Commands::Render {
            repo_url,
            config,
            max_bytes,
            output,
        } => {
            let config = load_config(config.as_deref())?;
            let max_bytes = max_bytes
                .filter(|n| *n > 0)
                .unwrap_or(config.render.default_max_bytes);
            render_once(&config.acquire, &repo_url, max_bytes, output).await
        }
    };

    let exit_span = tracing::info_span!("exit");
    exit_span.in_scope(|| {
        tracing::info!(ok = result.is_ok(), "exiting");
    });

    result
}

async fn render_once(
    config: &crate::config::AcquireConfig,
    repo_url: &str,
    max_bytes: u64,
    output: Option<PathBuf>,
) -> Result<()> {
    let acquirer = Acquirer::from_config(config).context("Failed to build repository acquirer")?;
    let page = acquirer
        .acquire(repo_url, max_bytes)
        .await
        .with_context(|| format!("Failed to render {repo_url}"))?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, page.as_str())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Wrote rendered page");
        }
        None => println!("{}", page.as_str()),
    }
    Ok(())
}
