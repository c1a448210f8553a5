#![doc = "rendergit: render a remote git repository as a single HTML page."]

//! The pipeline, leaves first:
//! - [`url_parser`]: owner/repo/ref from hosting-service URLs
//! - [`acquire::archive`]: snapshot-archive fallback
//! - [`workspace`]: per-request temporary directory
//! - [`acquire`]: clone, else archive, then render
//! - [`dispatch`]: request validation and response mapping
//! - [`server`]: axum routes over the dispatcher

pub mod acquire;
pub mod cli;
pub mod config;
pub mod contract;
pub mod dispatch;
pub mod error;
pub mod load_config;
pub mod render;
pub mod server;
pub mod url_parser;
pub mod workspace;

pub use cli::{run, Cli, Commands};
