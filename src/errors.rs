// src/errors.rs

//! Crate-wide error type and aliases.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A transform step failed on one file; the asset set run is aborted.
    #[error("asset set '{asset}': transform failed on {path:?}: {cause}")]
    Transform {
        asset: String,
        path: PathBuf,
        cause: String,
    },

    /// The destination could not be written.
    #[error("asset set '{asset}': cannot write {path:?}: {cause}")]
    Write {
        asset: String,
        path: PathBuf,
        cause: String,
    },

    #[error("cannot remove output directory {path:?}: {cause}")]
    Clean { path: PathBuf, cause: String },

    #[error("cannot bind dev server to {addr}: {source}")]
    ServerBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;
