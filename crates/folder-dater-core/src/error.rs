use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Target path does not exist: {}", .0.display())]
    TargetNotFound(PathBuf),

    #[error("Target path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("No free name for {} after {attempts} attempts", .path.display())]
    ConflictExhausted { path: PathBuf, attempts: u32 },

    #[error("Rename {} -> {} failed: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Report serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
