use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the Gerrit stats pipeline.
#[derive(Error, Debug)]
pub enum StatsError {
    /// The raw change payload was missing or empty.
    #[error("Empty json data, cannot continue")]
    EmptyInput,

    /// The payload is not valid relaxed JSON, even after sanitization.
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] json5::Error),

    /// The payload parsed but does not hold a list of change records.
    #[error("Invalid change payload: {0}")]
    InvalidPayload(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written to disk.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted store exists but its content cannot be decoded.
    #[error("Corrupt store file {path}: {source}")]
    StoreDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the gstats crates.
pub type Result<T> = std::result::Result<T, StatsError>;
