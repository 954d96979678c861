//! Error types for index construction and configuration.

use crate::DocId;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for everything that can abort a build.
#[derive(Error, Debug)]
pub enum Error {
    #[error("input error: {0}")]
    Input(#[from] InputError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A block budget that could never be satisfied.
    #[error("block budget `{budget}` must be greater than zero")]
    ResourceExhaustion { budget: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Problems with the document stream itself.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("duplicate document id: {0}")]
    DuplicateDocId(DocId),

    #[error("duplicate external document id: {0}")]
    DuplicateExternalId(String),

    #[error("document at position {position} has no id")]
    MissingId { position: usize },

    #[error("malformed document at position {position}: {reason}")]
    Malformed { position: usize, reason: String },
}

/// Invalid analyzer or build configuration, reported before any document is read.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown pipeline stage: {0}")]
    UnknownStage(String),

    #[error("cannot load stopword list {path}: {source}")]
    StopwordResource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
