use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No committed index exists at the location. Distinct from an empty result set.
    #[error("No index found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Index location is locked by another build ({})", .0.display())]
    IndexLocked(PathBuf),

    #[error("Storage fault while {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("Query construction failed: {0}")]
    Query(String),

    #[error(transparent)]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn storage<E>(context: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Storage { context: context.into(), source: source.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
