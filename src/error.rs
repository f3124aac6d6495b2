use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Snapshot at {path} is missing or unreadable: {reason}")]
    MissingSourceData { path: PathBuf, reason: String },

    #[error("Couldn't persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid extraction rules: {0}")]
    InvalidRules(String),

    #[error("The selector you are trying to compile is invalid. Selector: {0}")]
    Selector(String),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl Error {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn missing_source(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::MissingSourceData {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
