use wordstat_common::error::FetchError;

use crate::model::QueryFailure;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Outcome of a run that cannot produce a report.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("no data to report: all {} queries failed", .failures.len())]
    NoData { failures: Vec<QueryFailure> },
}
