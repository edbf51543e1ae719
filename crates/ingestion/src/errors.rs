//! Ingestion error types

use paperpulse_common::errors::AppError;
use thiserror::Error;

/// Failure to retrieve the raw feed. Fatal to a run, never retried here.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Feed returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Feed unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Store error: {0}")]
    Store(#[from] AppError),

    #[error("IO error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        AppError::Feed {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_maps_to_feed_error() {
        let err: AppError = FetchError::Status {
            status: 503,
            body: "down".into(),
        }
        .into();
        assert!(matches!(err, AppError::Feed { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_ingestion_error_wraps_sources() {
        let fetch: IngestionError = FetchError::Unavailable("offline".into()).into();
        assert!(matches!(fetch, IngestionError::Fetch(_)));
        assert_eq!(fetch.to_string(), "Feed unavailable: offline");

        let store: IngestionError = AppError::DatabaseConnection {
            message: "refused".into(),
        }
        .into();
        assert!(matches!(store, IngestionError::Store(_)));
        assert_eq!(
            store.to_string(),
            "Store error: Database connection error: refused"
        );
    }
}
