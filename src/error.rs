//! Error types
//!
//! Load failures are fatal to one load attempt and stop at the caller of
//! [`crate::DatasetStore`]. Query misses are ordinary values of
//! [`QueryError`] that callers branch on.

use thiserror::Error;

/// A dataset (or review) payload could not be obtained or decoded
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source could not be read at all
    #[error("dataset source {origin} is unreachable: {source}")]
    Unreachable {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    /// The payload is not an array of `{drugName, sideEffects}` records
    #[error("dataset from {origin} is not an array of drug records: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// A CSV score table is missing columns, fields or valid scores
    #[error("score table {origin} rejected: {message}")]
    Table { origin: String, message: String },

    /// An injected fetch function reported a failure
    #[error("fetching {origin} failed: {message}")]
    Fetch { origin: String, message: String },
}

impl LoadError {
    /// Where the failed payload was supposed to come from
    pub fn origin(&self) -> &str {
        match self {
            LoadError::Unreachable { origin, .. }
            | LoadError::Malformed { origin, .. }
            | LoadError::Table { origin, .. }
            | LoadError::Fetch { origin, .. } => origin,
        }
    }
}

/// A lookup named something the loaded data does not contain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Drug \"{0}\" not found.")]
    DrugNotFound(String),

    #[error("No reviews found for drug \"{0}\".")]
    ReviewsNotFound(String),
}
