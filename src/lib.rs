//! Drug Side-Effect Association Engine
//!
//! Ranked lookups between drugs and their reported side effects.
//!
//! - `dataset`: loading drug records (JSON sources, CSV score tables) behind
//!   a load-once store
//! - `association_index`: forward/reverse index and ranking queries
//! - `reviews`: patient comments grouped by drug and side effect
//! - `api_server`: read-only HTTP API (feature `api`)

pub mod utils;
pub mod error;
pub mod score;
pub mod dataset;
pub mod association_index;
pub mod reviews;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use error::{LoadError, QueryError};
pub use score::parse_score;
pub use dataset::{
    BytesSource, Dataset, DatasetSource, DatasetStore, DrugRecord, FileSource, LoadState,
    ScoreColumns,
};
pub use association_index::{
    AssociationIndex, EffectRanking, IndexStats, RankedEntry, DEFAULT_RANKED_DRUGS,
    DEFAULT_TOP_EFFECTS,
};
pub use reviews::{DrugReviews, ReviewGroup, ReviewStore};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState, ServerConfig};
