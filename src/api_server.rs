// Axum API Server Module
//
// Purpose: read-only REST API over the association indexes and reviews.
// All three datasets are loaded once at startup and shared; handlers only
// run index queries.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};

use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use moka::future::Cache;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::association_index::{
    AssociationIndex, RankedEntry, DEFAULT_RANKED_DRUGS, DEFAULT_TOP_EFFECTS,
};
use crate::dataset::{DatasetStore, FileSource};
use crate::reviews::ReviewStore;
use crate::utils::normalize_name;

/// Largest `k` a client may ask for
pub const MAX_K: usize = 50;

// ============================================================================
// Configuration
// ============================================================================

/// Server settings, read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    /// Per-drug reaction counts (top effects per drug)
    pub reactions_file: String,
    /// Side-effect scores (drug rankings per effect)
    pub scores_file: String,
    pub reviews_file: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("website/public/data"),
            reactions_file: "formatted_drug_reactions.json".to_string(),
            scores_file: "drugSideEffectsData.json".to_string(),
            reviews_file: "reviews.json".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// `DATA_DIR`, `REACTIONS_FILE`, `SCORES_FILE`, `REVIEWS_FILE`, `PORT`;
    /// unset or unparseable values fall back to the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            data_dir: var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            reactions_file: var("REACTIONS_FILE").unwrap_or(defaults.reactions_file),
            scores_file: var("SCORES_FILE").unwrap_or(defaults.scores_file),
            reviews_file: var("REVIEWS_FILE").unwrap_or(defaults.reviews_file),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    fn data_path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    /// Index over the reaction-count dataset
    pub reactions: Arc<AssociationIndex>,
    /// Index over the side-effect score dataset
    pub scores: Arc<AssociationIndex>,
    pub reviews: Arc<ReviewStore>,
    pub cache: Cache<String, serde_json::Value>,
}

impl AppState {
    /// Load all datasets and build both indexes
    pub async fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let config = config.clone();
        tokio::task::spawn_blocking(move || Self::load_blocking(&config))
            .await
            .context("Dataset loader task failed")?
    }

    fn load_blocking(config: &ServerConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading reaction counts...");
        let reactions = load_index(config.data_path(&config.reactions_file))?;

        tracing::info!("Loading side-effect scores...");
        let scores = load_index(config.data_path(&config.scores_file))?;

        tracing::info!("Loading reviews...");
        let reviews_path = config.data_path(&config.reviews_file);
        let reviews = ReviewStore::load(&FileSource::new(&reviews_path))
            .with_context(|| format!("Failed to load reviews: {}", reviews_path.display()))?;

        Ok(Self::from_parts(reactions, scores, Arc::new(reviews)))
    }

    /// Assemble state from already-built parts
    pub fn from_parts(
        reactions: Arc<AssociationIndex>,
        scores: Arc<AssociationIndex>,
        reviews: Arc<ReviewStore>,
    ) -> Self {
        tracing::info!("Initializing Moka cache...");
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(300))
            .build();

        Self {
            reactions,
            scores,
            reviews,
            cache,
        }
    }
}

fn load_index(path: PathBuf) -> anyhow::Result<Arc<AssociationIndex>> {
    let mut store = DatasetStore::new();
    store
        .load(&FileSource::new(&path))
        .with_context(|| format!("Failed to load dataset: {}", path.display()))?;
    store
        .index()
        .with_context(|| format!("Dataset not ready: {}", path.display()))
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Drug endpoints
        .route("/api/drugs/:name/top-effects", get(get_top_effects))
        .route("/api/drugs/:name/reviews", get(get_reviews))

        // Side-effect endpoints
        .route("/api/effects", get(get_effect_catalog))
        .route("/api/effects/:name/drugs", get(get_ranked_drugs))

        // Data quality
        .route("/api/stats", get(get_stats))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "drugs": state.reactions.stats().drugs,
        "effects": state.scores.stats().effects,
    }))
}

#[derive(Debug, Deserialize)]
struct RankQuery {
    k: Option<usize>,
}

impl RankQuery {
    fn k_or(&self, default: usize) -> Result<usize, AppError> {
        match self.k {
            None => Ok(default),
            Some(0) => Err(AppError::BadRequest("k must be at least 1".to_string())),
            Some(k) => Ok(k.min(MAX_K)),
        }
    }
}

#[derive(Debug, Serialize)]
struct RankedRow<'a> {
    rank: usize,
    name: &'a str,
    score: f64,
}

fn ranked_rows(entries: &[RankedEntry]) -> Vec<RankedRow<'_>> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| RankedRow {
            rank: i + 1,
            name: &entry.name,
            score: entry.score,
        })
        .collect()
}

/// Top effects for a drug (reaction-count dataset)
async fn get_top_effects(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<RankQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let k = params.k_or(DEFAULT_TOP_EFFECTS)?;

    let effects = state
        .reactions
        .top_effects(&name, k)
        .map_err(|e| AppError::NotFound(e.to_string()))?;
    let drug_name = state.reactions.drug_name(&name).unwrap_or(name.as_str());

    Ok(Json(serde_json::json!({
        "drugName": drug_name,
        "effects": ranked_rows(effects),
    })))
}

/// Every side effect known to the score dataset
async fn get_effect_catalog(State(state): State<AppState>) -> impl IntoResponse {
    let effects = state.scores.effect_catalog();
    Json(serde_json::json!({
        "count": effects.len(),
        "effects": effects,
    }))
}

/// Most and least associated drugs for a side effect (score dataset)
async fn get_ranked_drugs(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<RankQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let k = params.k_or(DEFAULT_RANKED_DRUGS)?;
    let cache_key = format!("effect:{}:{}", normalize_name(&name), k);

    // Cached rankings hold no request spelling; the name is added per request
    let mut result = match state.cache.get(&cache_key).await {
        Some(cached) => {
            tracing::debug!("Cache hit for effect {}", name);
            cached
        }
        None => {
            let ranking = state.scores.ranked_drugs_for_effect(&name, k);
            if ranking.is_empty() {
                tracing::debug!("No scored drugs for effect {}", name);
            }

            let ranked = serde_json::json!({
                "known": state.scores.is_known_effect(&name),
                "top": ranked_rows(&ranking.top),
                "bottom": ranked_rows(&ranking.bottom),
            });

            // Cache result
            state.cache.insert(cache_key, ranked.clone()).await;
            ranked
        }
    };

    let side_effect = state.scores.effect_name(&name).unwrap_or(name.as_str());
    result["sideEffect"] = serde_json::Value::from(side_effect);

    Ok(Json(result))
}

/// Review comments grouped by side effect
async fn get_reviews(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let reviews = state
        .reviews
        .reviews_for(&name)
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    Ok(Json(serde_json::json!(reviews)))
}

async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "reactions": state.reactions.stats(),
        "scores": state.scores.stats(),
        "reviewedDrugs": state.reviews.len(),
    }))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_query_bounds() {
        assert_eq!(RankQuery { k: None }.k_or(5).unwrap(), 5);
        assert_eq!(RankQuery { k: Some(2) }.k_or(5).unwrap(), 2);
        assert_eq!(RankQuery { k: Some(1000) }.k_or(5).unwrap(), MAX_K);
        assert!(RankQuery { k: Some(0) }.k_or(5).is_err());
    }

    #[test]
    fn test_ranked_rows_are_one_based() {
        let entries = vec![
            RankedEntry { name: "C".to_string(), score: 8.0 },
            RankedEntry { name: "A".to_string(), score: 5.0 },
        ];
        let rows = ranked_rows(&entries);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].name, "A");
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert!(config
            .data_path(&config.scores_file)
            .ends_with("drugSideEffectsData.json"));
    }
}
