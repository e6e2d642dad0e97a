//! Patient review grouping
//!
//! Free-text reviews arrive grouped by drug and side effect:
//! `[{"drugName": ..., "sideEffects": {effect: [comment, ...]}}]`.
//! Nothing is ranked here; groups and comments keep source order.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::dataset::DatasetSource;
use crate::error::{LoadError, QueryError};
use crate::utils::normalize_name;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDrugReviews {
    drug_name: String,
    side_effects: Map<String, serde_json::Value>,
}

/// Comments filed under one side effect
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewGroup {
    pub side_effect: String,
    pub comments: Vec<String>,
}

/// All review groups for one drug
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugReviews {
    pub drug_name: String,
    pub groups: Vec<ReviewGroup>,
}

impl DrugReviews {
    pub fn comment_count(&self) -> usize {
        self.groups.iter().map(|g| g.comments.len()).sum()
    }
}

/// Review groups for every drug, looked up by name
#[derive(Debug, Clone, Default)]
pub struct ReviewStore {
    drugs: Vec<DrugReviews>,
    by_name: FxHashMap<String, usize>,
}

impl ReviewStore {
    /// Decode a review payload
    ///
    /// Non-string comments are skipped, repeated comments within a group
    /// are kept once, and a drug listed twice keeps its first entry.
    pub fn from_json_slice(bytes: &[u8], origin: &str) -> Result<Self, LoadError> {
        let raw: Vec<RawDrugReviews> =
            serde_json::from_slice(bytes).map_err(|source| LoadError::Malformed {
                origin: origin.to_string(),
                source,
            })?;

        let mut store = ReviewStore::default();
        for entry in raw {
            let key = normalize_name(&entry.drug_name);
            if store.by_name.contains_key(&key) {
                tracing::warn!(
                    "Duplicate review entry for {:?}; keeping the first",
                    entry.drug_name
                );
                continue;
            }

            let groups = entry
                .side_effects
                .into_iter()
                .map(|(side_effect, comments)| ReviewGroup {
                    side_effect,
                    comments: unique_comments(comments),
                })
                .collect();

            store.by_name.insert(key, store.drugs.len());
            store.drugs.push(DrugReviews {
                drug_name: entry.drug_name,
                groups,
            });
        }

        Ok(store)
    }

    /// Fetch and decode reviews from any source
    pub fn load<S: DatasetSource + ?Sized>(source: &S) -> Result<Self, LoadError> {
        let origin = source.origin();
        let bytes = source.fetch()?;
        let store = Self::from_json_slice(&bytes, &origin)?;
        tracing::info!("Loaded reviews for {} drugs from {}", store.len(), origin);
        Ok(store)
    }

    /// Review groups for a drug (case-insensitive, trimmed)
    pub fn reviews_for(&self, drug_name: &str) -> Result<&DrugReviews, QueryError> {
        self.by_name
            .get(&normalize_name(drug_name))
            .map(|&idx| &self.drugs[idx])
            .ok_or_else(|| QueryError::ReviewsNotFound(drug_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.drugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drugs.is_empty()
    }
}

fn unique_comments(raw: serde_json::Value) -> Vec<String> {
    let serde_json::Value::Array(items) = raw else {
        return Vec::new();
    };

    let mut comments: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if let serde_json::Value::String(comment) = item {
            if !comments.contains(&comment) {
                comments.push(comment);
            }
        }
    }
    comments
}
