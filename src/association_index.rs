//! Drug / Side-Effect Association Index
//!
//! Derived once from a [`Dataset`] and immutable afterwards:
//! - Forward index: drug -> (effect -> score)
//! - Reverse index: effect -> (drug -> score)
//! - Effect catalog: every effect name seen in any record
//!
//! Scores are parsed here, at build time. Entries whose score does not
//! parse are left out of both directions and counted in [`IndexStats`].
//! Both directions are sorted once by descending score with a stable sort,
//! so equal scores keep source order and queries only slice.

use std::cmp::Ordering;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::dataset::Dataset;
use crate::error::QueryError;
use crate::score::parse_score;
use crate::utils::normalize_name;

/// Default number of effects shown per drug
pub const DEFAULT_TOP_EFFECTS: usize = 5;

/// Default number of drugs shown at each end of an effect ranking
pub const DEFAULT_RANKED_DRUGS: usize = 3;

/// One `(name, score)` result row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub name: String,
    pub score: f64,
}

/// Most and least associated drugs for one effect
///
/// `top[0]` is the highest score, `bottom[0]` the lowest. With fewer than
/// `2k` qualifying drugs the two lists overlap.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EffectRanking {
    pub top: Vec<RankedEntry>,
    pub bottom: Vec<RankedEntry>,
}

impl EffectRanking {
    /// No drug has a numeric score for the effect
    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.bottom.is_empty()
    }
}

/// Index size and data-quality counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Drugs in the forward index
    pub drugs: usize,
    /// Distinct effect names in the catalog
    pub effects: usize,
    /// Scored (drug, effect) pairs
    pub associations: usize,
    /// Entries dropped because their score did not parse
    pub skipped_scores: usize,
    /// Records dropped because an earlier record had the same drug name
    pub duplicate_drugs: usize,
    /// Effect keys dropped because the same record already had that effect
    pub duplicate_effects: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct DrugEntry {
    /// Drug name as spelled in the dataset
    name: String,
    /// Effects sorted by descending score
    ranked: Vec<RankedEntry>,
    /// Normalized effect name -> score
    scores: FxHashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
struct EffectEntry {
    /// Drugs sorted by descending score
    ranked: Vec<RankedEntry>,
}

/// Forward and reverse association index with ranking queries
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationIndex {
    /// Normalized drug name -> effects
    forward: FxHashMap<String, DrugEntry>,
    /// Normalized effect name -> drugs
    reverse: FxHashMap<String, EffectEntry>,
    /// Effect names in first-seen order, as first spelled
    catalog: Vec<String>,
    /// Normalized effect name -> catalog position
    catalog_keys: FxHashMap<String, usize>,
    /// Drug names in dataset order
    drug_names: Vec<String>,
    stats: IndexStats,
}

impl AssociationIndex {
    /// Build both index directions and the effect catalog
    pub fn build(dataset: &Dataset) -> Self {
        let start = Instant::now();

        let mut forward: FxHashMap<String, DrugEntry> = FxHashMap::default();
        let mut reverse: FxHashMap<String, EffectEntry> = FxHashMap::default();
        let mut catalog: Vec<String> = Vec::new();
        let mut catalog_keys: FxHashMap<String, usize> = FxHashMap::default();
        let mut drug_names: Vec<String> = Vec::new();
        let mut stats = IndexStats {
            duplicate_drugs: dataset.duplicate_names(),
            ..IndexStats::default()
        };

        for (idx, record) in dataset.records().iter().enumerate() {
            // Later records with a colliding name are unreachable by lookup
            if !dataset.is_canonical(idx) {
                continue;
            }

            let mut entry = DrugEntry {
                name: record.drug_name.clone(),
                ranked: Vec::with_capacity(record.side_effects.len()),
                scores: FxHashMap::default(),
            };
            let mut seen: FxHashSet<String> = FxHashSet::default();

            for (effect, raw_score) in &record.side_effects {
                let effect_key = normalize_name(effect);

                // Catalog membership tracks the name, not the score
                if !catalog_keys.contains_key(&effect_key) {
                    catalog_keys.insert(effect_key.clone(), catalog.len());
                    catalog.push(effect.clone());
                }

                if !seen.insert(effect_key.clone()) {
                    stats.duplicate_effects += 1;
                    tracing::debug!(
                        "Drug {:?}: effect {:?} repeats an earlier key, skipped",
                        record.drug_name,
                        effect
                    );
                    continue;
                }

                let Some(score) = parse_score(raw_score) else {
                    stats.skipped_scores += 1;
                    tracing::debug!(
                        "Drug {:?}: unparseable score {} for effect {:?}, excluded from ranking",
                        record.drug_name,
                        raw_score,
                        effect
                    );
                    continue;
                };

                entry.scores.insert(effect_key.clone(), score);
                entry.ranked.push(RankedEntry {
                    name: effect.clone(),
                    score,
                });
                reverse
                    .entry(effect_key)
                    .or_insert_with(|| EffectEntry { ranked: Vec::new() })
                    .ranked
                    .push(RankedEntry {
                        name: record.drug_name.clone(),
                        score,
                    });
                stats.associations += 1;
            }

            sort_descending(&mut entry.ranked);
            forward.insert(normalize_name(&record.drug_name), entry);
            drug_names.push(record.drug_name.clone());
        }

        for entry in reverse.values_mut() {
            sort_descending(&mut entry.ranked);
        }

        stats.drugs = forward.len();
        stats.effects = catalog.len();

        if stats.skipped_scores > 0 {
            tracing::warn!(
                "Excluded {} unparseable scores from ranking",
                stats.skipped_scores
            );
        }
        tracing::info!(
            "Association index built in {:?} ({} drugs, {} effects, {} associations)",
            start.elapsed(),
            stats.drugs,
            stats.effects,
            stats.associations
        );

        Self {
            forward,
            reverse,
            catalog,
            catalog_keys,
            drug_names,
            stats,
        }
    }

    /// Highest-scoring effects for a drug, at most `k`
    ///
    /// An unknown drug is [`QueryError::DrugNotFound`]; a known drug
    /// without numeric scores gives an empty slice.
    pub fn top_effects(&self, drug_name: &str, k: usize) -> Result<&[RankedEntry], QueryError> {
        let entry = self
            .forward
            .get(&normalize_name(drug_name))
            .ok_or_else(|| QueryError::DrugNotFound(drug_name.to_string()))?;

        Ok(&entry.ranked[..k.min(entry.ranked.len())])
    }

    /// First `k` and last `k` drugs of the descending ranking for an effect
    ///
    /// `bottom` is read from the low end, so `bottom[0]` is the drug with
    /// the lowest score. Unknown effects and effects without numeric scores
    /// give an empty ranking.
    pub fn ranked_drugs_for_effect(&self, effect_name: &str, k: usize) -> EffectRanking {
        let Some(entry) = self.reverse.get(&normalize_name(effect_name)) else {
            return EffectRanking::default();
        };

        let ranked = &entry.ranked;
        let take = k.min(ranked.len());

        EffectRanking {
            top: ranked[..take].to_vec(),
            bottom: ranked[ranked.len() - take..].iter().rev().cloned().collect(),
        }
    }

    /// Score of one (drug, effect) pair, if recorded and numeric
    pub fn association_score(&self, drug_name: &str, effect_name: &str) -> Option<f64> {
        self.forward
            .get(&normalize_name(drug_name))?
            .scores
            .get(&normalize_name(effect_name))
            .copied()
    }

    /// Every effect name observed, in first-seen order
    pub fn effect_catalog(&self) -> &[String] {
        &self.catalog
    }

    /// Whether the effect name appears in any record, scored or not
    pub fn is_known_effect(&self, effect_name: &str) -> bool {
        self.catalog_keys.contains_key(&normalize_name(effect_name))
    }

    /// Catalog spelling of an effect name
    pub fn effect_name(&self, effect_name: &str) -> Option<&str> {
        self.catalog_keys
            .get(&normalize_name(effect_name))
            .map(|&idx| self.catalog[idx].as_str())
    }

    /// Dataset spelling of an indexed drug name
    pub fn drug_name(&self, drug_name: &str) -> Option<&str> {
        self.forward
            .get(&normalize_name(drug_name))
            .map(|entry| entry.name.as_str())
    }

    /// Indexed drug names in dataset order
    pub fn drug_names(&self) -> &[String] {
        &self.drug_names
    }

    pub fn contains_drug(&self, drug_name: &str) -> bool {
        self.forward.contains_key(&normalize_name(drug_name))
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }
}

/// Stable sort by descending score; equal scores keep their order
fn sort_descending(entries: &mut [RankedEntry]) {
    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}
