//! Dataset Loading and Management
//!
//! Holds the raw drug records exactly as they were served: a JSON array of
//! `{"drugName": ..., "sideEffects": {effect: score}}` objects. Scores stay
//! in their serialized form here; [`crate::AssociationIndex`] parses them.
//!
//! The store has an explicit lifecycle (`Pending -> Ready | Failed`) and an
//! injectable source, so a process loads the data once and shares the
//! derived index instead of refetching it per consumer.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use polars::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::association_index::AssociationIndex;
use crate::error::LoadError;
use crate::score::{format_score, parse_score};
use crate::utils::{normalize_name, title_case};

/// One drug and its recorded side-effect scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugRecord {
    pub drug_name: String,

    /// Effect name -> raw score, in source order. An absent effect means
    /// "no recorded association", not zero.
    pub side_effects: Map<String, Value>,
}

/// Ordered snapshot of drug records with a name lookup
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<DrugRecord>,
    /// Normalized drug name -> position of its first record
    by_name: FxHashMap<String, usize>,
    duplicate_names: usize,
}

impl Dataset {
    /// Wrap records, keeping their order
    ///
    /// When two records normalize to the same drug name, the first one is
    /// the one lookups return.
    pub fn from_records(records: Vec<DrugRecord>) -> Self {
        let mut by_name = FxHashMap::default();
        let mut duplicate_names = 0;

        for (idx, record) in records.iter().enumerate() {
            let key = normalize_name(&record.drug_name);
            if by_name.contains_key(&key) {
                duplicate_names += 1;
                tracing::warn!(
                    "Duplicate drug name {:?} at record {}; keeping the first occurrence",
                    record.drug_name,
                    idx
                );
                continue;
            }
            by_name.insert(key, idx);
        }

        Self {
            records,
            by_name,
            duplicate_names,
        }
    }

    /// Decode a JSON payload
    pub fn from_json_slice(bytes: &[u8], origin: &str) -> Result<Self, LoadError> {
        let records: Vec<DrugRecord> =
            serde_json::from_slice(bytes).map_err(|source| LoadError::Malformed {
                origin: origin.to_string(),
                source,
            })?;
        Ok(Self::from_records(records))
    }

    /// Fetch and decode a dataset from any source
    pub fn load<S: DatasetSource + ?Sized>(source: &S) -> Result<Self, LoadError> {
        let origin = source.origin();
        let bytes = source.fetch()?;
        let dataset = Self::from_json_slice(&bytes, &origin)?;
        tracing::info!("Loaded {} drug records from {}", dataset.len(), origin);
        Ok(dataset)
    }

    /// Build a dataset from a CSV table of `(drug, effect, score)` rows
    ///
    /// Drug and effect names are title-cased, rows are grouped by drug in
    /// first-seen order, and each score is stored as the string form of its
    /// float value. A row with a missing field or a non-numeric score
    /// rejects the whole table.
    pub fn from_score_table(
        path: impl AsRef<Path>,
        columns: &ScoreColumns,
    ) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let table_err = |message: String| LoadError::Table {
            origin: origin.clone(),
            message,
        };

        if !path.exists() {
            return Err(LoadError::Unreachable {
                origin: origin.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }

        // Every column is read as a string; scores are validated below
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.into()))
            .map_err(|e| table_err(format!("failed to create CSV reader: {}", e)))?
            .finish()
            .map_err(|e| table_err(format!("failed to read CSV: {}", e)))?;

        let string_column = |name: &str| {
            df.column(name)
                .and_then(|col| col.cast(&DataType::String))
                .map_err(|e| table_err(format!("column '{}' unavailable: {}", name, e)))
        };
        let drug_col = string_column(columns.drug)?;
        let effect_col = string_column(columns.effect)?;
        let score_col = string_column(columns.score)?;

        let drugs = drug_col.str().map_err(|e| table_err(e.to_string()))?;
        let effects = effect_col.str().map_err(|e| table_err(e.to_string()))?;
        let scores = score_col.str().map_err(|e| table_err(e.to_string()))?;

        let mut records: Vec<DrugRecord> = Vec::new();
        let mut positions: FxHashMap<String, usize> = FxHashMap::default();

        for idx in 0..df.height() {
            // Header is line 1
            let line = idx + 2;

            let (Some(drug), Some(effect), Some(raw_score)) = (
                required_field(drugs.get(idx)),
                required_field(effects.get(idx)),
                required_field(scores.get(idx)),
            ) else {
                return Err(table_err(format!(
                    "line {}: missing required fields ('{}', '{}', '{}')",
                    line, columns.drug, columns.effect, columns.score
                )));
            };

            let score = parse_score(&Value::String(raw_score.to_string())).ok_or_else(|| {
                table_err(format!("line {}: score {:?} is not a number", line, raw_score))
            })?;

            let drug = title_case(drug);
            let pos = *positions.entry(drug.clone()).or_insert_with(|| {
                records.push(DrugRecord {
                    drug_name: drug.clone(),
                    side_effects: Map::new(),
                });
                records.len() - 1
            });

            records[pos]
                .side_effects
                .insert(title_case(effect), Value::String(format_score(score)));
        }

        tracing::info!(
            "Converted {} rows from {} into {} drug records",
            df.height(),
            origin,
            records.len()
        );

        Ok(Self::from_records(records))
    }

    /// Exact lookup by drug name (case-insensitive, trimmed)
    pub fn find_drug(&self, drug_name: &str) -> Option<&DrugRecord> {
        self.by_name
            .get(&normalize_name(drug_name))
            .map(|&idx| &self.records[idx])
    }

    /// Records in source order
    pub fn records(&self) -> &[DrugRecord] {
        &self.records
    }

    /// Records whose name collided with an earlier record
    pub fn duplicate_names(&self) -> usize {
        self.duplicate_names
    }

    /// Whether this record is the one lookups resolve to for its name
    pub(crate) fn is_canonical(&self, idx: usize) -> bool {
        self.records
            .get(idx)
            .and_then(|r| self.by_name.get(&normalize_name(&r.drug_name)))
            == Some(&idx)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize back to the JSON array shape it was loaded from
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }
}

fn required_field(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Column names of a CSV score table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreColumns {
    pub drug: &'static str,
    pub effect: &'static str,
    pub score: &'static str,
}

impl ScoreColumns {
    /// Review-mined side-effect scores
    pub const SIDE_EFFECT_SCORES: ScoreColumns = ScoreColumns {
        drug: "drug",
        effect: "side_effect",
        score: "score",
    };

    /// FDA adverse-event reaction counts
    pub const FDA_REACTIONS: ScoreColumns = ScoreColumns {
        drug: "Drug",
        effect: "Reaction",
        score: "Count",
    };
}

// ============================================================================
// Sources
// ============================================================================

/// Where a JSON payload comes from
///
/// Closures returning the payload bytes are sources too, which keeps the
/// fetch step injectable in tests and embedding applications.
pub trait DatasetSource {
    /// Human-readable origin for logs and errors
    fn origin(&self) -> String;

    /// Fetch the raw payload
    fn fetch(&self) -> Result<Vec<u8>, LoadError>;
}

/// JSON file on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for FileSource {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        std::fs::read(&self.path).map_err(|source| LoadError::Unreachable {
            origin: self.origin(),
            source,
        })
    }
}

/// Payload already in memory
#[derive(Debug, Clone)]
pub struct BytesSource {
    origin: String,
    bytes: Vec<u8>,
}

impl BytesSource {
    pub fn new(origin: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            origin: origin.into(),
            bytes: bytes.into(),
        }
    }
}

impl DatasetSource for BytesSource {
    fn origin(&self) -> String {
        self.origin.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        Ok(self.bytes.clone())
    }
}

impl<F> DatasetSource for F
where
    F: Fn() -> Result<Vec<u8>, LoadError>,
{
    fn origin(&self) -> String {
        "injected source".to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        self()
    }
}

// ============================================================================
// Store
// ============================================================================

/// Observable state of a [`DatasetStore`]
#[derive(Debug, Clone)]
pub enum LoadState {
    Pending,
    Ready(Arc<Dataset>),
    Failed(Arc<LoadError>),
}

/// Load-once holder for a dataset and its derived index
///
/// Queries must wait for `Ready`; before that, [`DatasetStore::dataset`]
/// and [`DatasetStore::index`] return `None`.
#[derive(Debug)]
pub struct DatasetStore {
    state: LoadState,
    index: OnceLock<Arc<AssociationIndex>>,
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetStore {
    pub fn new() -> Self {
        Self {
            state: LoadState::Pending,
            index: OnceLock::new(),
        }
    }

    /// Load from a source and move to `Ready` or `Failed`
    ///
    /// There is no automatic retry; calling `load` again replaces the
    /// previous state and drops any derived index.
    pub fn load<S: DatasetSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<Arc<Dataset>, Arc<LoadError>> {
        self.index = OnceLock::new();

        match Dataset::load(source) {
            Ok(dataset) => {
                let dataset = Arc::new(dataset);
                self.state = LoadState::Ready(Arc::clone(&dataset));
                Ok(dataset)
            }
            Err(err) => {
                tracing::warn!("Dataset load failed: {}", err);
                let err = Arc::new(err);
                self.state = LoadState::Failed(Arc::clone(&err));
                Err(err)
            }
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, LoadState::Ready(_))
    }

    /// The loaded dataset, once ready
    pub fn dataset(&self) -> Option<Arc<Dataset>> {
        match &self.state {
            LoadState::Ready(dataset) => Some(Arc::clone(dataset)),
            _ => None,
        }
    }

    /// The association index, derived on first use and shared afterwards
    pub fn index(&self) -> Option<Arc<AssociationIndex>> {
        let dataset = match &self.state {
            LoadState::Ready(dataset) => dataset,
            _ => return None,
        };

        let index = self
            .index
            .get_or_init(|| Arc::new(AssociationIndex::build(dataset)));
        Some(Arc::clone(index))
    }
}
