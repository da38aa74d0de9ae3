//! Wire shapes for the rating matrix.
//!
//! The read endpoint returns flat records (`{pizza, sauce, cheese, ...}`);
//! the save endpoint takes nested ones (`{rows: [{pizza, scores: {...}}]}`).
//! [`RemoteSnapshot`] is the nested form and the one the core works with;
//! flat records are converted into it on load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::{Category, CategorySet, Rating, UNKNOWN_PIZZA};
use crate::error::{RejectedScore, SyncError};

/// One row of a snapshot: a pizza label and its scores by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub pizza: String,
    /// Keyed by category; `BTreeMap` keeps declared column order on the wire.
    pub scores: BTreeMap<Category, Rating>,
}

impl RatingRecord {
    pub fn new(pizza: impl Into<String>) -> Self {
        Self {
            pizza: pizza.into(),
            scores: BTreeMap::new(),
        }
    }

    /// Builder-style score setter, mostly for tests and fixtures.
    pub fn with(mut self, category: Category, rating: Rating) -> Self {
        self.scores.insert(category, rating);
        self
    }

    pub fn score(&self, category: Category) -> Option<Rating> {
        self.scores.get(&category).copied()
    }

    /// The flat read-endpoint shape of this record.
    pub fn to_flat(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("pizza".into(), serde_json::Value::from(self.pizza.clone()));
        for (category, rating) in &self.scores {
            obj.insert(category.key().into(), serde_json::Value::from(rating.value()));
        }
        serde_json::Value::Object(obj)
    }
}

/// The full rating matrix as sent to the save endpoint. Always every row,
/// never a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    pub rows: Vec<RatingRecord>,
}

impl RemoteSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// First record for `pizza`, in order.
    pub fn record(&self, pizza: &str) -> Option<&RatingRecord> {
        self.rows.iter().find(|r| r.pizza == pizza)
    }

    /// Convert read-endpoint records, keeping only the categories in `categories`.
    ///
    /// Scores that cannot be read as a rating are dropped from the record
    /// and returned alongside the snapshot; the cell keeps its current value.
    pub fn from_flat(records: Vec<FlatRecord>, categories: &CategorySet) -> (Self, Vec<RejectedScore>) {
        let mut rejected = Vec::new();
        let rows = records
            .into_iter()
            .map(|r| r.into_record(categories, &mut rejected))
            .collect();
        (Self { rows }, rejected)
    }

    /// Parse a read-endpoint body. Accepts a bare array or a `{ "rows": [...] }`
    /// wrapper.
    ///
    /// # Errors
    /// [`SyncError::Json`] when the body is neither shape.
    pub fn from_flat_json(
        body: &[u8],
        categories: &CategorySet,
    ) -> Result<(Self, Vec<RejectedScore>), SyncError> {
        if let Ok(records) = serde_json::from_slice::<Vec<FlatRecord>>(body) {
            return Ok(Self::from_flat(records, categories));
        }

        #[derive(Deserialize)]
        struct Wrapped {
            rows: Vec<FlatRecord>,
        }

        serde_json::from_slice::<Wrapped>(body)
            .map(|w| Self::from_flat(w.rows, categories))
            .map_err(|e| SyncError::Json {
                field: "rows".into(),
                detail: e.to_string(),
            })
    }

    /// The flat read-endpoint shape of the whole snapshot.
    pub fn to_flat(&self) -> serde_json::Value {
        serde_json::Value::Array(self.rows.iter().map(RatingRecord::to_flat).collect())
    }
}

/// A record as the read endpoint returns it: `pizza` plus one field per category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatRecord {
    /// Label cell as the sheet holds it; strings are trimmed, numbers and booleans stringified.
    #[serde(default)]
    pub pizza: Option<serde_json::Value>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl FlatRecord {
    fn field(&self, category: Category) -> Option<&serde_json::Value> {
        self.fields.get(category.key()).or_else(|| {
            self.fields
                .iter()
                .find(|(k, _)| Category::from_key(k) == Some(category))
                .map(|(_, v)| v)
        })
    }

    fn into_record(self, categories: &CategorySet, rejected: &mut Vec<RejectedScore>) -> RatingRecord {
        let pizza = match &self.pizza {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            Some(v @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => v.to_string(),
            _ => String::new(),
        };
        let pizza = if pizza.is_empty() { UNKNOWN_PIZZA.to_string() } else { pizza };

        let mut record = RatingRecord::new(pizza);
        for &category in categories.categories() {
            let Some(raw) = self.field(category) else {
                continue;
            };
            match Rating::from_json(raw) {
                Ok(rating) => {
                    record.scores.insert(category, rating);
                }
                Err(e) => rejected.push(e.for_category(&record.pizza, category)),
            }
        }
        record
    }
}
