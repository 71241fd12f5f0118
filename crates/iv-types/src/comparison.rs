//! Cross-model aggregation: the global-best tracker and the
//! feature-by-feature comparison table.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::errors::IvResult;
use crate::internal_error;
use crate::solution::{Candidate, ModelResult};

/// Predictor variant with the lowest best relative error seen so far.
///
/// Updates use a strict less-than comparison, so among exact ties the
/// earliest observed variant is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalBestTracker {
    best: Option<BestEntry>,
    observed: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct BestEntry {
    model_name: String,
    error: f64,
    index: usize,
}

impl GlobalBestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a variant's best error. Returns `true` when it became the new best.
    pub fn observe(&mut self, model_name: &str, error: f64) -> bool {
        let index = self.observed;
        self.observed += 1;

        let improves = match &self.best {
            None => true,
            Some(current) => error < current.error || (current.error.is_nan() && !error.is_nan()),
        };
        if improves {
            self.best = Some(BestEntry {
                model_name: model_name.to_string(),
                error,
                index,
            });
        }
        improves
    }

    pub fn best_model(&self) -> Option<&str> {
        self.best.as_ref().map(|b| b.model_name.as_str())
    }

    pub fn best_error(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.error)
    }

    /// Position of the best variant in observation order.
    pub fn best_index(&self) -> Option<usize> {
        self.best.as_ref().map(|b| b.index)
    }

    pub fn observed(&self) -> usize {
        self.observed
    }
}

/// Best-solution feature values per model, keyed by position.
///
/// Serializes as `{ feature: { model: value } }` with features in input
/// order and models in processing order.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    features: Vec<String>,
    models: Vec<String>,
    /// `values[model][feature]`
    values: Vec<Vec<f64>>,
}

impl ComparisonTable {
    pub fn new(features: Vec<String>) -> Self {
        Self {
            features,
            models: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build the table from every variant's best candidate.
    pub fn from_results(features: Vec<String>, results: &[ModelResult]) -> IvResult<Self> {
        let mut table = Self::new(features);
        for result in results {
            table.add_model(&result.model_name, &result.best)?;
        }
        Ok(table)
    }

    pub fn add_model(&mut self, model_name: &str, best: &Candidate) -> IvResult<()> {
        if best.position.len() != self.features.len() {
            return Err(internal_error!(
                "Best solution for {} has {} values, expected {}",
                model_name,
                best.position.len(),
                self.features.len()
            ));
        }
        self.models.push(model_name.to_string());
        self.values.push(best.position.clone());
        Ok(())
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn value(&self, feature_idx: usize, model_idx: usize) -> Option<f64> {
        self.values.get(model_idx)?.get(feature_idx).copied()
    }

    pub fn get(&self, feature: &str, model: &str) -> Option<f64> {
        let f = self.features.iter().position(|name| name == feature)?;
        let m = self.models.iter().position(|name| name == model)?;
        self.value(f, m)
    }
}

struct FeatureRow<'a> {
    table: &'a ComparisonTable,
    feature_idx: usize,
}

impl Serialize for FeatureRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.models.len()))?;
        for (m, model) in self.table.models.iter().enumerate() {
            map.serialize_entry(model, &self.table.values[m][self.feature_idx])?;
        }
        map.end()
    }
}

impl Serialize for ComparisonTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.features.len()))?;
        for (f, feature) in self.features.iter().enumerate() {
            map.serialize_entry(
                feature,
                &FeatureRow {
                    table: self,
                    feature_idx: f,
                },
            )?;
        }
        map.end()
    }
}
