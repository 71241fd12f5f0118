//! Success body of the optimize endpoint.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use iv_optimizer::MultiModelReport;
use iv_types::{Candidate, ComparisonTable};

#[derive(Debug, Clone, Serialize)]
pub struct OptimizeResponse {
    pub best_model: String,
    /// Search wall-clock seconds of the best model.
    pub best_runtime: f64,
    /// Lowest relative error of the best model.
    pub best_fopt: f64,
    /// Ranked solution pool of the best model.
    pub best_solution: Vec<SolutionRow>,
    pub comparison_table: ComparisonTable,
    pub graphs: Graphs,
    pub model_summaries: Vec<ModelSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Graphs {
    /// Base64-encoded SVG bar chart of the comparison table.
    pub svg: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub model_name: String,
    pub best_fopt: f64,
    pub runtime: f64,
    pub rounds: usize,
    pub holdout_r2: Option<f64>,
}

/// One candidate flattened to `{<feature>: value, ..., predicted, epsilon, relative_error}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRow {
    pub features: Vec<(String, f64)>,
    pub predicted: f64,
    /// The requested target value.
    pub epsilon: f64,
    pub relative_error: f64,
}

impl SolutionRow {
    pub fn new(features: &[String], candidate: &Candidate, epsilon: f64) -> Self {
        Self {
            features: features
                .iter()
                .cloned()
                .zip(candidate.position.iter().copied())
                .collect(),
            predicted: candidate.predicted,
            epsilon,
            relative_error: candidate.relative_error,
        }
    }
}

impl Serialize for SolutionRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.features.len() + 3))?;
        for (name, value) in &self.features {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("predicted", &self.predicted)?;
        map.serialize_entry("epsilon", &self.epsilon)?;
        map.serialize_entry("relative_error", &self.relative_error)?;
        map.end()
    }
}

impl OptimizeResponse {
    pub fn from_report(report: MultiModelReport, target_value: f64, svg_base64: String) -> Self {
        let best = report.best();
        let features = report.comparison.features().to_vec();

        let best_solution = best
            .pool
            .iter()
            .map(|candidate| SolutionRow::new(&features, candidate, target_value))
            .collect();

        let model_summaries = report
            .results
            .iter()
            .map(|result| ModelSummary {
                model_name: result.model_name.clone(),
                best_fopt: result.best_error(),
                runtime: result.runtime_secs,
                rounds: result.rounds,
                holdout_r2: result.holdout_r2,
            })
            .collect();

        Self {
            best_model: best.model_name.clone(),
            best_runtime: best.runtime_secs,
            best_fopt: best.best_error(),
            best_solution,
            comparison_table: report.comparison.clone(),
            graphs: Graphs { svg: svg_base64 },
            model_summaries,
        }
    }
}
