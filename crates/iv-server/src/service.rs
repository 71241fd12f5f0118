//! The blocking request pipeline shared by the HTTP handler and the CLI.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use iv_data::{train_test_split, Dataset, Record};
use iv_optimizer::{MultiModelSearch, ParticleSwarm};
use iv_types::IvResult;

use crate::chart::render_comparison_svg;
use crate::config::SplitSettings;
use crate::request::SearchRequest;
use crate::response::OptimizeResponse;

/// Validate, split, fit every requested variant, search, and assemble the response.
///
/// Request validation runs before any data is touched, so a malformed
/// request does no partial work.
pub fn optimize(records: &[Record], request: &SearchRequest, split: &SplitSettings) -> IvResult<OptimizeResponse> {
    let config = request.search_config()?;
    let variants = request.model_kinds()?;

    let dataset = Dataset::from_records(records, &request.features, &request.target)?;
    let data = train_test_split(&dataset, split.test_size, split.seed)?;
    tracing::info!(
        "Dataset ready: {} training rows, {} held out, {} features, {} variants",
        data.n_train(),
        data.n_test(),
        dataset.n_features(),
        variants.len()
    );

    let report = MultiModelSearch::new(&ParticleSwarm)
        .with_variants(variants)
        .run(&data, &config)?;
    tracing::info!(
        "Best model {} with relative error {:.6e}",
        report.best().model_name,
        report.best().best_error()
    );

    let svg = render_comparison_svg(&report.comparison)?;
    let encoded = STANDARD.encode(svg.as_bytes());
    Ok(OptimizeResponse::from_report(report, config.target_value, encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use iv_types::{DataError, IvError};
    use serde_json::json;

    fn records() -> Vec<Record> {
        (0..30)
            .map(|i| {
                let x1 = (i % 6) as f64;
                let x2 = (i / 6) as f64;
                let row = json!({"x1": x1, "x2": x2, "y": 2.0 * x1 + x2});
                row.as_object().cloned().unwrap()
            })
            .collect()
    }

    fn request(models: serde_json::Value) -> SearchRequest {
        SearchRequest::from_value(json!({
            "features": ["x1", "x2"],
            "target": "y",
            "target_value": 7.0,
            "models": models,
            "pso_config": {
                "lb": [0.0, 0.0], "ub": [5.0, 4.0],
                "swarmsize": 15, "maxiter": 30,
                "omega": 0.5, "phip": 0.5, "phig": 0.5,
                "n_solutions": 3, "nprocessors": 2, "max_rounds": 3
            }
        }))
        .unwrap()
    }

    #[test]
    fn end_to_end_with_linear_models() {
        let req = request(json!(["Linear Regression", "Ridge Regression"]));
        let response = optimize(&records(), &req, &SplitSettings::default()).unwrap();

        assert!(["Linear Regression", "Ridge Regression"].contains(&response.best_model.as_str()));
        assert_eq!(response.model_summaries.len(), 2);
        assert_eq!(response.best_solution.len(), 3);
        assert!(response.best_fopt < 1e-2);
        assert!(response.best_solution.iter().all(|row| row.epsilon == 7.0));

        let svg = STANDARD.decode(&response.graphs.svg).unwrap();
        let svg = String::from_utf8(svg).unwrap();
        assert!(svg.contains("Feature Values Comparison Across Models"));
    }

    #[test]
    fn unknown_column_is_a_data_error() {
        let mut req = request(json!(["Linear Regression"]));
        req.target = "missing".into();
        let err = optimize(&records(), &req, &SplitSettings::default()).unwrap_err();
        assert!(matches!(err, IvError::Data(DataError::ColumnNotFound { .. })));
    }

    #[test]
    fn config_is_validated_before_the_data() {
        let mut req = request(json!(["Linear Regression"]));
        req.pso_config.swarmsize = 0;
        let err = optimize(&[], &req, &SplitSettings::default()).unwrap_err();
        assert!(matches!(err, IvError::Validation(_)));
    }
}
