//! Sequential fit-then-search over every requested predictor variant.

use std::collections::HashSet;

use iv_data::{MinMaxScaler, Scaler, TrainTestSplit};
use iv_models::{r2_score, ModelKind, Regressor};
use iv_types::{
    validation_error, ComparisonTable, FailurePolicy, GlobalBestTracker, IvResult, ModelResult,
    SearchConfig, SearchError,
};

use crate::coordinator::RoundCoordinator;
use crate::objective::SurrogateObjective;
use crate::pso::SwarmRunner;

/// Everything produced by one multi-model search.
#[derive(Debug, Clone)]
pub struct MultiModelReport {
    /// One entry per successfully searched variant, in processing order.
    pub results: Vec<ModelResult>,
    /// Index into `results` of the variant with the lowest best relative error.
    pub best_index: usize,
    pub comparison: ComparisonTable,
}

impl MultiModelReport {
    pub fn best(&self) -> &ModelResult {
        &self.results[self.best_index]
    }
}

/// Fits each variant on the shared scaled training data, then searches its
/// inverse with the round coordinator.
///
/// Variants run strictly one after another in the configured order; that
/// order decides ties for the global best.
pub struct MultiModelSearch<'r> {
    runner: &'r dyn SwarmRunner,
    variants: Vec<ModelKind>,
}

impl<'r> MultiModelSearch<'r> {
    pub fn new(runner: &'r dyn SwarmRunner) -> Self {
        Self {
            runner,
            variants: ModelKind::ALL.to_vec(),
        }
    }

    pub fn with_variants(mut self, variants: Vec<ModelKind>) -> Self {
        self.variants = variants;
        self
    }

    pub fn run(&self, data: &TrainTestSplit, config: &SearchConfig) -> IvResult<MultiModelReport> {
        if self.variants.is_empty() {
            return Err(SearchError::NoVariants.into());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.variants.iter().find(|kind| !seen.insert(**kind)) {
            return Err(validation_error!("Model '{}' requested more than once", dup));
        }
        config.validate()?;
        if data.x_train.ncols() != config.dimensions() {
            return Err(validation_error!(
                "Training data has {} feature columns but {} features were configured",
                data.x_train.ncols(),
                config.dimensions()
            ));
        }

        let mut scaler = MinMaxScaler::new();
        scaler.fit(&data.x_train)?;
        tracing::debug!("{} scaler fitted on {} rows", scaler.name(), data.x_train.nrows());
        let x_train = scaler.transform(&data.x_train)?;
        let x_test = if data.n_test() > 0 {
            Some(scaler.transform(&data.x_test)?)
        } else {
            None
        };

        let mut tracker = GlobalBestTracker::new();
        let mut results = Vec::with_capacity(self.variants.len());

        for kind in &self.variants {
            tracing::info!("Optimizing {}", kind);
            let outcome = self.run_variant(*kind, &scaler, &x_train, x_test.as_ref(), data, config);

            let result = match outcome {
                Ok(result) => result,
                Err(e) => match config.failure_policy {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::SkipVariant => {
                        tracing::warn!("Skipping {}: {}", kind, e);
                        continue;
                    }
                },
            };

            tracing::info!(
                "{} finished: best relative error {:.6e}, holdout R² {}, {:.3}s",
                result.model_name,
                result.best_error(),
                result
                    .holdout_r2
                    .map(|r2| format!("{:.4}", r2))
                    .unwrap_or_else(|| "n/a".to_string()),
                result.runtime_secs
            );
            if tracker.observe(&result.model_name, result.best_error()) {
                tracing::info!("New global best: {}", result.model_name);
            }
            results.push(result);
        }

        let best_name = tracker.best_model().ok_or(SearchError::NoModelsOptimized)?;
        let best_index = results
            .iter()
            .position(|r| r.model_name == best_name)
            .ok_or(SearchError::NoModelsOptimized)?;
        let comparison = ComparisonTable::from_results(config.features.clone(), &results)?;

        Ok(MultiModelReport {
            results,
            best_index,
            comparison,
        })
    }

    fn run_variant(
        &self,
        kind: ModelKind,
        scaler: &MinMaxScaler,
        x_train: &ndarray::Array2<f64>,
        x_test: Option<&ndarray::Array2<f64>>,
        data: &TrainTestSplit,
        config: &SearchConfig,
    ) -> IvResult<ModelResult> {
        let mut model = kind.build();
        model.fit(x_train, &data.y_train)?;

        let holdout_r2 = match x_test {
            Some(x_test) => Some(r2_score(&data.y_test, &model.predict(x_test)?)?),
            None => None,
        };

        let objective = SurrogateObjective::new(scaler, model.as_ref(), config.target_value);
        let report = RoundCoordinator::new(self.runner).search(config, &objective)?;

        let best = report
            .pool
            .best()
            .cloned()
            .ok_or_else(|| SearchError::EmptyPool {
                model: model.name().to_string(),
            })?;

        Ok(ModelResult {
            model_name: model.name().to_string(),
            best,
            pool: report.pool,
            runtime_secs: report.runtime.as_secs_f64(),
            rounds: report.rounds,
            holdout_r2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::Objective;
    use crate::pso::{ParticleSwarm, RunOutcome};
    use iv_data::{train_test_split, Dataset};
    use iv_types::{internal_error, IvError};
    use ndarray::{Array1, Array2};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn split() -> TrainTestSplit {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| {
            if j == 0 {
                (i % 10) as f64 / 9.0
            } else {
                (i / 10) as f64 / 3.0
            }
        });
        let y: Array1<f64> = x.rows().into_iter().map(|r| 2.0 * r[0] + r[1]).collect();
        let ds = Dataset {
            features: vec!["a".into(), "b".into()],
            target: "y".into(),
            x,
            y,
        };
        train_test_split(&ds, 0.2, 42).unwrap()
    }

    fn config() -> SearchConfig {
        SearchConfig::new(vec!["a".into(), "b".into()], vec![0.0, 0.0], vec![1.0, 1.0], 1.5)
            .with_swarm(15, 30)
            .with_rounds(2, 2, 2)
    }

    /// Fails its first `failures` runs, then defers to the particle swarm.
    struct Flaky {
        calls: AtomicUsize,
        failures: usize,
    }

    impl SwarmRunner for Flaky {
        fn run(&self, config: &SearchConfig, seed: u64, objective: &dyn Objective) -> IvResult<RunOutcome> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(internal_error!("solver crashed"));
            }
            ParticleSwarm.run(config, seed, objective)
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[test]
    fn runs_variants_in_order_and_tracks_global_best() {
        let variants = vec![
            ModelKind::LinearRegression,
            ModelKind::RidgeRegression,
            ModelKind::DecisionTree,
        ];
        let report = MultiModelSearch::new(&ParticleSwarm)
            .with_variants(variants)
            .run(&split(), &config())
            .unwrap();

        let names: Vec<&str> = report.results.iter().map(|r| r.model_name.as_str()).collect();
        assert_eq!(names, vec!["Linear Regression", "Ridge Regression", "Decision Tree"]);
        assert_eq!(report.comparison.models().len(), 3);

        let min_error = report
            .results
            .iter()
            .map(|r| r.best_error())
            .fold(f64::INFINITY, f64::min);
        assert_eq!(report.best().best_error(), min_error);
        // The exact linear relation is easy to invert.
        assert!(report.results[0].best_error() < 1e-3);
    }

    #[test]
    fn records_holdout_fit_quality_and_pools() {
        let report = MultiModelSearch::new(&ParticleSwarm)
            .with_variants(vec![ModelKind::LinearRegression])
            .run(&split(), &config())
            .unwrap();

        let result = &report.results[0];
        assert!(result.holdout_r2.unwrap() > 0.999);
        assert_eq!(result.pool.len(), 2);
        assert_eq!(result.rounds, 1);
        assert_eq!(&result.best, result.pool.best().unwrap());
        assert!(result.best.position.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn comparison_table_holds_best_positions() {
        let report = MultiModelSearch::new(&ParticleSwarm)
            .with_variants(vec![ModelKind::LinearRegression, ModelKind::DecisionTree])
            .run(&split(), &config())
            .unwrap();

        for result in &report.results {
            assert_eq!(report.comparison.get("a", &result.model_name), Some(result.best.position[0]));
            assert_eq!(report.comparison.get("b", &result.model_name), Some(result.best.position[1]));
        }
    }

    #[test]
    fn empty_variant_set_is_rejected() {
        let err = MultiModelSearch::new(&ParticleSwarm)
            .with_variants(Vec::new())
            .run(&split(), &config())
            .unwrap_err();
        assert!(matches!(err, IvError::Search(SearchError::NoVariants)));
    }

    #[test]
    fn duplicate_variants_are_rejected() {
        let err = MultiModelSearch::new(&ParticleSwarm)
            .with_variants(vec![ModelKind::Svr, ModelKind::Svr])
            .run(&split(), &config())
            .unwrap_err();
        assert!(matches!(err, IvError::Validation(_)));
    }

    #[test]
    fn failure_aborts_by_default() {
        let runner = Flaky {
            calls: AtomicUsize::new(0),
            failures: 1,
        };
        let err = MultiModelSearch::new(&runner)
            .with_variants(vec![ModelKind::LinearRegression, ModelKind::RidgeRegression])
            .run(&split(), &config())
            .unwrap_err();
        assert!(matches!(err, IvError::Search(SearchError::WorkerFailed { .. })));
    }

    #[test]
    fn skip_policy_drops_the_failed_variant() {
        // Both workers of the first variant's only round fail.
        let runner = Flaky {
            calls: AtomicUsize::new(0),
            failures: 2,
        };
        let cfg = config().with_failure_policy(FailurePolicy::SkipVariant);
        let report = MultiModelSearch::new(&runner)
            .with_variants(vec![ModelKind::LinearRegression, ModelKind::RidgeRegression])
            .run(&split(), &cfg)
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.best().model_name, "Ridge Regression");
        assert_eq!(report.comparison.models(), &["Ridge Regression".to_string()]);
    }

    #[test]
    fn skip_policy_with_no_survivors_fails() {
        let runner = Flaky {
            calls: AtomicUsize::new(0),
            failures: usize::MAX,
        };
        let cfg = config().with_failure_policy(FailurePolicy::SkipVariant);
        let err = MultiModelSearch::new(&runner)
            .with_variants(vec![ModelKind::LinearRegression, ModelKind::LassoRegression])
            .run(&split(), &cfg)
            .unwrap_err();
        assert!(matches!(err, IvError::Search(SearchError::NoModelsOptimized)));
    }

    #[test]
    fn feature_count_mismatch_is_rejected() {
        let cfg = SearchConfig::new(vec!["a".into()], vec![0.0], vec![1.0], 1.0);
        let err = MultiModelSearch::new(&ParticleSwarm)
            .with_variants(vec![ModelKind::LinearRegression])
            .run(&split(), &cfg)
            .unwrap_err();
        assert!(matches!(err, IvError::Validation(_)));
    }
}
