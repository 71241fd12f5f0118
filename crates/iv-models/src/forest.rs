use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use iv_types::IvResult;

use crate::tree::DecisionTreeRegressor;
use crate::{check_features, check_training_data, not_fitted, Regressor};

/// Bagged ensemble of regression trees; the prediction is the mean over trees.
///
/// Tree `i` draws its bootstrap sample from `ChaCha8Rng::seed_from_u64(seed + i)`,
/// so the fitted forest does not depend on how rayon schedules the trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub seed: u64,
    pub bootstrap: bool,
    trees: Vec<DecisionTreeRegressor>,
    n_features: usize,
}

impl RandomForestRegressor {
    pub fn new() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 10,
            seed: 42,
            bootstrap: true,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> IvResult<()> {
        check_training_data(self.name(), x, y)?;
        let n_samples = x.nrows();

        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> IvResult<DecisionTreeRegressor> {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(tree_idx as u64));
                let mut tree = DecisionTreeRegressor::new(self.max_depth);

                if self.bootstrap {
                    let sample: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                    let x_boot = x.select(Axis(0), &sample);
                    let y_boot = y.select(Axis(0), &sample);
                    tree.fit(&x_boot, &y_boot)?;
                } else {
                    tree.fit(x, y)?;
                }
                Ok(tree)
            })
            .collect::<IvResult<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = x.ncols();
        tracing::debug!("Random Forest fitted {} trees on {} samples", self.trees.len(), n_samples);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> IvResult<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(not_fitted(self.name()));
        }
        check_features(self.n_features, x)?;

        let mut total = Array1::<f64>::zeros(x.nrows());
        for tree in &self.trees {
            total += &tree.predict(x)?;
        }
        Ok(total / self.trees.len() as f64)
    }

    fn name(&self) -> &str {
        "Random Forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sine(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64 / (n - 1) as f64);
        let y = x.column(0).mapv(|v| (v * std::f64::consts::PI).sin());
        (x, y)
    }

    #[test]
    fn fitting_is_deterministic() {
        let (x, y) = sine(60);
        let mut a = RandomForestRegressor::new().with_estimators(25);
        let mut b = RandomForestRegressor::new().with_estimators(25);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        let probe = array![[0.13], [0.5], [0.77]];
        assert_eq!(a.predict(&probe).unwrap(), b.predict(&probe).unwrap());
        assert_eq!(a.n_trees(), 25);
    }

    #[test]
    fn different_seeds_give_different_forests() {
        let (x, y) = sine(60);
        let mut a = RandomForestRegressor::new().with_estimators(10).with_seed(1);
        let mut b = RandomForestRegressor::new().with_estimators(10).with_seed(2);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        let probe = Array2::from_shape_fn((20, 1), |(i, _)| i as f64 / 19.0 + 0.01);
        assert_ne!(a.predict(&probe).unwrap(), b.predict(&probe).unwrap());
    }

    #[test]
    fn approximates_smooth_curve() {
        let (x, y) = sine(80);
        let mut forest = RandomForestRegressor::new().with_estimators(30);
        forest.fit(&x, &y).unwrap();

        let pred = forest.predict(&array![[0.5], [0.02]]).unwrap();
        assert!((pred[0] - 1.0).abs() < 0.1);
        assert!(pred[1] < 0.2);
    }

    #[test]
    fn predictions_stay_within_target_range() {
        let (x, y) = sine(40);
        let mut forest = RandomForestRegressor::new().with_estimators(15);
        forest.fit(&x, &y).unwrap();
        let pred = forest.predict(&array![[-5.0], [5.0]]).unwrap();
        assert!(pred.iter().all(|&p| (-1e-9..=1.0 + 1e-9).contains(&p)));
    }
}
