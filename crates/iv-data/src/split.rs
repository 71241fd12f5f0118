use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use iv_types::{validation_error, DataError, IvResult};

use crate::dataset::Dataset;

/// Fraction of rows held out for scoring the fitted predictors.
pub const DEFAULT_TEST_SIZE: f64 = 0.2;
/// Shuffle seed used by the request pipeline.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Row-disjoint train and test partitions of a [`Dataset`].
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
}

impl TrainTestSplit {
    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn n_test(&self) -> usize {
        self.x_test.nrows()
    }
}

/// Shuffle rows with a seeded generator and hold out `ceil(test_size * n)` of them.
///
/// Both partitions always keep at least one row.
pub fn train_test_split(dataset: &Dataset, test_size: f64, seed: u64) -> IvResult<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(validation_error!(
            "test_size must lie strictly between 0 and 1, got {}",
            test_size
        ));
    }

    let n = dataset.n_samples();
    if n < 2 {
        return Err(DataError::InsufficientData {
            message: format!("need at least 2 rows to split, got {}", n),
        }
        .into());
    }

    let n_test = ((test_size * n as f64).ceil() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);

    tracing::debug!(
        "Split {} rows into {} train / {} test (seed {})",
        n,
        train_idx.len(),
        test_idx.len(),
        seed
    );

    Ok(TrainTestSplit {
        x_train: dataset.x.select(Axis(0), train_idx),
        y_train: dataset.y.select(Axis(0), train_idx),
        x_test: dataset.x.select(Axis(0), test_idx),
        y_test: dataset.y.select(Axis(0), test_idx),
    })
}
