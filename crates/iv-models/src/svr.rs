//! Epsilon-insensitive support vector regression with an RBF kernel.
//!
//! The bias is folded into the kernel (`K'(a, b) = K(a, b) + 1`), which turns
//! the dual into a box-constrained problem without the equality constraint:
//!
//! ```text
//! min_β  ½ βᵀ K' β − yᵀ β + ε ‖β‖₁    subject to  −C ≤ β_i ≤ C
//! ```
//!
//! Each coordinate step solves its one-dimensional subproblem exactly, and
//! the model predicts `f(x) = Σ β_i K'(x_i, x)`.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use iv_types::{IvResult, ModelError};

use crate::{check_features, check_training_data, not_fitted, Regressor};

/// Kernel matrices above this size are refused.
pub const MAX_TRAINING_SAMPLES: usize = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedSvr {
    support: Array2<f64>,
    dual_coef: Array1<f64>,
    /// `Σ β_i` over the support vectors, the augmented-kernel bias term.
    bias: f64,
    gamma: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Svr {
    pub c: f64,
    pub epsilon: f64,
    /// Explicit kernel width; `None` uses `1 / (n_features · var(X))`.
    pub gamma: Option<f64>,
    pub max_iter: usize,
    pub tol: f64,
    fitted: Option<FittedSvr>,
}

impl Svr {
    pub fn new() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.1,
            gamma: None,
            max_iter: 1000,
            tol: 1e-3,
            fitted: None,
        }
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    pub fn n_support(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.dual_coef.len())
    }
}

impl Default for Svr {
    fn default() -> Self {
        Self::new()
    }
}

fn scale_gamma(x: &Array2<f64>) -> f64 {
    let n = x.len() as f64;
    let mean = x.sum() / n;
    let var = x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    if var > 0.0 {
        1.0 / (x.ncols() as f64 * var)
    } else {
        1.0
    }
}

fn rbf(a: &ArrayView1<f64>, b: &ArrayView1<f64>, gamma: f64) -> f64 {
    let dist: f64 = a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum();
    (-gamma * dist).exp()
}

fn soft_threshold(value: f64, lambda: f64) -> f64 {
    value.signum() * (value.abs() - lambda).max(0.0)
}

impl Regressor for Svr {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> IvResult<()> {
        check_training_data(self.name(), x, y)?;
        let n = x.nrows();
        if n > MAX_TRAINING_SAMPLES {
            return Err(ModelError::TooManySamples {
                model: self.name().to_string(),
                samples: n,
                limit: MAX_TRAINING_SAMPLES,
            }
            .into());
        }

        let gamma = self.gamma.unwrap_or_else(|| scale_gamma(x));
        let mut q = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..=i {
                let k = rbf(&x.row(i), &x.row(j), gamma) + 1.0;
                q[[i, j]] = k;
                q[[j, i]] = k;
            }
        }

        let mut beta = Array1::<f64>::zeros(n);
        // Running Q·β.
        let mut q_beta = Array1::<f64>::zeros(n);
        let mut sweeps = 0;

        while sweeps < self.max_iter {
            sweeps += 1;
            let mut max_delta = 0.0f64;

            for i in 0..n {
                let q_ii = q[[i, i]];
                let r = y[i] - (q_beta[i] - q_ii * beta[i]);
                let updated = (soft_threshold(r, self.epsilon) / q_ii).clamp(-self.c, self.c);
                let delta = updated - beta[i];
                if delta != 0.0 {
                    q_beta.scaled_add(delta, &q.row(i));
                    beta[i] = updated;
                    max_delta = max_delta.max(delta.abs());
                }
            }

            if max_delta < self.tol {
                break;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&i| beta[i] != 0.0).collect();
        let dual_coef = beta.select(Axis(0), &support);
        let bias = dual_coef.sum();

        tracing::debug!(
            "SVR fitted: {} support vectors of {} samples after {} sweeps (gamma {:.4})",
            support.len(),
            n,
            sweeps,
            gamma
        );

        self.fitted = Some(FittedSvr {
            support: x.select(Axis(0), &support),
            dual_coef,
            bias,
            gamma,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> IvResult<Array1<f64>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        if fitted.support.nrows() > 0 {
            check_features(fitted.support.ncols(), x)?;
        }

        Ok(x
            .outer_iter()
            .map(|row| {
                fitted
                    .support
                    .outer_iter()
                    .zip(fitted.dual_coef.iter())
                    .map(|(sv, b)| b * rbf(&sv, &row, fitted.gamma))
                    .sum::<f64>()
                    + fitted.bias
            })
            .collect())
    }

    fn name(&self) -> &str {
        "SVR"
    }
}
