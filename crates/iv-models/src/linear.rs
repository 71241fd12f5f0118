//! Linear models: ordinary least squares, ridge and lasso.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use iv_types::{IvResult, ModelError};

use crate::{check_features, check_training_data, not_fitted, Regressor};

/// Solve `A x = b` for symmetric positive-definite `A` by Cholesky factorization.
///
/// When a pivot is not positive the diagonal gets a small relative ridge and
/// the factorization is retried once.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    cholesky_factor(a)
        .or_else(|| {
            let n = a.nrows() as f64;
            let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n;
            let mut a_reg = a.clone();
            a_reg.diag_mut().mapv_inplace(|v| v + ridge.max(f64::EPSILON));
            cholesky_factor(&a_reg)
        })
        .map(|l| {
            let n = l.nrows();
            // L y = b
            let mut y = Array1::zeros(n);
            for i in 0..n {
                let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
                y[i] = (b[i] - sum) / l[[i, i]];
            }
            // L^T x = y
            let mut x = Array1::zeros(n);
            for i in (0..n).rev() {
                let sum: f64 = (i + 1..n).map(|j| l[[j, i]] * x[j]).sum();
                x[i] = (y[i] - sum) / l[[i, i]];
            }
            x
        })
}

fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Gauss-Jordan elimination with partial pivoting on `[A | b]`.
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut aug = Array2::zeros((n, n + 1));
    aug.slice_mut(ndarray::s![.., ..n]).assign(a);
    aug.column_mut(n).assign(b);

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| {
            aug[[r1, col]].abs().total_cmp(&aug[[r2, col]].abs())
        })?;
        if aug[[pivot_row, col]].abs() < 1e-10 {
            return None;
        }
        if pivot_row != col {
            for j in 0..=n {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        aug.row_mut(col).mapv_inplace(|v| v / pivot);

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                if factor != 0.0 {
                    for j in 0..=n {
                        aug[[row, j]] -= factor * aug[[col, j]];
                    }
                }
            }
        }
    }

    Some(aug.column(n).to_owned())
}

/// Center columns and target; returns `(x_c, y_c, x_mean, y_mean)`.
fn center(model: &str, x: &Array2<f64>, y: &Array1<f64>) -> IvResult<(Array2<f64>, Array1<f64>, Array1<f64>, f64)> {
    let x_mean = x.mean_axis(Axis(0)).ok_or_else(|| ModelError::FitFailed {
        model: model.to_string(),
        message: "cannot center an empty matrix".to_string(),
    })?;
    let y_mean = y.mean().unwrap_or(0.0);
    let x_c = x - &x_mean;
    let y_c = y - y_mean;
    Ok((x_c, y_c, x_mean, y_mean))
}

/// Least squares with intercept and optional L2 penalty `alpha`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    name: String,
    pub alpha: f64,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl LinearRegression {
    /// Ordinary least squares.
    pub fn new() -> Self {
        Self {
            name: "Linear Regression".to_string(),
            alpha: 0.0,
            coefficients: None,
            intercept: 0.0,
        }
    }

    /// Ridge regression, minimizing `||y - Xw||² + alpha·||w||²`.
    pub fn ridge(alpha: f64) -> Self {
        Self {
            name: "Ridge Regression".to_string(),
            alpha,
            ..Self::new()
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> IvResult<()> {
        check_training_data(&self.name, x, y)?;
        let (x_c, y_c, x_mean, y_mean) = center(&self.name, x, y)?;

        let mut xtx = x_c.t().dot(&x_c);
        if self.alpha > 0.0 {
            xtx.diag_mut().mapv_inplace(|v| v + self.alpha);
        }
        let xty = x_c.t().dot(&y_c);

        let coefficients = cholesky_solve(&xtx, &xty)
            .or_else(|| gauss_jordan_solve(&xtx, &xty))
            .ok_or_else(|| ModelError::Singular {
                model: self.name.clone(),
            })?;

        self.intercept = y_mean - coefficients.dot(&x_mean);
        self.coefficients = Some(coefficients);
        tracing::debug!("{} fitted on {} samples", self.name, x.nrows());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> IvResult<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or_else(|| not_fitted(&self.name))?;
        check_features(coefficients.len(), x)?;
        Ok(x.dot(coefficients) + self.intercept)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// L1-penalized least squares fitted by cyclic coordinate descent.
///
/// Minimizes `(1 / 2n)·||y - Xw||² + alpha·||w||₁` with an unpenalized intercept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            max_iter: 1000,
            tol: 1e-4,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }
}

fn soft_threshold(value: f64, lambda: f64) -> f64 {
    if value > lambda {
        value - lambda
    } else if value < -lambda {
        value + lambda
    } else {
        0.0
    }
}

impl Regressor for LassoRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> IvResult<()> {
        check_training_data(self.name(), x, y)?;
        let (x_c, y_c, x_mean, y_mean) = center(self.name(), x, y)?;

        let n = x_c.nrows() as f64;
        let d = x_c.ncols();
        let lambda = self.alpha * n;
        let col_sq: Vec<f64> = x_c.columns().into_iter().map(|c| c.dot(&c)).collect();

        let mut w = Array1::<f64>::zeros(d);
        let mut residual = y_c.clone();

        for iter in 0..self.max_iter {
            let mut max_delta = 0.0f64;
            let mut max_w = 0.0f64;

            for j in 0..d {
                if col_sq[j] == 0.0 {
                    continue;
                }
                let column = x_c.column(j);
                let old = w[j];
                // Correlation of column j with the residual that excludes w_j.
                let rho = column.dot(&residual) + old * col_sq[j];
                let new = soft_threshold(rho, lambda) / col_sq[j];

                if new != old {
                    residual.scaled_add(old - new, &column);
                    w[j] = new;
                }
                max_delta = max_delta.max((new - old).abs());
                max_w = max_w.max(new.abs());
            }

            if max_w == 0.0 || max_delta / max_w < self.tol {
                tracing::debug!("Lasso converged after {} sweeps", iter + 1);
                break;
            }
        }

        self.intercept = y_mean - w.dot(&x_mean);
        self.coefficients = Some(w);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> IvResult<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_features(coefficients.len(), x)?;
        Ok(x.dot(coefficients) + self.intercept)
    }

    fn name(&self) -> &str {
        "Lasso Regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iv_types::IvError;
    use ndarray::array;

    fn plane() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 1.0],
            [1.0, 0.0],
            [2.0, 2.0],
            [3.0, 1.0],
            [4.0, 3.0],
            [5.0, 0.5]
        ];
        let y = x.map_axis(Axis(1), |r| 3.0 * r[0] - 2.0 * r[1] + 0.5);
        (x, y)
    }

    #[test]
    fn ols_recovers_plane() {
        let (x, y) = plane();
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients().unwrap();
        assert!((coef[0] - 3.0).abs() < 1e-8);
        assert!((coef[1] + 2.0).abs() < 1e-8);
        assert!((model.intercept - 0.5).abs() < 1e-8);

        let pred = model.predict(&array![[10.0, 1.0]]).unwrap();
        assert!((pred[0] - 28.5).abs() < 1e-6);
    }

    #[test]
    fn ridge_shrinks_coefficients() {
        let (x, y) = plane();
        let mut ols = LinearRegression::new();
        let mut ridge = LinearRegression::ridge(10.0);
        ols.fit(&x, &y).unwrap();
        ridge.fit(&x, &y).unwrap();

        let ols_norm = ols.coefficients().unwrap().mapv(|v| v * v).sum();
        let ridge_norm = ridge.coefficients().unwrap().mapv(|v| v * v).sum();
        assert!(ridge_norm < ols_norm);
        assert_eq!(ridge.name(), "Ridge Regression");
    }

    #[test]
    fn duplicated_column_still_fits() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];
        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&array![[5.0, 5.0]]).unwrap();
        assert!((pred[0] - 10.0).abs() < 1e-3);
    }

    #[test]
    fn lasso_zeroes_irrelevant_feature() {
        let x = Array2::from_shape_fn((50, 2), |(i, j)| {
            if j == 0 {
                i as f64 / 49.0
            } else {
                ((i * 7919) % 13) as f64 / 130.0
            }
        });
        let y = x.column(0).mapv(|v| 4.0 * v);
        let mut model = LassoRegression::new(0.1);
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients().unwrap();
        assert!(coef[0] > 0.0 && coef[0] < 4.0);
        assert_eq!(coef[1], 0.0);
    }

    #[test]
    fn lasso_large_alpha_predicts_mean() {
        let (x, y) = plane();
        let mut model = LassoRegression::new(1e6);
        model.fit(&x, &y).unwrap();
        let mean = y.mean().unwrap();
        let pred = model.predict(&array![[100.0, -50.0]]).unwrap();
        assert!((pred[0] - mean).abs() < 1e-9);
    }

    #[test]
    fn shape_errors() {
        let mut model = LinearRegression::new();
        let err = model.fit(&array![[1.0], [2.0]], &array![1.0]).unwrap_err();
        assert!(matches!(err, IvError::Model(ModelError::ShapeMismatch { .. })));

        let (x, y) = plane();
        model.fit(&x, &y).unwrap();
        assert!(model.predict(&array![[1.0, 2.0, 3.0]]).is_err());
    }

    #[test]
    fn gauss_jordan_solves_general_system() {
        let a = array![[0.0, 2.0], [1.0, 1.0]];
        let b = array![4.0, 3.0];
        let x = gauss_jordan_solve(&a, &b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
        assert!(gauss_jordan_solve(&array![[1.0, 2.0], [2.0, 4.0]], &b).is_none());
    }
}
