//! Regression predictors behind a single [`Regressor`] seam.
//!
//! The search engine only ever fits a predictor once and then calls
//! [`Regressor::predict`] from many worker threads, so every model is
//! `Send + Sync` and prediction takes `&self`.

pub mod forest;
pub mod linear;
pub mod svr;
pub mod tree;

pub use forest::RandomForestRegressor;
pub use linear::{LassoRegression, LinearRegression};
pub use svr::Svr;
pub use tree::DecisionTreeRegressor;

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use iv_types::{IvError, IvResult, ModelError};

/// A fit-once, predict-many regression model.
pub trait Regressor: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> IvResult<()>;

    fn predict(&self, x: &Array2<f64>) -> IvResult<Array1<f64>>;

    /// Display name used in responses and logs.
    fn name(&self) -> &str;
}

/// The supported predictor variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    RandomForest,
    LinearRegression,
    RidgeRegression,
    LassoRegression,
    Svr,
    DecisionTree,
}

impl ModelKind {
    /// Default processing order. Ties between variants go to the earlier entry.
    pub const ALL: [ModelKind; 6] = [
        ModelKind::RandomForest,
        ModelKind::LinearRegression,
        ModelKind::RidgeRegression,
        ModelKind::LassoRegression,
        ModelKind::Svr,
        ModelKind::DecisionTree,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::LinearRegression => "Linear Regression",
            ModelKind::RidgeRegression => "Ridge Regression",
            ModelKind::LassoRegression => "Lasso Regression",
            ModelKind::Svr => "SVR",
            ModelKind::DecisionTree => "Decision Tree",
        }
    }

    fn snake_name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::LinearRegression => "linear_regression",
            ModelKind::RidgeRegression => "ridge_regression",
            ModelKind::LassoRegression => "lasso_regression",
            ModelKind::Svr => "svr",
            ModelKind::DecisionTree => "decision_tree",
        }
    }

    /// Look a variant up by display name or snake-case identifier, ignoring case.
    pub fn from_name(name: &str) -> IvResult<Self> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| {
                kind.display_name().eq_ignore_ascii_case(wanted)
                    || kind.snake_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                ModelError::UnknownModel {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// A fresh, unfitted predictor with this variant's fixed configuration.
    pub fn build(&self) -> Box<dyn Regressor> {
        match self {
            ModelKind::RandomForest => Box::new(RandomForestRegressor::new()),
            ModelKind::LinearRegression => Box::new(LinearRegression::new()),
            ModelKind::RidgeRegression => Box::new(LinearRegression::ridge(1.0)),
            ModelKind::LassoRegression => Box::new(LassoRegression::new(0.1)),
            ModelKind::Svr => Box::new(Svr::new()),
            ModelKind::DecisionTree => Box::new(DecisionTreeRegressor::new(10)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ModelKind {
    type Err = IvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// Coefficient of determination. A constant target scores 1.0 on an exact fit, 0.0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> IvResult<f64> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::ShapeMismatch {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        }
        .into());
    }
    if y_true.is_empty() {
        return Err(iv_types::DataError::Empty.into());
    }

    let mean = y_true.sum() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean) * (t - mean)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Shape checks shared by every `fit`.
pub(crate) fn check_training_data(model: &str, x: &Array2<f64>, y: &Array1<f64>) -> IvResult<()> {
    if x.nrows() != y.len() {
        return Err(ModelError::ShapeMismatch {
            expected: format!("{} targets", x.nrows()),
            actual: format!("{} targets", y.len()),
        }
        .into());
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModelError::FitFailed {
            model: model.to_string(),
            message: format!("empty training matrix {}x{}", x.nrows(), x.ncols()),
        }
        .into());
    }
    Ok(())
}

/// Column-count check shared by every `predict`.
pub(crate) fn check_features(n_features: usize, x: &Array2<f64>) -> IvResult<()> {
    if x.ncols() != n_features {
        return Err(ModelError::ShapeMismatch {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        }
        .into());
    }
    Ok(())
}

pub(crate) fn not_fitted(model: &str) -> IvError {
    ModelError::NotFitted {
        model: model.to_string(),
    }
    .into()
}
