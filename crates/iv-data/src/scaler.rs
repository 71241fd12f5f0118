//! Feature scaling applied between raw candidate vectors and the predictors.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use iv_types::{DataError, IvResult};

/// A fitted column-wise transform. Shared read-only across search workers.
pub trait Scaler: Send + Sync {
    fn transform(&self, x: &Array2<f64>) -> IvResult<Array2<f64>>;

    fn name(&self) -> &str;
}

/// Min-max scaling to `[0, 1]` per column: `(x - min) / (max - min)`.
///
/// Constant columns use a range of 1 so they map to 0 instead of NaN.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    data_min: Option<Array1<f64>>,
    data_range: Option<Array1<f64>>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn per-column minimum and range.
    pub fn fit(&mut self, x: &Array2<f64>) -> IvResult<&mut Self> {
        if x.nrows() == 0 {
            return Err(DataError::Empty.into());
        }

        let data_min = x.fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v));
        let data_max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let data_range = (&data_max - &data_min).mapv(|r| if r == 0.0 { 1.0 } else { r });

        self.data_min = Some(data_min);
        self.data_range = Some(data_range);
        Ok(self)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> IvResult<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn inverse_transform(&self, x: &Array2<f64>) -> IvResult<Array2<f64>> {
        let (data_min, data_range) = self.params(x)?;
        Ok(x * data_range + data_min)
    }

    pub fn is_fitted(&self) -> bool {
        self.data_min.is_some()
    }

    pub fn n_features(&self) -> Option<usize> {
        self.data_min.as_ref().map(Array1::len)
    }

    fn params(&self, x: &Array2<f64>) -> IvResult<(&Array1<f64>, &Array1<f64>)> {
        let (data_min, data_range) = match (&self.data_min, &self.data_range) {
            (Some(min), Some(range)) => (min, range),
            _ => return Err(DataError::ScalerNotFitted.into()),
        };
        if x.ncols() != data_min.len() {
            return Err(DataError::ShapeMismatch {
                expected: format!("{} columns", data_min.len()),
                actual: format!("{} columns", x.ncols()),
            }
            .into());
        }
        Ok((data_min, data_range))
    }
}

impl Scaler for MinMaxScaler {
    fn transform(&self, x: &Array2<f64>) -> IvResult<Array2<f64>> {
        let (data_min, data_range) = self.params(x)?;
        Ok((x - data_min) / data_range)
    }

    fn name(&self) -> &str {
        "MinMax"
    }
}

/// Pass-through scaler for predictors trained on raw features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityScaler;

impl Scaler for IdentityScaler {
    fn transform(&self, x: &Array2<f64>) -> IvResult<Array2<f64>> {
        Ok(x.clone())
    }

    fn name(&self) -> &str {
        "None"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iv_types::IvError;
    use ndarray::array;

    #[test]
    fn maps_columns_to_unit_interval() {
        let x = array![[0.0, 10.0], [5.0, 20.0], [10.0, 30.0]];
        let mut scaler = MinMaxScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        assert_eq!(scaled, array![[0.0, 0.0], [0.5, 0.5], [1.0, 1.0]]);
        assert_eq!(scaler.n_features(), Some(2));
    }

    #[test]
    fn out_of_range_values_extrapolate() {
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&array![[0.0], [2.0]]).unwrap();
        let scaled = scaler.transform(&array![[4.0], [-2.0]]).unwrap();
        assert_eq!(scaled, array![[2.0], [-1.0]]);
    }

    #[test]
    fn constant_column_maps_to_zero() {
        let mut scaler = MinMaxScaler::new();
        let scaled = scaler.fit_transform(&array![[3.0, 1.0], [3.0, 2.0]]).unwrap();
        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.0]);
        assert!(scaled.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn inverse_restores_input() {
        let x = array![[1.0, -4.0], [3.0, 8.0], [2.0, 0.0]];
        let mut scaler = MinMaxScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();
        let restored = scaler.inverse_transform(&scaled).unwrap();
        for (a, b) in restored.iter().zip(x.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn unfitted_and_wrong_width_are_errors() {
        let scaler = MinMaxScaler::new();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(IvError::Data(DataError::ScalerNotFitted))
        ));

        let mut scaler = MinMaxScaler::new();
        scaler.fit(&array![[1.0, 2.0], [2.0, 3.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(IvError::Data(DataError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn identity_leaves_values_untouched() {
        let x = array![[1.5, -2.0]];
        assert_eq!(IdentityScaler.transform(&x).unwrap(), x);
    }

    #[test]
    fn scalers_report_their_names() {
        assert_eq!(MinMaxScaler::new().name(), "MinMax");
        assert_eq!(IdentityScaler.name(), "None");
    }
}
