//! The function the swarm minimizes: distance between a predictor's output
//! and the requested target value.

use ndarray::Array2;

use iv_data::Scaler;
use iv_models::Regressor;
use iv_types::{internal_error, IvResult};

/// Scores raw feature vectors. Shared read-only by every worker in a round.
pub trait Objective: Sync {
    /// Raw predicted output for one feature vector.
    fn predict(&self, x: &[f64]) -> IvResult<f64>;

    /// The value the search drives the prediction toward.
    fn target(&self) -> f64;

    /// `|predict(x) - target|`, the quantity being minimized.
    fn evaluate(&self, x: &[f64]) -> IvResult<f64> {
        Ok((self.predict(x)? - self.target()).abs())
    }
}

/// A fitted scaler and predictor pair standing in for the real process.
pub struct SurrogateObjective<'a> {
    scaler: &'a dyn Scaler,
    model: &'a dyn Regressor,
    target: f64,
}

impl<'a> SurrogateObjective<'a> {
    pub fn new(scaler: &'a dyn Scaler, model: &'a dyn Regressor, target: f64) -> Self {
        Self { scaler, model, target }
    }
}

impl Objective for SurrogateObjective<'_> {
    fn predict(&self, x: &[f64]) -> IvResult<f64> {
        let row = Array2::from_shape_vec((1, x.len()), x.to_vec())
            .map_err(|e| internal_error!("Cannot shape candidate vector: {}", e))?;
        let scaled = self.scaler.transform(&row)?;
        let predicted = self.model.predict(&scaled)?;
        predicted
            .first()
            .copied()
            .ok_or_else(|| internal_error!("{} returned no prediction", self.model.name()))
    }

    fn target(&self) -> f64 {
        self.target
    }
}

/// Objective backed by a plain function, for analytic targets and tests.
pub struct FnObjective<F> {
    target: f64,
    f: F,
}

impl<F> FnObjective<F>
where
    F: Fn(&[f64]) -> IvResult<f64> + Sync,
{
    pub fn new(target: f64, f: F) -> Self {
        Self { target, f }
    }
}

impl<F> Objective for FnObjective<F>
where
    F: Fn(&[f64]) -> IvResult<f64> + Sync,
{
    fn predict(&self, x: &[f64]) -> IvResult<f64> {
        (self.f)(x)
    }

    fn target(&self) -> f64 {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iv_data::{IdentityScaler, MinMaxScaler};
    use iv_models::LinearRegression;
    use iv_types::{DataError, IvError};
    use ndarray::array;

    #[test]
    fn evaluate_is_absolute_distance_to_target() {
        let objective = FnObjective::new(5.0, |x: &[f64]| Ok(x[0] * 2.0));
        assert_eq!(objective.evaluate(&[1.0]).unwrap(), 3.0);
        assert_eq!(objective.evaluate(&[4.0]).unwrap(), 3.0);
        assert_eq!(objective.predict(&[4.0]).unwrap(), 8.0);
    }

    #[test]
    fn surrogate_scales_before_predicting() {
        let x = array![[0.0], [10.0], [20.0]];
        let y = array![0.0, 1.0, 2.0];
        let mut scaler = MinMaxScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();
        let mut model = LinearRegression::new();
        model.fit(&scaled, &y).unwrap();

        let objective = SurrogateObjective::new(&scaler, &model, 1.5);
        assert!((objective.predict(&[15.0]).unwrap() - 1.5).abs() < 1e-9);
        assert!(objective.evaluate(&[15.0]).unwrap() < 1e-9);
    }

    #[test]
    fn scaler_faults_propagate() {
        let scaler = MinMaxScaler::new();
        let mut model = LinearRegression::new();
        model.fit(&array![[0.0], [1.0]], &array![0.0, 1.0]).unwrap();

        let objective = SurrogateObjective::new(&scaler, &model, 1.0);
        let err = objective.evaluate(&[0.5]).unwrap_err();
        assert!(matches!(err, IvError::Data(DataError::ScalerNotFitted)));
    }

    #[test]
    fn predictor_faults_propagate() {
        let model = LinearRegression::new();
        let objective = SurrogateObjective::new(&IdentityScaler, &model, 1.0);
        assert!(objective.predict(&[0.5]).is_err());
    }
}
