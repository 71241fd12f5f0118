//! Candidates, per-variant solution pools and model results.

use serde::{Deserialize, Serialize};

/// Relative error reported for every candidate when the target is zero.
pub const ZERO_TARGET_SENTINEL: f64 = 1e24;

/// `|predicted - target| / |target|`, or [`ZERO_TARGET_SENTINEL`] for a zero target.
///
/// The divisor is the target's magnitude rather than the signed target, so a
/// negative target still yields a non-negative error and ranks like any other.
pub fn relative_error(predicted: f64, target: f64) -> f64 {
    if target == 0.0 {
        ZERO_TARGET_SENTINEL
    } else {
        (predicted - target).abs() / target.abs()
    }
}

/// One evaluated feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Feature values in `SearchConfig::features` order.
    pub position: Vec<f64>,
    pub predicted: f64,
    pub relative_error: f64,
}

impl Candidate {
    pub fn new(position: Vec<f64>, predicted: f64, target: f64) -> Self {
        Self {
            position,
            predicted,
            relative_error: relative_error(predicted, target),
        }
    }
}

/// Candidates gathered for one predictor variant.
///
/// Candidates accumulate in discovery order until [`SolutionPool::finalize`]
/// ranks and truncates them. A finalized pool is read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolutionPool {
    candidates: Vec<Candidate>,
    finalized: bool,
}

impl SolutionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate. Ignored once the pool is finalized.
    pub fn push(&mut self, candidate: Candidate) {
        if !self.finalized {
            self.candidates.push(candidate);
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Stable sort ascending by relative error, then keep the first `n_solutions`.
    /// Only the first call has any effect.
    pub fn finalize(&mut self, n_solutions: usize) {
        if self.finalized {
            return;
        }
        self.candidates
            .sort_by(|a, b| a.relative_error.total_cmp(&b.relative_error));
        self.candidates.truncate(n_solutions);
        self.finalized = true;
    }

    /// Top-ranked candidate; meaningful after finalization.
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }
}

/// Outcome of the full search for one predictor variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub model_name: String,
    pub best: Candidate,
    pub pool: SolutionPool,
    /// Wall-clock search time in seconds.
    pub runtime_secs: f64,
    pub rounds: usize,
    /// R² of the fitted predictor on the held-out split, when one exists.
    pub holdout_r2: Option<f64>,
}

impl ModelResult {
    pub fn best_error(&self) -> f64 {
        self.best.relative_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: f64, err: f64) -> Candidate {
        Candidate {
            position: vec![x],
            predicted: 0.0,
            relative_error: err,
        }
    }

    #[test]
    fn relative_error_uses_target_magnitude() {
        assert!((relative_error(11.0, 10.0) - 0.1).abs() < 1e-12);
        assert!((relative_error(9.0, 10.0) - 0.1).abs() < 1e-12);
        assert!((relative_error(-9.0, -10.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn zero_target_gets_sentinel() {
        assert_eq!(relative_error(0.0, 0.0), ZERO_TARGET_SENTINEL);
        assert_eq!(relative_error(123.0, 0.0), ZERO_TARGET_SENTINEL);
        assert_eq!(Candidate::new(vec![1.0], 5.0, 0.0).relative_error, ZERO_TARGET_SENTINEL);
    }

    #[test]
    fn finalize_sorts_and_truncates() {
        let mut pool = SolutionPool::new();
        for (x, err) in [(1.0, 0.3), (2.0, 0.1), (3.0, 0.2), (4.0, 0.05)] {
            pool.push(candidate(x, err));
        }
        pool.finalize(3);

        let errors: Vec<f64> = pool.iter().map(|c| c.relative_error).collect();
        assert_eq!(errors, vec![0.05, 0.1, 0.2]);
        assert_eq!(pool.best().unwrap().position, vec![4.0]);
    }

    #[test]
    fn finalize_keeps_discovery_order_for_ties() {
        let mut pool = SolutionPool::new();
        for x in 0..5 {
            pool.push(candidate(x as f64, ZERO_TARGET_SENTINEL));
        }
        pool.finalize(10);

        let order: Vec<f64> = pool.iter().map(|c| c.position[0]).collect();
        assert_eq!(order, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn finalize_runs_once() {
        let mut pool = SolutionPool::new();
        for x in 0..4 {
            pool.push(candidate(x as f64, 1.0 - x as f64 * 0.1));
        }
        pool.finalize(3);
        pool.finalize(1);
        pool.push(candidate(9.0, 0.0));

        assert!(pool.is_finalized());
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.best().unwrap().position, vec![3.0]);
    }

    #[test]
    fn finalize_with_fewer_than_quota() {
        let mut pool = SolutionPool::new();
        pool.push(candidate(1.0, 0.5));
        pool.finalize(10);
        assert_eq!(pool.len(), 1);
    }
}
