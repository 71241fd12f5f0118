//! Search configuration: the request-side `pso_config` block and the
//! validated, immutable [`SearchConfig`] built from it.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::errors::IvResult;
use crate::validation_error;

/// Convergence threshold used when a request omits `minstep` / `minfunc`.
pub const DEFAULT_THRESHOLD: f64 = 1e-8;

/// Concurrent runs allowed per available core in one round.
pub const RUNS_PER_CORE: usize = 8;

/// Output keys that share a solution row with the feature values.
pub const RESERVED_FEATURE_NAMES: [&str; 3] = ["predicted", "epsilon", "relative_error"];

/// Upper bound on `nprocessors`: [`RUNS_PER_CORE`] times the host's
/// available parallelism, which counts as 1 when it cannot be queried.
pub fn max_processors() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_mul(RUNS_PER_CORE)
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// What the multi-model loop does when one predictor variant fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Any fit or search fault aborts the whole request.
    #[default]
    #[serde(rename = "abort")]
    Abort,
    /// Log the fault, drop the variant and continue with the next one.
    #[serde(rename = "skip")]
    SkipVariant,
}

/// Swarm settings exactly as they arrive in a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsoConfig {
    pub lb: Vec<f64>,
    pub ub: Vec<f64>,
    pub swarmsize: usize,
    pub maxiter: usize,
    pub omega: f64,
    pub phip: f64,
    pub phig: f64,
    #[serde(default = "default_threshold")]
    pub minstep: f64,
    #[serde(default = "default_threshold")]
    pub minfunc: f64,
    pub n_solutions: usize,
    pub nprocessors: usize,
    pub max_rounds: usize,
    #[serde(default)]
    pub debug_flag: bool,
    #[serde(default)]
    pub on_model_failure: FailurePolicy,
}

/// Immutable configuration for one inverse-design request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Feature names; fixes the order of every position vector.
    pub features: Vec<String>,
    pub lower_bounds: Vec<f64>,
    pub upper_bounds: Vec<f64>,
    /// The output value the search drives the predictor toward (ε).
    pub target_value: f64,

    pub swarm_size: usize,
    pub max_iterations: usize,
    /// Inertia weight.
    pub omega: f64,
    /// Cognitive (personal best) weight.
    pub phip: f64,
    /// Social (swarm best) weight.
    pub phig: f64,
    pub min_step: f64,
    pub min_func: f64,

    /// Desired number of ranked solutions per predictor variant.
    pub n_solutions: usize,
    /// Concurrent optimizer runs per round, at most [`max_processors`].
    pub n_processors: usize,
    pub max_rounds: usize,

    pub debug: bool,
    pub failure_policy: FailurePolicy,
}

impl SearchConfig {
    pub fn new(
        features: Vec<String>,
        lower_bounds: Vec<f64>,
        upper_bounds: Vec<f64>,
        target_value: f64,
    ) -> Self {
        Self {
            features,
            lower_bounds,
            upper_bounds,
            target_value,
            swarm_size: 50,
            max_iterations: 100,
            omega: 0.5,
            phip: 0.5,
            phig: 0.5,
            min_step: DEFAULT_THRESHOLD,
            min_func: DEFAULT_THRESHOLD,
            n_solutions: 10,
            n_processors: 4,
            max_rounds: 5,
            debug: false,
            failure_policy: FailurePolicy::Abort,
        }
    }

    /// Build and validate a configuration from the request's `pso_config`.
    pub fn from_pso(features: Vec<String>, target_value: f64, pso: &PsoConfig) -> IvResult<Self> {
        let config = Self::new(features, pso.lb.clone(), pso.ub.clone(), target_value)
            .with_swarm(pso.swarmsize, pso.maxiter)
            .with_coefficients(pso.omega, pso.phip, pso.phig)
            .with_thresholds(pso.minstep, pso.minfunc)
            .with_rounds(pso.n_solutions, pso.nprocessors, pso.max_rounds)
            .with_debug(pso.debug_flag)
            .with_failure_policy(pso.on_model_failure);
        config.validate()?;
        Ok(config)
    }

    pub fn with_swarm(mut self, swarm_size: usize, max_iterations: usize) -> Self {
        self.swarm_size = swarm_size;
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_coefficients(mut self, omega: f64, phip: f64, phig: f64) -> Self {
        self.omega = omega;
        self.phip = phip;
        self.phig = phig;
        self
    }

    pub fn with_thresholds(mut self, min_step: f64, min_func: f64) -> Self {
        self.min_step = min_step;
        self.min_func = min_func;
        self
    }

    pub fn with_rounds(mut self, n_solutions: usize, n_processors: usize, max_rounds: usize) -> Self {
        self.n_solutions = n_solutions;
        self.n_processors = n_processors;
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Number of feature dimensions searched.
    pub fn dimensions(&self) -> usize {
        self.features.len()
    }

    /// Seeds for the zero-based `round`: `r·n + 1 ..= r·n + n`.
    pub fn round_seeds(&self, round: usize) -> RangeInclusive<u64> {
        let n = self.n_processors as u64;
        let base = round as u64 * n;
        (base + 1)..=(base + n)
    }

    /// Rounds after which the coordinator stops even if the quota is unmet.
    /// A search always runs at least one round.
    pub fn round_cap(&self) -> usize {
        self.max_rounds.max(1)
    }

    pub fn validate(&self) -> IvResult<()> {
        let d = self.features.len();
        if d == 0 {
            return Err(validation_error!("At least one feature is required"));
        }
        for (i, name) in self.features.iter().enumerate() {
            if RESERVED_FEATURE_NAMES.contains(&name.as_str()) {
                return Err(validation_error!(
                    "Feature name '{}' is reserved for solution output",
                    name
                ));
            }
            if self.features[..i].contains(name) {
                return Err(validation_error!("Duplicate feature name '{}'", name));
            }
        }
        if self.lower_bounds.len() != d || self.upper_bounds.len() != d {
            return Err(validation_error!(
                "Bounds must have one entry per feature: {} features, {} lower, {} upper",
                d,
                self.lower_bounds.len(),
                self.upper_bounds.len()
            ));
        }
        for (i, (lo, hi)) in self.lower_bounds.iter().zip(&self.upper_bounds).enumerate() {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(validation_error!(
                    "Bounds for feature '{}' must be finite",
                    self.features[i]
                ));
            }
            if lo > hi {
                return Err(validation_error!(
                    "Lower bound {} exceeds upper bound {} for feature '{}'",
                    lo,
                    hi,
                    self.features[i]
                ));
            }
        }
        if !self.target_value.is_finite() {
            return Err(validation_error!("'target_value' must be a finite number"));
        }
        if self.swarm_size == 0 {
            return Err(validation_error!("'swarmsize' must be at least 1"));
        }
        if self.n_processors == 0 {
            return Err(validation_error!("'nprocessors' must be at least 1"));
        }
        let cap = max_processors();
        if self.n_processors > cap {
            return Err(validation_error!(
                "'nprocessors' is {} but this host allows at most {}",
                self.n_processors,
                cap
            ));
        }
        if self.n_solutions == 0 {
            return Err(validation_error!("'n_solutions' must be at least 1"));
        }
        if ![self.omega, self.phip, self.phig].iter().all(|c| c.is_finite()) {
            return Err(validation_error!("Swarm coefficients must be finite"));
        }
        if !(self.min_step >= 0.0 && self.min_func >= 0.0) {
            return Err(validation_error!("'minstep' and 'minfunc' must be non-negative"));
        }
        Ok(())
    }
}
