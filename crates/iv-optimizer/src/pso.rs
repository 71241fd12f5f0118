//! Seeded single-run particle swarm minimizer.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use iv_types::{IvResult, SearchConfig};

use crate::objective::Objective;

/// Why a swarm run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// A new swarm best changed the objective by at most `min_func`.
    MinFunc,
    /// A new swarm best moved by at most `min_step`.
    MinStep,
    /// The iteration cap was reached.
    MaxIter,
}

/// Result of one complete optimizer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub position: Vec<f64>,
    /// Objective value at `position`.
    pub fopt: f64,
    pub seed: u64,
    pub iterations: usize,
    pub reason: StopReason,
}

/// A seeded single-run optimizer the round coordinator can fan out.
pub trait SwarmRunner: Sync {
    fn run(&self, config: &SearchConfig, seed: u64, objective: &dyn Objective) -> IvResult<RunOutcome>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Particle swarm
// ---------------------------------------------------------------------------

/// Global-best particle swarm over the box `[lower_bounds, upper_bounds]`.
///
/// Each run owns a `ChaCha8Rng` seeded from its seed, so a run is a pure
/// function of `(config, seed, objective)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticleSwarm;

struct Particle {
    position: Vec<f64>,
    velocity: Vec<f64>,
    best_position: Vec<f64>,
    best_value: f64,
}

impl SwarmRunner for ParticleSwarm {
    fn run(&self, config: &SearchConfig, seed: u64, objective: &dyn Objective) -> IvResult<RunOutcome> {
        let lb = &config.lower_bounds;
        let ub = &config.upper_bounds;
        let dims = lb.len();
        let vhigh: Vec<f64> = lb.iter().zip(ub).map(|(l, u)| (u - l).abs()).collect();

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut swarm = Vec::with_capacity(config.swarm_size);
        let mut g: Vec<f64> = Vec::new();
        let mut fg = f64::INFINITY;

        for i in 0..config.swarm_size {
            let position: Vec<f64> = (0..dims)
                .map(|d| lb[d] + rng.gen::<f64>() * (ub[d] - lb[d]))
                .collect();
            let value = objective.evaluate(&position)?;

            if i == 0 {
                g = position.clone();
            }
            if value < fg {
                fg = value;
                g = position.clone();
            }

            let velocity = (0..dims)
                .map(|d| -vhigh[d] + rng.gen::<f64>() * 2.0 * vhigh[d])
                .collect();
            swarm.push(Particle {
                best_position: position.clone(),
                best_value: value,
                position,
                velocity,
            });
        }

        for iteration in 1..=config.max_iterations {
            for particle in swarm.iter_mut() {
                for d in 0..dims {
                    let rp: f64 = rng.gen();
                    let rg: f64 = rng.gen();
                    particle.velocity[d] = config.omega * particle.velocity[d]
                        + config.phip * rp * (particle.best_position[d] - particle.position[d])
                        + config.phig * rg * (g[d] - particle.position[d]);
                    particle.position[d] = (particle.position[d] + particle.velocity[d]).clamp(lb[d], ub[d]);
                }

                let fx = objective.evaluate(&particle.position)?;
                if fx >= particle.best_value || fx.is_nan() {
                    continue;
                }
                particle.best_position.copy_from_slice(&particle.position);
                particle.best_value = fx;

                if fx < fg {
                    let step = euclidean(&g, &particle.position);
                    let reason = if (fg - fx).abs() <= config.min_func {
                        Some(StopReason::MinFunc)
                    } else if step <= config.min_step {
                        Some(StopReason::MinStep)
                    } else {
                        None
                    };

                    if let Some(reason) = reason {
                        if config.debug {
                            tracing::debug!(
                                "seed {}: stopping at iteration {} ({:?}), fopt {:.6e}",
                                seed,
                                iteration,
                                reason,
                                fx
                            );
                        }
                        return Ok(RunOutcome {
                            position: particle.position.clone(),
                            fopt: fx,
                            seed,
                            iterations: iteration,
                            reason,
                        });
                    }

                    g.copy_from_slice(&particle.position);
                    fg = fx;
                }
            }

            if config.debug {
                tracing::debug!("seed {}: best after iteration {}: {:?} {:.6e}", seed, iteration, g, fg);
            }
        }

        Ok(RunOutcome {
            position: g,
            fopt: fg,
            seed,
            iterations: config.max_iterations,
            reason: StopReason::MaxIter,
        })
    }

    fn name(&self) -> &str {
        "particle-swarm"
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}
