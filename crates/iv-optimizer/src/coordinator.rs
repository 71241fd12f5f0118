//! Round-based fan-out of seeded optimizer runs for one predictor variant.

use std::time::{Duration, Instant};

use chrono::Utc;

use iv_types::{Candidate, IvResult, SearchConfig, SearchError, SolutionPool};

use crate::objective::Objective;
use crate::pso::{RunOutcome, SwarmRunner};

/// Ranked candidates for one variant plus bookkeeping about how they were found.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Finalized: sorted by relative error and truncated to `n_solutions`.
    pub pool: SolutionPool,
    pub rounds: usize,
    pub runtime: Duration,
}

/// Runs waves of `n_processors` concurrent optimizer runs until the pool
/// holds `n_solutions` candidates or the round cap is reached.
///
/// Every round is a hard barrier: all runs are joined before any result is
/// recorded, and only the coordinator touches the pool.
pub struct RoundCoordinator<'r> {
    runner: &'r dyn SwarmRunner,
}

impl<'r> RoundCoordinator<'r> {
    pub fn new(runner: &'r dyn SwarmRunner) -> Self {
        Self { runner }
    }

    pub fn search(&self, config: &SearchConfig, objective: &dyn Objective) -> IvResult<SearchReport> {
        config.validate()?;

        let started_at = Utc::now();
        let clock = Instant::now();
        tracing::info!(
            "Search started at {} with {} ({} runs per round, quota {}, round cap {})",
            started_at.to_rfc3339(),
            self.runner.name(),
            config.n_processors,
            config.n_solutions,
            config.round_cap()
        );

        let mut pool = SolutionPool::new();
        let mut rounds = 0;

        loop {
            let seeds = config.round_seeds(rounds);
            tracing::info!("Round {}: seeds {}..={}", rounds, seeds.start(), seeds.end());

            let outcomes = self.run_round(config, objective, seeds)?;
            for outcome in outcomes {
                let predicted = objective.predict(&outcome.position)?;
                pool.push(Candidate::new(outcome.position, predicted, config.target_value));
            }
            rounds += 1;

            tracing::info!("Round {} complete: {} solutions so far", rounds - 1, pool.len());

            if pool.len() >= config.n_solutions || rounds >= config.round_cap() {
                break;
            }
        }

        pool.finalize(config.n_solutions);
        let runtime = clock.elapsed();
        tracing::info!(
            "Search finished: {} solutions from {} rounds in {:.3}s",
            pool.len(),
            rounds,
            runtime.as_secs_f64()
        );

        Ok(SearchReport { pool, rounds, runtime })
    }

    /// Launch one run per seed on scoped threads and join them all.
    ///
    /// Outcomes come back in seed order. The first failing seed, if any,
    /// fails the round, but only after every thread has been joined.
    fn run_round(
        &self,
        config: &SearchConfig,
        objective: &dyn Objective,
        seeds: std::ops::RangeInclusive<u64>,
    ) -> IvResult<Vec<RunOutcome>> {
        let runner = self.runner;

        let joined: Vec<IvResult<RunOutcome>> = std::thread::scope(|scope| {
            let handles: Vec<_> = seeds
                .map(|seed| (seed, scope.spawn(move || runner.run(config, seed, objective))))
                .collect();

            handles
                .into_iter()
                .map(|(seed, handle)| match handle.join() {
                    Ok(Ok(outcome)) => Ok(outcome),
                    Ok(Err(e)) => Err(SearchError::WorkerFailed {
                        seed,
                        message: e.to_string(),
                    }
                    .into()),
                    Err(_) => Err(SearchError::WorkerPanicked { seed }.into()),
                })
                .collect()
        });

        joined.into_iter().collect()
    }
}
