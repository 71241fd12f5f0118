//! # iv-optimizer
//!
//! Inverse search for InvML: given fitted predictors, find feature vectors
//! whose predicted output matches a target value.
//!
//! A seeded particle swarm ([`ParticleSwarm`]) minimizes the distance to the
//! target, the [`RoundCoordinator`] fans runs out in synchronized rounds to
//! collect a ranked pool of candidates, and [`MultiModelSearch`] repeats that
//! for every predictor variant and picks the global best.

mod coordinator;
mod multi_model;
mod objective;
mod pso;

pub use coordinator::{RoundCoordinator, SearchReport};
pub use multi_model::{MultiModelReport, MultiModelSearch};
pub use objective::{FnObjective, Objective, SurrogateObjective};
pub use pso::{ParticleSwarm, RunOutcome, StopReason, SwarmRunner};
