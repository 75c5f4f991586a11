//! Simulation domains.
//!
//! - Roulette: European wheel and outcome sampling
//! - Martingale: single-gambler trial engine
//! - Monte Carlo: batch runner and statistics

pub mod martingale;
pub mod monte_carlo;
pub mod roulette;

pub use martingale::{run_trial, MartingaleParams, TrialOutcome, TrialSummary};
pub use monte_carlo::{
    run_batch, BatchResult, BatchRunner, BatchSummary, ExecutionMode, MonteCarloResult,
};
pub use roulette::{sample_outcomes, OutcomeSpace, OutcomeTally, Pocket, Wheel};
