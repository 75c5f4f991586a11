//! # martingale-sim
//!
//! Reproducible Monte Carlo simulation of the Martingale betting strategy
//! on a single-zero European roulette wheel.
//!
//! A batch of independent gamblers each start with the same bank and base
//! bet, double the stake after every loss, fall back to the base bet after
//! every win, and play until they either reach their goal or go broke.
//!
//! - Every trial draws from its own PCG stream derived from a master seed
//! - Sequential and work-stealing parallel runs are bitwise identical
//! - Parameters are checked up front; nothing panics on caller input
//!
//! ## Example
//!
//! ```rust
//! use martingale_sim::prelude::*;
//!
//! let result = run_batch(100, 1.0, 100.0, 200.0, 42).unwrap();
//! assert_eq!(result.steps.len(), 100);
//! assert!(result.winners <= 100);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suspicious_operation_groupings,  // False positive for variance = E[X²] - E[X]²
    clippy::missing_const_for_fn,
)]

pub mod config;
pub mod domains;
pub mod engine;
pub mod error;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{SimConfig, SimConfigBuilder};
    pub use crate::domains::martingale::{run_trial, MartingaleParams, TrialOutcome};
    pub use crate::domains::monte_carlo::{
        run_batch, BatchResult, BatchRunner, BatchSummary, ExecutionMode, MonteCarloResult,
    };
    pub use crate::domains::roulette::{sample_outcomes, OutcomeSpace, OutcomeTally, Pocket, Wheel};
    pub use crate::engine::rng::SimRng;
    pub use crate::engine::timer::ScopedTimer;
    pub use crate::error::{SimError, SimResult};
}

/// Re-export for public API
pub use error::{SimError, SimResult};
