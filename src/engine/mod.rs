//! Simulation engine primitives.
//!
//! - Deterministic RNG (PCG with per-trial streams)
//! - Scoped wall-clock timing

pub mod rng;
pub mod timer;

pub use rng::SimRng;
pub use timer::ScopedTimer;
