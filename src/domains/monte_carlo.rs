//! Batch Monte Carlo runner for Martingale trials.
//!
//! Runs N independent gamblers, collects per-trial scalars in trial order,
//! keeps a handful of full bank histories for plotting, and counts winners.
//!
//! # Determinism
//!
//! Trial `i` always draws from stream `i` of the master seed. Parallel runs
//! compute summaries on a work-stealing pool, merge them by index, and then
//! replay the few trials whose histories are kept. The result is bitwise
//! identical to a sequential run with the same seed.

use serde::Serialize;

use super::martingale::{
    run_trial, run_trial_with, Discard, MartingaleParams, TrialSummary,
};
use crate::config::SimConfig;
use crate::engine::rng::SimRng;
use crate::engine::timer::ScopedTimer;
use crate::error::{SimError, SimResult};

/// Maximum number of winning and of losing histories kept per batch.
pub const TRAJECTORY_SAMPLES: usize = 4;

/// Seed used when none is given.
pub const DEFAULT_SEED: u64 = 42;

/// Batch size used when none is given.
pub const DEFAULT_SIMULATIONS: usize = 10;

/// Result of a Monte Carlo estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonteCarloResult {
    /// Point estimate.
    pub estimate: f64,
    /// Standard error of the estimate.
    pub std_error: f64,
    /// Number of samples used.
    pub samples: usize,
    /// 95% confidence interval (estimate ± 1.96 * `std_error`).
    pub confidence_interval: (f64, f64),
}

impl MonteCarloResult {
    /// Create a new Monte Carlo result.
    #[must_use]
    pub fn new(estimate: f64, std_error: f64, samples: usize) -> Self {
        let ci_half = 1.96 * std_error;
        Self {
            estimate,
            std_error,
            samples,
            confidence_interval: (estimate - ci_half, estimate + ci_half),
        }
    }

    /// Sample mean with its standard error.
    ///
    /// Uses the unbiased (n - 1) variance; a single sample has zero error
    /// and an empty input yields a zero estimate.
    #[must_use]
    pub fn from_samples<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut n = 0usize;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for v in values {
            n += 1;
            sum += v;
            sum_sq += v * v;
        }
        if n == 0 {
            return Self::new(0.0, 0.0, 0);
        }

        let count = n as f64;
        let mean = sum / count;
        let std_error = if n > 1 {
            let variance = ((sum_sq - count * mean * mean) / (count - 1.0)).max(0.0);
            (variance / count).sqrt()
        } else {
            0.0
        };
        Self::new(mean, std_error, n)
    }

    /// Proportion estimate for `hits` successes out of `samples`.
    #[must_use]
    pub fn proportion(hits: usize, samples: usize) -> Self {
        if samples == 0 {
            return Self::new(0.0, 0.0, 0);
        }
        let n = samples as f64;
        let p = hits as f64 / n;
        Self::new(p, (p * (1.0 - p) / n).sqrt(), samples)
    }

    /// Check if value is within confidence interval.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.confidence_interval.0 && value <= self.confidence_interval.1
    }

    /// Get relative error.
    #[must_use]
    pub fn relative_error(&self) -> f64 {
        if self.estimate.abs() < f64::EPSILON {
            self.std_error
        } else {
            self.std_error / self.estimate.abs()
        }
    }
}

/// How the trials of a batch are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ExecutionMode {
    /// One trial after another on the calling thread.
    #[default]
    Sequential,
    /// Work-stealing pool of scoped threads.
    Parallel {
        /// Number of worker threads.
        workers: usize,
    },
}

impl ExecutionMode {
    /// Parallel mode with one worker per available CPU.
    #[must_use]
    pub fn parallel() -> Self {
        Self::Parallel {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4)
}

/// Aggregated results of a batch of trials.
///
/// Per-trial vectors are in trial index order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    /// Parameters every trial used.
    pub params: MartingaleParams,
    /// Master seed of the batch.
    pub seed: u64,
    /// Spins played by each trial.
    pub steps: Vec<u64>,
    /// Peak bank of each trial.
    pub peak_banks: Vec<f64>,
    /// Peak bet of each trial.
    pub peak_bets: Vec<f64>,
    /// Bank histories of up to four winners.
    pub wbanks: Vec<Vec<f64>>,
    /// Bank histories of up to four ruined gamblers.
    pub lbanks: Vec<Vec<f64>>,
    /// Trials that reached the goal.
    pub winners: usize,
}

impl BatchResult {
    fn with_capacity(params: MartingaleParams, seed: u64, simulations: usize) -> Self {
        Self {
            params,
            seed,
            steps: Vec::with_capacity(simulations),
            peak_banks: Vec::with_capacity(simulations),
            peak_bets: Vec::with_capacity(simulations),
            wbanks: Vec::with_capacity(TRAJECTORY_SAMPLES),
            lbanks: Vec::with_capacity(TRAJECTORY_SAMPLES),
            winners: 0,
        }
    }

    /// Append one trial. `trajectory` is only called if the history is kept.
    fn push_trial<F>(&mut self, summary: &TrialSummary, trajectory: F)
    where
        F: FnOnce() -> Vec<f64>,
    {
        self.steps.push(summary.steps);
        self.peak_banks.push(summary.peak_bank);
        self.peak_bets.push(summary.peak_bet);
        if summary.won {
            self.winners += 1;
        }

        // Sampling uses the truncated bank, so a loss ending at -0.3 counts
        // as ruined and a win just under an integer goal is not sampled.
        let whole = summary.terminal_bank.trunc();
        if whole >= self.params.goal() {
            if self.wbanks.len() < TRAJECTORY_SAMPLES {
                self.wbanks.push(trajectory());
            }
        } else if whole == 0.0 && self.lbanks.len() < TRAJECTORY_SAMPLES {
            self.lbanks.push(trajectory());
        }
    }

    /// Number of trials in the batch.
    #[must_use]
    pub fn simulations(&self) -> usize {
        self.steps.len()
    }

    /// Trials that ended in ruin.
    #[must_use]
    pub fn losers(&self) -> usize {
        self.simulations() - self.winners
    }

    /// Aggregate statistics of the batch.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            simulations: self.simulations(),
            winners: self.winners,
            win_rate: MonteCarloResult::proportion(self.winners, self.simulations()),
            steps: MonteCarloResult::from_samples(self.steps.iter().map(|&s| s as f64)),
            max_steps: self.steps.iter().copied().max().unwrap_or(0),
            peak_bank: MonteCarloResult::from_samples(self.peak_banks.iter().copied()),
            peak_bet: MonteCarloResult::from_samples(self.peak_bets.iter().copied()),
            max_peak_bet: self.peak_bets.iter().copied().fold(0.0, f64::max),
        }
    }

    /// Serialize the batch as JSON for plotting tools.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string(self).map_err(|e| SimError::serialization(e.to_string()))
    }
}

/// Summary statistics of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Trials run.
    pub simulations: usize,
    /// Trials that reached the goal.
    pub winners: usize,
    /// Fraction of winners.
    pub win_rate: MonteCarloResult,
    /// Mean spins per trial.
    pub steps: MonteCarloResult,
    /// Longest trial.
    pub max_steps: u64,
    /// Mean peak bank.
    pub peak_bank: MonteCarloResult,
    /// Mean peak bet.
    pub peak_bet: MonteCarloResult,
    /// Largest bet placed in any trial.
    pub max_peak_bet: f64,
}

/// Runs batches of Martingale trials.
///
/// # Example
///
/// ```rust
/// use martingale_sim::prelude::*;
///
/// let params = MartingaleParams::new(1.0, 50.0, 100.0).unwrap();
/// let sequential = BatchRunner::new(params).with_seed(7).run(64).unwrap();
/// let parallel = BatchRunner::new(params)
///     .with_seed(7)
///     .with_mode(ExecutionMode::Parallel { workers: 4 })
///     .run(64)
///     .unwrap();
///
/// assert_eq!(sequential, parallel);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    params: MartingaleParams,
    seed: u64,
    mode: ExecutionMode,
    simulations: usize,
}

impl BatchRunner {
    /// Create a sequential runner with the default seed.
    #[must_use]
    pub const fn new(params: MartingaleParams) -> Self {
        Self {
            params,
            seed: DEFAULT_SEED,
            mode: ExecutionMode::Sequential,
            simulations: DEFAULT_SIMULATIONS,
        }
    }

    /// Build a runner from a validated configuration.
    ///
    /// The configured batch size is used by [`BatchRunner::run_configured`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` if the configured bet, bank or goal are
    /// inconsistent.
    pub fn from_config(config: &SimConfig) -> SimResult<Self> {
        Ok(Self {
            params: config.martingale.params()?,
            seed: config.reproducibility.seed,
            mode: config.execution.mode(),
            simulations: config.martingale.simulations,
        })
    }

    /// Set the master seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the execution mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the batch size used by [`BatchRunner::run_configured`].
    #[must_use]
    pub const fn with_simulations(mut self, simulations: usize) -> Self {
        self.simulations = simulations;
        self
    }

    /// Trial parameters.
    #[must_use]
    pub const fn params(&self) -> &MartingaleParams {
        &self.params
    }

    /// Master seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Configured batch size.
    #[must_use]
    pub const fn simulations(&self) -> usize {
        self.simulations
    }

    /// Run the configured number of trials.
    ///
    /// # Errors
    ///
    /// Same as [`BatchRunner::run`].
    pub fn run_configured(&self) -> SimResult<BatchResult> {
        self.run(self.simulations)
    }

    /// Run `simulations` independent trials.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` if `simulations` is zero or a parallel
    /// mode has no workers. Nothing is simulated in that case.
    pub fn run(&self, simulations: usize) -> SimResult<BatchResult> {
        if simulations == 0 {
            return Err(SimError::invalid_parameters(
                "simulations must be at least 1",
            ));
        }
        if let ExecutionMode::Parallel { workers: 0 } = self.mode {
            return Err(SimError::invalid_parameters(
                "parallel execution needs at least 1 worker",
            ));
        }

        let _timer = ScopedTimer::new("martingale batch");
        tracing::debug!(
            simulations,
            seed = self.seed,
            initial_bet = self.params.initial_bet(),
            initial_bank = self.params.initial_bank(),
            goal = self.params.goal(),
            mode = ?self.mode,
            "starting batch"
        );

        let result = match self.mode {
            ExecutionMode::Sequential => self.run_sequential(simulations),
            ExecutionMode::Parallel { workers } => self.run_parallel(simulations, workers),
        };

        tracing::info!(
            simulations,
            winners = result.winners,
            kept_wins = result.wbanks.len(),
            kept_losses = result.lbanks.len(),
            "batch complete"
        );
        Ok(result)
    }

    fn trial_rng(&self, index: usize) -> SimRng {
        SimRng::for_stream(self.seed, index as u64)
    }

    fn replay(&self, index: usize) -> Vec<f64> {
        let mut rng = self.trial_rng(index);
        tracing::trace!(
            seed = rng.master_seed(),
            stream = rng.stream(),
            "replaying kept trajectory"
        );
        run_trial(&self.params, &mut rng).trajectory
    }

    fn run_sequential(&self, simulations: usize) -> BatchResult {
        let mut batch = BatchResult::with_capacity(self.params, self.seed, simulations);
        for index in 0..simulations {
            let outcome = run_trial(&self.params, &mut self.trial_rng(index));
            batch.push_trial(&outcome.summary, || outcome.trajectory);
        }
        batch
    }

    fn run_parallel(&self, simulations: usize, workers: usize) -> BatchResult {
        let params = self.params;
        let summaries = WorkStealingMonteCarlo::with_workers(workers).execute(
            simulations,
            self.seed,
            |task| run_trial_with(&params, &mut task.rng(), &mut Discard),
        );

        let mut batch = BatchResult::with_capacity(self.params, self.seed, simulations);
        for (index, summary) in summaries.iter().enumerate() {
            batch.push_trial(summary, || self.replay(index));
        }
        batch
    }
}

/// Run a sequential batch with the given master seed.
///
/// # Errors
///
/// Returns `InvalidParameters` if `simulations < 1`, `initial_bet <= 0`,
/// `initial_bank <= 0`, `goal <= initial_bank` or any value is not finite.
pub fn run_batch(
    simulations: usize,
    initial_bet: f64,
    initial_bank: f64,
    goal: f64,
    seed: u64,
) -> SimResult<BatchResult> {
    let params = MartingaleParams::new(initial_bet, initial_bank, goal)?;
    BatchRunner::new(params).with_seed(seed).run(simulations)
}

// =============================================================================
// Work-Stealing Execution
// =============================================================================

/// One trial scheduled on the work-stealing pool.
#[derive(Debug, Clone, Copy)]
pub struct SimulationTask {
    /// Trial index within the batch.
    pub index: usize,
    /// Master seed of the batch.
    pub master_seed: u64,
}

impl SimulationTask {
    /// The generator for this trial's stream.
    #[must_use]
    pub fn rng(&self) -> SimRng {
        SimRng::for_stream(self.master_seed, self.index as u64)
    }
}

/// Work-stealing scheduler for independent trials.
///
/// Trial lengths vary by orders of magnitude, so idle workers steal queued
/// tasks instead of waiting on a fixed share.
#[derive(Debug)]
pub struct WorkStealingMonteCarlo {
    num_workers: usize,
}

impl Default for WorkStealingMonteCarlo {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkStealingMonteCarlo {
    /// Create with one worker per available CPU.
    #[must_use]
    pub fn new() -> Self {
        Self::with_workers(default_workers())
    }

    /// Create with the given number of workers (at least one).
    #[must_use]
    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
        }
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Run `simulate` for tasks `0..n_tasks`, returning results in index order.
    pub fn execute<F, R>(&self, n_tasks: usize, master_seed: u64, simulate: F) -> Vec<R>
    where
        F: Fn(SimulationTask) -> R + Sync,
        R: Send,
    {
        use crossbeam_deque::{Injector, Worker};

        let injector = Injector::new();
        for index in 0..n_tasks {
            injector.push(SimulationTask { index, master_seed });
        }

        let locals: Vec<Worker<SimulationTask>> =
            (0..self.num_workers).map(|_| Worker::new_fifo()).collect();
        let stealers: Vec<_> = locals.iter().map(Worker::stealer).collect();

        let mut indexed: Vec<(usize, R)> = std::thread::scope(|scope| {
            let handles: Vec<_> = locals
                .into_iter()
                .enumerate()
                .map(|(worker_id, local)| {
                    let injector = &injector;
                    let stealers = &stealers;
                    let simulate = &simulate;
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        while let Some(task) = next_task(&local, injector, stealers, worker_id) {
                            done.push((task.index, simulate(task)));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(done) => done,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        });

        indexed.sort_unstable_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, r)| r).collect()
    }
}

/// Local queue first, then a batch from the global queue, then a peer.
fn next_task(
    local: &crossbeam_deque::Worker<SimulationTask>,
    injector: &crossbeam_deque::Injector<SimulationTask>,
    stealers: &[crossbeam_deque::Stealer<SimulationTask>],
    worker_id: usize,
) -> Option<SimulationTask> {
    local.pop().or_else(|| {
        std::iter::repeat_with(|| {
            injector.steal_batch_and_pop(local).or_else(|| {
                (1..stealers.len())
                    .map(|offset| stealers[(worker_id + offset) % stealers.len()].steal())
                    .collect()
            })
        })
        .find(|s| !s.is_retry())
        .and_then(crossbeam_deque::Steal::success)
    })
}


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_batch_invariants(seed in 0u64..10_000, simulations in 1usize..60) {
            let result = run_batch(simulations, 1.0, 20.0, 40.0, seed).unwrap();

            prop_assert_eq!(result.simulations(), simulations);
            prop_assert!(result.winners <= simulations);
            prop_assert!(result.wbanks.len() <= TRAJECTORY_SAMPLES);
            prop_assert!(result.lbanks.len() <= TRAJECTORY_SAMPLES);
            prop_assert!(result.peak_banks.iter().all(|&b| b >= 20.0 && b <= 40.0));
        }
    }
}
