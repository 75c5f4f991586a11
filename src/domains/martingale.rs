//! Single-gambler Martingale trial.
//!
//! # Betting policy
//!
//! ```text
//! stake      = bet            (reset to base bet if bet > bank)
//! on red:      bank += 2 * stake, bet = base bet
//! otherwise:   bet = 2 * stake
//! stop when    bank <= 0  or  bank >= goal
//! ```
//!
//! The player always backs red. Any fixed colour has the same 18/37 chance,
//! so the choice is a constant rather than a parameter.
//!
//! Because the base bet is restored whenever the doubled bet exceeds the
//! bank, a bank smaller than the base bet can still be staked in full. The
//! final bank of a ruined gambler can therefore be slightly negative, never
//! below `-initial_bet`.

use serde::Serialize;

use super::roulette::{Pocket, Wheel};
use crate::engine::rng::SimRng;
use crate::error::{SimError, SimResult};

/// Colour the gambler backs on every spin.
pub const PLAYER_CHOICE: Pocket = Pocket::Red;

/// Validated parameters shared by every trial of a batch.
///
/// Constructing one through [`MartingaleParams::new`] guarantees that a trial
/// terminates: the base bet is positive and the goal lies above the bank.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MartingaleParams {
    initial_bet: f64,
    initial_bank: f64,
    goal: f64,
}

impl MartingaleParams {
    /// Validate and bundle trial parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` unless all values are finite,
    /// `initial_bet > 0`, `initial_bank > 0` and `goal > initial_bank`.
    pub fn new(initial_bet: f64, initial_bank: f64, goal: f64) -> SimResult<Self> {
        for (name, value) in [
            ("initial_bet", initial_bet),
            ("initial_bank", initial_bank),
            ("goal", goal),
        ] {
            if !value.is_finite() {
                return Err(SimError::invalid_parameters(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if initial_bet <= 0.0 {
            return Err(SimError::invalid_parameters(format!(
                "initial_bet must be positive, got {initial_bet}"
            )));
        }
        if initial_bank <= 0.0 {
            return Err(SimError::invalid_parameters(format!(
                "initial_bank must be positive, got {initial_bank}"
            )));
        }
        if goal <= initial_bank {
            return Err(SimError::invalid_parameters(format!(
                "goal {goal} must exceed initial_bank {initial_bank}"
            )));
        }

        Ok(Self {
            initial_bet,
            initial_bank,
            goal,
        })
    }

    /// Base bet, restored after every win.
    #[must_use]
    pub const fn initial_bet(&self) -> f64 {
        self.initial_bet
    }

    /// Starting bank.
    #[must_use]
    pub const fn initial_bank(&self) -> f64 {
        self.initial_bank
    }

    /// Target bank at which the gambler stops as a winner.
    #[must_use]
    pub const fn goal(&self) -> f64 {
        self.goal
    }
}

/// Sink for the bank value recorded after each spin.
pub trait BankRecorder {
    /// Record the bank after one step.
    fn record(&mut self, bank: f64);
}

impl BankRecorder for Vec<f64> {
    fn record(&mut self, bank: f64) {
        self.push(bank);
    }
}

/// Recorder that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl BankRecorder for Discard {
    fn record(&mut self, _bank: f64) {}
}

/// Scalar results of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialSummary {
    /// Spins played.
    pub steps: u64,
    /// Highest bank seen, clamped to the goal on a win.
    pub peak_bank: f64,
    /// Largest stake placed.
    pub peak_bet: f64,
    /// Bank when play stopped.
    pub terminal_bank: f64,
    /// Whether the goal was reached.
    pub won: bool,
}

/// Full result of one trial, including its bank history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialOutcome {
    /// Scalar results.
    pub summary: TrialSummary,
    /// Bank after each spin.
    pub trajectory: Vec<f64>,
}

/// Mutable state of one gambler while a trial is in progress.
#[derive(Debug, Clone)]
struct TrialState {
    bank: f64,
    bet: f64,
    peak_bank: f64,
    peak_bet: f64,
    steps: u64,
    won: bool,
}

impl TrialState {
    const fn new(params: &MartingaleParams) -> Self {
        Self {
            bank: params.initial_bank,
            bet: params.initial_bet,
            peak_bank: 0.0,
            peak_bet: 0.0,
            steps: 0,
            won: false,
        }
    }

    fn in_play(&self, goal: f64) -> bool {
        self.bank > 0.0 && self.bank < goal
    }

    fn step<R: BankRecorder>(
        &mut self,
        params: &MartingaleParams,
        rng: &mut SimRng,
        recorder: &mut R,
    ) {
        if self.bank > self.peak_bank {
            self.peak_bank = self.bank;
        }
        if self.bet > self.bank {
            self.bet = params.initial_bet;
        }
        if self.bet > self.peak_bet {
            self.peak_bet = self.bet;
        }

        self.bank -= self.bet;

        if Wheel.spin(rng) == PLAYER_CHOICE {
            self.bank += self.bet * 2.0;
            self.bet = params.initial_bet;
            if self.bank >= params.goal {
                self.peak_bank = params.goal;
                self.won = true;
            }
        } else {
            self.bet *= 2.0;
        }

        self.steps += 1;
        recorder.record(self.bank);
    }

    const fn finish(&self) -> TrialSummary {
        TrialSummary {
            steps: self.steps,
            peak_bank: self.peak_bank,
            peak_bet: self.peak_bet,
            terminal_bank: self.bank,
            won: self.won,
        }
    }
}

/// Play one trial, sending each post-spin bank to `recorder`.
pub fn run_trial_with<R: BankRecorder>(
    params: &MartingaleParams,
    rng: &mut SimRng,
    recorder: &mut R,
) -> TrialSummary {
    let mut state = TrialState::new(params);
    while state.in_play(params.goal) {
        state.step(params, rng, recorder);
    }
    state.finish()
}

/// Play one trial and keep its full bank history.
///
/// # Example
///
/// ```rust
/// use martingale_sim::domains::martingale::{run_trial, MartingaleParams};
/// use martingale_sim::engine::rng::SimRng;
///
/// let params = MartingaleParams::new(1.0, 10.0, 20.0).unwrap();
/// let outcome = run_trial(&params, &mut SimRng::new(42));
///
/// assert_eq!(outcome.trajectory.len() as u64, outcome.summary.steps);
/// assert!(outcome.summary.peak_bank >= 10.0);
/// ```
pub fn run_trial(params: &MartingaleParams, rng: &mut SimRng) -> TrialOutcome {
    let mut trajectory = Vec::new();
    let summary = run_trial_with(params, rng, &mut trajectory);
    TrialOutcome {
        summary,
        trajectory,
    }
}
