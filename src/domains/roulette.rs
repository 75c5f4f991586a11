//! European roulette wheel and outcome sampling.
//!
//! The wheel has 37 pockets: 18 red, 18 black and a single zero. Both the
//! trial engine and the outcome sampler draw from it with the same uniform
//! primitive, so the sampler doubles as a check on that primitive.
//!
//! # Label encoding
//!
//! ```text
//! 0 = zero    1 = red    2 = black
//! ```

use serde::{Deserialize, Serialize};

use crate::engine::rng::SimRng;
use crate::error::{SimError, SimResult};

/// Number of pockets on a single-zero wheel.
pub const WHEEL_SIZE: usize = 37;

/// Red pockets on a single-zero wheel.
pub const RED_POCKETS: usize = 18;

/// Black pockets on a single-zero wheel.
pub const BLACK_POCKETS: usize = 18;

/// Colour category of a wheel pocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pocket {
    /// The single green zero.
    Zero,
    /// Red pocket.
    Red,
    /// Black pocket.
    Black,
}

impl Pocket {
    /// All categories, in label order.
    pub const ALL: [Self; 3] = [Self::Zero, Self::Red, Self::Black];

    /// Decode a numeric label.
    #[must_use]
    pub const fn from_label(label: u8) -> Option<Self> {
        match label {
            0 => Some(Self::Zero),
            1 => Some(Self::Red),
            2 => Some(Self::Black),
            _ => None,
        }
    }

    /// Numeric label of this category.
    #[must_use]
    pub const fn label(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::Red => 1,
            Self::Black => 2,
        }
    }
}

impl TryFrom<u8> for Pocket {
    type Error = SimError;

    fn try_from(label: u8) -> SimResult<Self> {
        Self::from_label(label).ok_or_else(|| {
            SimError::invalid_outcome_space(format!(
                "label {label} is not one of 0 (zero), 1 (red), 2 (black)"
            ))
        })
    }
}

impl std::fmt::Display for Pocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Zero => "zero",
            Self::Red => "red",
            Self::Black => "black",
        };
        f.write_str(name)
    }
}

const fn european_layout() -> [Pocket; WHEEL_SIZE] {
    let mut pockets = [Pocket::Black; WHEEL_SIZE];
    let mut i = 0;
    while i < RED_POCKETS {
        pockets[i] = Pocket::Red;
        i += 1;
    }
    pockets[WHEEL_SIZE - 1] = Pocket::Zero;
    pockets
}

static EUROPEAN_LAYOUT: [Pocket; WHEEL_SIZE] = european_layout();

/// Draw one pocket uniformly, with replacement.
fn draw(pockets: &[Pocket], rng: &mut SimRng) -> Pocket {
    pockets[rng.gen_index(pockets.len())]
}

/// The fixed single-zero European wheel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wheel;

impl Wheel {
    /// All 37 pockets.
    #[must_use]
    pub fn pockets(&self) -> &'static [Pocket] {
        &EUROPEAN_LAYOUT
    }

    /// Number of pockets of the given colour.
    #[must_use]
    pub fn count(&self, pocket: Pocket) -> usize {
        self.pockets().iter().filter(|&&p| p == pocket).count()
    }

    /// Spin the wheel once.
    pub fn spin(&self, rng: &mut SimRng) -> Pocket {
        draw(self.pockets(), rng)
    }
}

/// Validated, caller-provided outcome space.
///
/// Every entry is a known category and every category appears at least
/// once. Duplicates set the relative weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeSpace {
    pockets: Vec<Pocket>,
}

impl OutcomeSpace {
    /// The European wheel as an outcome space.
    #[must_use]
    pub fn european() -> Self {
        Self {
            pockets: Wheel.pockets().to_vec(),
        }
    }

    /// Build a space from numeric labels.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOutcomeSpace` if any label is outside {0, 1, 2}, or if
    /// the labels do not cover all three categories.
    pub fn from_labels(labels: &[u8]) -> SimResult<Self> {
        let mut unknown: Vec<u8> = labels
            .iter()
            .copied()
            .filter(|&l| Pocket::from_label(l).is_none())
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            unknown.dedup();
            return Err(SimError::invalid_outcome_space(format!(
                "labels {unknown:?} outside [0, 1, 2]"
            )));
        }

        let pockets = labels
            .iter()
            .filter_map(|&l| Pocket::from_label(l))
            .collect();
        Self::from_pockets(pockets)
    }

    /// Build a space from already-typed pockets.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOutcomeSpace` if a category is missing.
    pub fn from_pockets(pockets: Vec<Pocket>) -> SimResult<Self> {
        let missing: Vec<String> = Pocket::ALL
            .iter()
            .filter(|p| !pockets.contains(p))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(SimError::invalid_outcome_space(format!(
                "missing categories: {}",
                missing.join(", ")
            )));
        }
        Ok(Self { pockets })
    }

    /// Entries in the space.
    #[must_use]
    pub fn pockets(&self) -> &[Pocket] {
        &self.pockets
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pockets.len()
    }

    /// Always false: a valid space holds at least one entry per category.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pockets.is_empty()
    }

    /// Probability of drawing the given category.
    #[must_use]
    pub fn probability(&self, pocket: Pocket) -> f64 {
        let hits = self.pockets.iter().filter(|&&p| p == pocket).count();
        hits as f64 / self.pockets.len() as f64
    }

    /// Draw one outcome.
    pub fn spin(&self, rng: &mut SimRng) -> Pocket {
        draw(&self.pockets, rng)
    }

    /// Perform `draws` independent draws and tally them.
    pub fn sample(&self, draws: u64, rng: &mut SimRng) -> OutcomeTally {
        let mut tally = OutcomeTally::default();
        for _ in 0..draws {
            tally.record(self.spin(rng));
        }
        tally
    }
}

/// Counts of drawn outcomes by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    /// Red draws.
    pub red: u64,
    /// Black draws.
    pub black: u64,
    /// Zero draws.
    pub zero: u64,
}

impl OutcomeTally {
    /// Count one outcome.
    pub fn record(&mut self, pocket: Pocket) {
        match pocket {
            Pocket::Red => self.red += 1,
            Pocket::Black => self.black += 1,
            Pocket::Zero => self.zero += 1,
        }
    }

    /// Count for one category.
    #[must_use]
    pub const fn count(&self, pocket: Pocket) -> u64 {
        match pocket {
            Pocket::Red => self.red,
            Pocket::Black => self.black,
            Pocket::Zero => self.zero,
        }
    }

    /// Total draws tallied.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.red + self.black + self.zero
    }

    /// Observed frequency of one category, 0 for an empty tally.
    #[must_use]
    pub fn frequency(&self, pocket: Pocket) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.count(pocket) as f64 / total as f64,
        }
    }

    /// Pearson chi-square statistic against the space's expected frequencies.
    ///
    /// Two degrees of freedom; the 0.1% critical value is about 13.8.
    #[must_use]
    pub fn chi_square(&self, space: &OutcomeSpace) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        let total = self.total() as f64;
        Pocket::ALL
            .iter()
            .map(|&p| {
                let expected = total * space.probability(p);
                let diff = self.count(p) as f64 - expected;
                diff * diff / expected
            })
            .sum()
    }
}

/// Draw `draws` outcomes from a labelled outcome space and tally them.
///
/// # Errors
///
/// Returns `InvalidOutcomeSpace` if `labels` contains anything other than
/// 0 (zero), 1 (red) and 2 (black), or does not contain all three.
///
/// # Example
///
/// ```rust
/// use martingale_sim::domains::roulette::sample_outcomes;
/// use martingale_sim::engine::rng::SimRng;
///
/// let mut labels = vec![1u8; 18];
/// labels.extend([2u8; 18]);
/// labels.push(0);
///
/// let mut rng = SimRng::new(42);
/// let tally = sample_outcomes(&labels, 1000, &mut rng).unwrap();
/// assert_eq!(tally.total(), 1000);
///
/// assert!(sample_outcomes(&[0, 1, 2, 3], 10, &mut rng).is_err());
/// ```
pub fn sample_outcomes(labels: &[u8], draws: u64, rng: &mut SimRng) -> SimResult<OutcomeTally> {
    let space = OutcomeSpace::from_labels(labels)?;
    Ok(space.sample(draws, rng))
}


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_tally_total_equals_draws(seed in 0u64..u64::MAX, draws in 0u64..2_000) {
            let mut rng = SimRng::new(seed);
            let tally = OutcomeSpace::european().sample(draws, &mut rng);
            prop_assert_eq!(tally.total(), draws);
        }

        #[test]
        fn prop_unknown_label_rejected(
            mut labels in proptest::collection::vec(0u8..3, 0..40),
            bad in 3u8..=u8::MAX,
            position in 0usize..40,
        ) {
            labels.extend([0, 1, 2]);
            let at = position % (labels.len() + 1);
            labels.insert(at, bad);
            let result = OutcomeSpace::from_labels(&labels);
            let rejected = matches!(result, Err(SimError::InvalidOutcomeSpace { .. }));
            prop_assert!(rejected);
        }
    }
}
