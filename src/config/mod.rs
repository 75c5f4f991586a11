//! Configuration system with YAML schema and validation.
//!
//! Implements Poka-Yoke (mistake-proofing) through:
//! - Type-safe configuration structs
//! - Schema validation via `validator`
//! - Runtime semantic validation of the betting parameters

use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::domains::martingale::MartingaleParams;
use crate::domains::monte_carlo::{ExecutionMode, DEFAULT_SEED, DEFAULT_SIMULATIONS};
use crate::error::{SimError, SimResult};

/// Top-level simulation configuration.
///
/// Loaded from YAML files with full schema validation.
///
/// ```rust
/// use martingale_sim::config::SimConfig;
///
/// let config = SimConfig::from_yaml(
///     "reproducibility:\n  seed: 7\nmartingale:\n  simulations: 25\n",
/// )
/// .unwrap();
/// assert_eq!(config.martingale.simulations, 25);
/// assert!((config.martingale.goal - 1000.0).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SimConfig {
    /// Schema version for forward compatibility.
    #[validate(length(min = 1))]
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Simulation metadata.
    #[validate(nested)]
    #[serde(default)]
    pub simulation: SimulationMeta,

    /// Reproducibility settings.
    #[validate(nested)]
    pub reproducibility: ReproducibilityConfig,

    /// Betting parameters and batch size.
    #[validate(nested)]
    #[serde(default)]
    pub martingale: MartingaleConfig,

    /// Execution strategy.
    #[validate(nested)]
    #[serde(default)]
    pub execution: ExecutionConfig,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

impl SimConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> SimResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;

        // Poka-Yoke: validate all constraints
        config.validate()?;

        // Additional semantic validation
        config.validate_semantic()?;

        Ok(config)
    }

    /// Serialize the configuration back to YAML.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_yaml(&self) -> SimResult<String> {
        serde_yaml::to_string(self).map_err(|e| SimError::serialization(e.to_string()))
    }

    /// Create a builder for configuration.
    #[must_use]
    pub fn builder() -> SimConfigBuilder {
        SimConfigBuilder::default()
    }

    /// Validate semantic constraints beyond schema.
    ///
    /// Batch size, worker count and betting parameters are checked here so
    /// they are rejected the same way as direct calls to the runner.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` when `simulations` or `workers` is zero,
    /// or the betting parameters are inconsistent.
    pub fn validate_semantic(&self) -> SimResult<()> {
        if self.martingale.simulations == 0 {
            return Err(SimError::invalid_parameters(
                "martingale.simulations must be at least 1",
            ));
        }

        if self.execution.workers == Some(0) {
            return Err(SimError::invalid_parameters(
                "execution.workers must be at least 1",
            ));
        }

        self.martingale.params()?;

        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            simulation: SimulationMeta::default(),
            reproducibility: ReproducibilityConfig::default(),
            martingale: MartingaleConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct SimConfigBuilder {
    seed: Option<u64>,
    simulations: Option<usize>,
    initial_bet: Option<f64>,
    initial_bank: Option<f64>,
    goal: Option<f64>,
    workers: Option<usize>,
}

impl SimConfigBuilder {
    /// Set the random seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the number of trials.
    #[must_use]
    pub const fn simulations(mut self, simulations: usize) -> Self {
        self.simulations = Some(simulations);
        self
    }

    /// Set the base bet.
    #[must_use]
    pub const fn initial_bet(mut self, bet: f64) -> Self {
        self.initial_bet = Some(bet);
        self
    }

    /// Set the starting bank.
    #[must_use]
    pub const fn initial_bank(mut self, bank: f64) -> Self {
        self.initial_bank = Some(bank);
        self
    }

    /// Set the target bank.
    #[must_use]
    pub const fn goal(mut self, goal: f64) -> Self {
        self.goal = Some(goal);
        self
    }

    /// Run trials in parallel on `workers` threads.
    #[must_use]
    pub const fn parallel(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`SimConfig::from_yaml`] validation.
    pub fn build(self) -> SimResult<SimConfig> {
        let mut config = SimConfig::default();

        if let Some(seed) = self.seed {
            config.reproducibility.seed = seed;
        }
        if let Some(simulations) = self.simulations {
            config.martingale.simulations = simulations;
        }
        if let Some(bet) = self.initial_bet {
            config.martingale.initial_bet = bet;
        }
        if let Some(bank) = self.initial_bank {
            config.martingale.initial_bank = bank;
        }
        if let Some(goal) = self.goal {
            config.martingale.goal = goal;
        }
        if let Some(workers) = self.workers {
            config.execution.strategy = ExecutionStrategy::Parallel;
            config.execution.workers = Some(workers);
        }

        config.validate()?;
        config.validate_semantic()?;
        Ok(config)
    }
}

/// Simulation metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SimulationMeta {
    /// Simulation name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Version.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Reproducibility settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReproducibilityConfig {
    /// Master seed; trial `i` uses stream `i` of it.
    pub seed: u64,
}

impl Default for ReproducibilityConfig {
    fn default() -> Self {
        Self { seed: DEFAULT_SEED }
    }
}

/// Betting parameters and batch size.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MartingaleConfig {
    /// Number of independent trials.
    #[serde(default = "default_simulations")]
    pub simulations: usize,
    /// Base bet.
    #[serde(default = "default_initial_bet")]
    pub initial_bet: f64,
    /// Starting bank.
    #[serde(default = "default_initial_bank")]
    pub initial_bank: f64,
    /// Target bank; must exceed the starting bank.
    #[serde(default = "default_goal")]
    pub goal: f64,
}

const fn default_simulations() -> usize {
    DEFAULT_SIMULATIONS
}

const fn default_initial_bet() -> f64 {
    0.01
}

const fn default_initial_bank() -> f64 {
    100.0
}

const fn default_goal() -> f64 {
    1000.0
}

impl Default for MartingaleConfig {
    fn default() -> Self {
        Self {
            simulations: default_simulations(),
            initial_bet: default_initial_bet(),
            initial_bank: default_initial_bank(),
            goal: default_goal(),
        }
    }
}

impl MartingaleConfig {
    /// Checked trial parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` if the values are inconsistent.
    pub fn params(&self) -> SimResult<MartingaleParams> {
        MartingaleParams::new(self.initial_bet, self.initial_bank, self.goal)
    }
}

/// Execution strategy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ExecutionConfig {
    /// Sequential or parallel.
    #[serde(default)]
    pub strategy: ExecutionStrategy,
    /// Worker threads for parallel runs; defaults to the CPU count.
    #[serde(default)]
    pub workers: Option<usize>,
}

impl ExecutionConfig {
    /// Resolve to a runner execution mode.
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        match (self.strategy, self.workers) {
            (ExecutionStrategy::Sequential, _) => ExecutionMode::Sequential,
            (ExecutionStrategy::Parallel, Some(workers)) => ExecutionMode::Parallel { workers },
            (ExecutionStrategy::Parallel, None) => ExecutionMode::parallel(),
        }
    }
}

/// Execution strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStrategy {
    /// One trial after another.
    #[default]
    Sequential,
    /// Work-stealing thread pool.
    Parallel,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = SimConfig::default();

        assert_eq!(config.schema_version, "1.0");
        assert_eq!(config.reproducibility.seed, 42);
        assert_eq!(config.martingale.simulations, 10);
        assert!((config.martingale.initial_bet - 0.01).abs() < f64::EPSILON);
        assert!((config.martingale.initial_bank - 100.0).abs() < f64::EPSILON);
        assert!((config.martingale.goal - 1000.0).abs() < f64::EPSILON);
        assert_eq!(config.execution.mode(), ExecutionMode::Sequential);
    }

    #[test]
    fn test_config_builder() {
        let config = SimConfig::builder()
            .seed(12345)
            .simulations(50)
            .initial_bet(1.0)
            .initial_bank(20.0)
            .goal(40.0)
            .build()
            .unwrap();

        assert_eq!(config.reproducibility.seed, 12345);
        assert_eq!(config.martingale.simulations, 50);
        assert!((config.martingale.goal - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_builder_parallel() {
        let config = SimConfig::builder().parallel(3).build().unwrap();
        assert_eq!(config.execution.strategy, ExecutionStrategy::Parallel);
        assert_eq!(config.execution.mode(), ExecutionMode::Parallel { workers: 3 });
    }

    #[test]
    fn test_config_builder_rejects_goal_below_bank() {
        let err = SimConfig::builder()
            .initial_bank(100.0)
            .goal(50.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameters { .. }));
    }

    #[test]
    fn test_config_yaml_parse() {
        let yaml = r"
simulation:
  name: doubling
reproducibility:
  seed: 7
martingale:
  simulations: 500
  initial_bet: 1.0
  initial_bank: 50.0
  goal: 100.0
execution:
  strategy: parallel
  workers: 2
";
        let config = SimConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.simulation.name, "doubling");
        assert_eq!(config.simulation.version, "0.1.0");
        assert_eq!(config.reproducibility.seed, 7);
        assert_eq!(config.martingale.simulations, 500);
        assert_eq!(config.execution.mode(), ExecutionMode::Parallel { workers: 2 });
    }

    #[test]
    fn test_config_parallel_without_workers() {
        let yaml = r"
reproducibility:
  seed: 1
execution:
  strategy: parallel
";
        let config = SimConfig::from_yaml(yaml).unwrap();
        assert!(matches!(
            config.execution.mode(),
            ExecutionMode::Parallel { workers } if workers >= 1
        ));
    }

    #[test]
    fn test_config_requires_seed() {
        let yaml = r"
martingale:
  simulations: 5
";
        let err = SimConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, SimError::YamlParse(_)));
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let yaml = r"
reproducibility:
  seed: 42
roulette:
  pockets: 38
";
        assert!(matches!(
            SimConfig::from_yaml(yaml),
            Err(SimError::YamlParse(_))
        ));
    }

    #[test]
    fn test_config_validation_fails_zero_simulations() {
        let yaml = r"
reproducibility:
  seed: 42
martingale:
  simulations: 0
";
        assert!(matches!(
            SimConfig::from_yaml(yaml),
            Err(SimError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_config_validation_fails_negative_bet() {
        let yaml = r"
reproducibility:
  seed: 42
martingale:
  initial_bet: -1.0
";
        assert!(matches!(
            SimConfig::from_yaml(yaml),
            Err(SimError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_config_validation_fails_zero_workers() {
        let yaml = r"
reproducibility:
  seed: 42
execution:
  strategy: parallel
  workers: 0
";
        let err = SimConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, SimError::InvalidParameters { .. }));
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_config_builder_rejects_zero_counts() {
        let zero_sims = SimConfig::builder().simulations(0).build().unwrap_err();
        assert!(matches!(zero_sims, SimError::InvalidParameters { .. }));

        let zero_workers = SimConfig::builder().parallel(0).build().unwrap_err();
        assert!(matches!(zero_workers, SimError::InvalidParameters { .. }));
    }

    #[test]
    fn test_config_validation_fails_empty_schema_version() {
        let yaml = r#"
schema_version: ""
reproducibility:
  seed: 42
"#;
        assert!(matches!(
            SimConfig::from_yaml(yaml),
            Err(SimError::Validation(_))
        ));
    }

    #[test]
    fn test_config_semantic_goal_not_above_bank() {
        let yaml = r"
reproducibility:
  seed: 42
martingale:
  initial_bank: 100.0
  goal: 100.0
";
        // Passes the schema, fails the betting rules
        assert!(matches!(
            SimConfig::from_yaml(yaml),
            Err(SimError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_config_yaml_roundtrip() {
        let config = SimConfig::builder().seed(9).parallel(4).build().unwrap();
        let yaml = config.to_yaml().unwrap();
        let parsed = SimConfig::from_yaml(&yaml).unwrap();

        assert_eq!(parsed.reproducibility.seed, 9);
        assert_eq!(parsed.execution.mode(), ExecutionMode::Parallel { workers: 4 });
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "reproducibility:\n  seed: 99\nmartingale:\n  goal: 150.0").unwrap();

        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.reproducibility.seed, 99);
        assert!((config.martingale.goal - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SimConfig::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }

    #[test]
    fn test_martingale_config_params() {
        let params = MartingaleConfig::default().params().unwrap();
        assert!((params.initial_bank() - 100.0).abs() < f64::EPSILON);
        assert!((params.goal() - 1000.0).abs() < f64::EPSILON);
    }
}
