//! Run configuration: annealing knobs, grid geometry and controller settings.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::SzResult;
use crate::grid::GridSpec;
use crate::{config_error, validation_error};

/// Scalar tuning knobs of the simulated annealing optimiser.
///
/// Read-only once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Total number of annealing iterations across all segments.
    pub number_of_runs: u64,
    /// Bound `k` on the Gaussian bump height: peaks are drawn from `[-k, k]`.
    pub neighbour_peak_scaling_factor: f64,
    /// Multiplier on the energy increase in the Metropolis exponent.
    pub acceptance_probability_scaling_factor: f64,
    /// Temperature at iteration 1.
    pub temperature_scaling_factor: f64,
    /// Iteration span over which the temperature decays to zero.
    pub temperature_divisor: f64,
    /// Fixed RNG seed; `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl OptimizerConfig {
    /// Unit scaling factors with the temperature divisor equal to the run count.
    pub fn new(number_of_runs: u64) -> Self {
        Self {
            number_of_runs,
            neighbour_peak_scaling_factor: 1.0,
            acceptance_probability_scaling_factor: 1.0,
            temperature_scaling_factor: 1.0,
            temperature_divisor: number_of_runs as f64,
            seed: None,
        }
    }

    pub fn with_neighbour_peak(mut self, factor: f64) -> Self {
        self.neighbour_peak_scaling_factor = factor;
        self
    }

    pub fn with_acceptance_scale(mut self, factor: f64) -> Self {
        self.acceptance_probability_scaling_factor = factor;
        self
    }

    pub fn with_temperature(mut self, scale: f64, divisor: f64) -> Self {
        self.temperature_scaling_factor = scale;
        self.temperature_divisor = divisor;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> SzResult<()> {
        if self.number_of_runs == 0 {
            return Err(validation_error!(
                "number_of_runs of value {} must be greater than 0",
                self.number_of_runs
            ));
        }

        let factors = [
            (
                "neighbour_peak_scaling_factor",
                self.neighbour_peak_scaling_factor,
            ),
            (
                "acceptance_probability_scaling_factor",
                self.acceptance_probability_scaling_factor,
            ),
            ("temperature_scaling_factor", self.temperature_scaling_factor),
            ("temperature_divisor", self.temperature_divisor),
        ];
        let bad: Vec<String> = factors
            .iter()
            .filter(|(_, value)| !(*value > 0.0 && value.is_finite()))
            .map(|(name, value)| format!("{name} of value {value} must be greater than 0.0"))
            .collect();

        if !bad.is_empty() {
            return Err(validation_error!("{}", bad.join("; ")));
        }
        Ok(())
    }
}

/// Everything a supervised run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub grid: GridSpec,
    /// Supervisor wait between command-source polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Log an energy/iteration status line every this many runs; 0 disables.
    #[serde(default = "default_status_interval")]
    pub status_interval: u64,
    /// Rejected moves are logged when their acceptance probability was at
    /// least this high.
    #[serde(default = "default_rejection_report_threshold")]
    pub rejection_report_threshold: f64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_status_interval() -> u64 {
    100
}

fn default_rejection_report_threshold() -> f64 {
    0.01
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(OptimizerConfig::default())
    }
}

impl EngineConfig {
    pub fn new(optimizer: OptimizerConfig) -> Self {
        Self {
            optimizer,
            grid: GridSpec::default(),
            poll_interval_ms: default_poll_interval_ms(),
            status_interval: default_status_interval(),
            rejection_report_threshold: default_rejection_report_threshold(),
        }
    }

    pub fn with_grid(mut self, grid: GridSpec) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_poll_interval_ms(mut self, millis: u64) -> Self {
        self.poll_interval_ms = millis;
        self
    }

    pub fn with_status_interval(mut self, runs: u64) -> Self {
        self.status_interval = runs;
        self
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> SzResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| config_error!("cannot read {}: {}", path.display(), e))?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn validate(&self) -> SzResult<()> {
        self.optimizer.validate()?;
        self.grid.validate()?;
        if self.poll_interval_ms == 0 {
            return Err(validation_error!("poll_interval_ms must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.rejection_report_threshold) {
            return Err(validation_error!(
                "rejection_report_threshold of {} must lie in [0, 1]",
                self.rejection_report_threshold
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SzError;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.optimizer.number_of_runs, 1000);
        assert_eq!(config.optimizer.temperature_divisor, 1000.0);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn builder_chain() {
        let optimizer = OptimizerConfig::new(50)
            .with_neighbour_peak(0.5)
            .with_acceptance_scale(2.0)
            .with_temperature(10.0, 40.0)
            .with_seed(7);
        assert_eq!(optimizer.neighbour_peak_scaling_factor, 0.5);
        assert_eq!(optimizer.acceptance_probability_scaling_factor, 2.0);
        assert_eq!(optimizer.temperature_scaling_factor, 10.0);
        assert_eq!(optimizer.temperature_divisor, 40.0);
        assert_eq!(optimizer.seed, Some(7));
        assert!(optimizer.validate().is_ok());
    }

    #[test]
    fn zero_runs_rejected() {
        let err = OptimizerConfig::new(0).validate().unwrap_err();
        assert!(matches!(err, SzError::Validation(ref m) if m.contains("number_of_runs")));
    }

    #[test]
    fn every_non_positive_factor_is_reported() {
        let config = OptimizerConfig::new(10)
            .with_neighbour_peak(0.0)
            .with_temperature(-1.0, 10.0);
        match config.validate() {
            Err(SzError::Validation(message)) => {
                assert!(message.contains("neighbour_peak_scaling_factor"));
                assert!(message.contains("temperature_scaling_factor"));
                assert!(!message.contains("temperature_divisor"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn loads_json_with_defaults_for_missing_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "optimizer": {{
                    "number_of_runs": 25,
                    "neighbour_peak_scaling_factor": 0.1,
                    "acceptance_probability_scaling_factor": 1.0,
                    "temperature_scaling_factor": 5.0,
                    "temperature_divisor": 25.0,
                    "seed": 3
                }},
                "poll_interval_ms": 10
            }}"#
        )
        .unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.optimizer.number_of_runs, 25);
        assert_eq!(config.optimizer.seed, Some(3));
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.grid, GridSpec::default());
        assert_eq!(config.status_interval, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(file.path()),
            Err(SzError::Serialization(_))
        ));
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        match EngineConfig::from_json_file(&missing) {
            Err(SzError::Config(message)) => assert!(message.contains("absent.json")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
