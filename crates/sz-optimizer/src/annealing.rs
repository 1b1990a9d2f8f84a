//! Simulated annealing over metric fields.
//!
//! The pieces are the classic ones: a state (value field plus derivatives and
//! its energy), a candidate generator, a Metropolis acceptance rule and a
//! cooling schedule.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sz_types::{Component, Field, FieldSet, NumericalError, OptimizerConfig};
use tracing::trace;

use crate::differentiation::differentiate_all;
use crate::energy::energy;

/// Smallest Gaussian spread (in grid indices) a neighbour may use.
pub const STDDEV_FLOOR: f64 = 1.0;

/// The Gaussian bump applied by one call to [`SimulatedAnnealing::neighbour`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    pub component: Component,
    pub centre: usize,
    pub stddev: f64,
    pub peak: f64,
}

impl Perturbation {
    /// Amount added to the chosen component at `index`.
    pub fn delta_at(&self, index: usize) -> f64 {
        let x = (index as f64 - self.centre as f64) / self.stddev;
        self.peak * (-x * x).exp()
    }
}

/// Current optimisation state: fields with up-to-date derivatives, and their
/// energy.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealState {
    pub fields: FieldSet,
    pub energy: f64,
}

impl AnnealState {
    /// Differentiate `value` and evaluate its energy.
    pub fn prime(value: Field) -> Result<Self, NumericalError> {
        let mut fields = FieldSet::from_value(value);
        differentiate_all(&mut fields)?;
        let energy = energy(&fields)?;
        Ok(Self { fields, energy })
    }
}

/// Everything decided during one [`SimulatedAnnealing::step`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub iteration: u64,
    pub energy_current: f64,
    pub energy_candidate: f64,
    pub temperature: f64,
    pub probability: f64,
    pub accepted: bool,
    pub perturbation: Perturbation,
}

/// `1` for non-worsening moves, `0` when frozen, otherwise
/// `exp(-k · (e_new - e_current) / t)`.
pub fn acceptance_probability(e_current: f64, e_new: f64, temperature: f64, k: f64) -> f64 {
    if e_new <= e_current {
        return 1.0;
    }
    if e_new.is_nan() || temperature <= 0.0 {
        return 0.0;
    }
    (-k * (e_new - e_current) / temperature).exp()
}

/// Quartic cooling: `scale · (1 - (iteration - 1)/divisor)⁴`, clamped at zero.
/// `iteration` is 1-based.
pub fn temperature(iteration: u64, scale: f64, divisor: f64) -> f64 {
    let factor = 1.0 - (iteration.saturating_sub(1) as f64) / divisor;
    if factor <= 0.0 {
        return 0.0;
    }
    scale * factor.powi(4)
}

/// The annealer: configuration plus its random stream.
///
/// The RNG lives here so that handing the annealer from one run segment to
/// the next continues the exact same random sequence.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing {
    config: OptimizerConfig,
    rng: ChaCha8Rng,
}

impl SimulatedAnnealing {
    pub fn new(config: OptimizerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Copy `current` and add one Gaussian bump to a random component.
    pub fn neighbour(&mut self, current: &Field) -> (Field, Perturbation) {
        let len = current.len();
        let component = Component::ALL[self.rng.gen_range(0..Component::ALL.len())];
        let centre = if len == 0 { 0 } else { self.rng.gen_range(0..len) };
        let max_stddev = (len as f64 / 4.0).max(STDDEV_FLOOR);
        let stddev = self.rng.gen_range(STDDEV_FLOOR..=max_stddev);
        let k = self.config.neighbour_peak_scaling_factor;
        let peak = self.rng.gen_range(-k..=k);

        let perturbation = Perturbation {
            component,
            centre,
            stddev,
            peak,
        };

        let mut candidate = current.clone();
        for i in 0..len {
            let value = candidate.component(i, component) + perturbation.delta_at(i);
            candidate.set_component(i, component, value);
        }

        (candidate, perturbation)
    }

    pub fn acceptance_probability(&self, e_current: f64, e_new: f64, temperature: f64) -> f64 {
        acceptance_probability(
            e_current,
            e_new,
            temperature,
            self.config.acceptance_probability_scaling_factor,
        )
    }

    pub fn temperature(&self, iteration: u64) -> f64 {
        temperature(
            iteration,
            self.config.temperature_scaling_factor,
            self.config.temperature_divisor,
        )
    }

    /// Draw once from `[0, 1)` and compare against `probability`.
    pub fn accept(&mut self, probability: f64) -> bool {
        self.rng.gen::<f64>() < probability
    }

    /// One propose/evaluate/decide cycle. On acceptance `state` becomes the
    /// candidate; on rejection it is left untouched.
    pub fn step(
        &mut self,
        state: &mut AnnealState,
        iteration: u64,
    ) -> Result<StepReport, NumericalError> {
        let (value, perturbation) = self.neighbour(state.fields.value());

        let mut candidate = FieldSet::from_value(value);
        differentiate_all(&mut candidate)?;
        let energy_candidate = energy(&candidate)?;

        let temperature = self.temperature(iteration);
        let probability = self.acceptance_probability(state.energy, energy_candidate, temperature);
        let accepted = self.accept(probability);

        trace!(
            iteration,
            component = %perturbation.component,
            centre = perturbation.centre,
            peak = perturbation.peak,
            energy_candidate,
            "evaluated candidate"
        );

        let report = StepReport {
            iteration,
            energy_current: state.energy,
            energy_candidate,
            temperature,
            probability,
            accepted,
            perturbation,
        };

        if accepted {
            state.fields = candidate;
            state.energy = energy_candidate;
        }

        Ok(report)
    }
}
