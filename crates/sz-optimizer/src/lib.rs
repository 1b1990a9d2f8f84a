//! # sz-optimizer
//!
//! The numerical core of the Schwarzschild annealer: finite differences on a
//! non-uniform radial grid, closed-form Ricci components, the energy
//! objective, and the simulated annealing step.

mod annealing;
mod differentiation;
mod energy;
mod ricci;

pub use annealing::{
    acceptance_probability, temperature, AnnealState, Perturbation, SimulatedAnnealing,
    StepReport, STDDEV_FLOOR,
};
pub use differentiation::{differentiate, differentiate_all, Order, MIN_STENCIL_POINTS};
pub use energy::{energy, ricci_profile};
pub use ricci::{ricci_components, ricci_jacobian, RicciComponents};
