//! ODE simulation: a fixed-step RK4 integrator plus the built-in systems.

pub mod calcium;
pub mod integrator;

pub use calcium::{CalciumParams, calcium_derivative};
pub use integrator::*;
