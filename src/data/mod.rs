//! Data sources for fitting: seeded synthetic samples.

pub mod synthetic;

pub use synthetic::*;
