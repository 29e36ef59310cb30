//! Input/output helpers.
//!
//! - headerless `t,y` sample files (`samples`)
//! - per-sample residual exports (`export`)
//! - curve JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod samples;

pub use curve::*;
pub use export::*;
pub use samples::*;
