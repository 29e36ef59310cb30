//! Built-in growth model implementations.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic over any `Fn(t, params) -> y`.

pub mod model;

pub use model::*;
