//! Epidemic forward model.
//!
//! The model is a pure function of its inputs so that fitting/search code can
//! call it from many threads at once.

pub mod model;

pub use model::*;
