//! Grid-search fitting.
//!
//! Responsibilities:
//!
//! - expand per-parameter ranges into a validated scan plan
//! - score each grid cell against observed data (parallel)
//! - select the best cell deterministically
//! - reduce the score tensor to 2-D projections

pub mod grid;
pub mod likelihood;
pub mod projection;
pub mod search;

pub use grid::*;
pub use likelihood::*;
pub use projection::*;
pub use search::*;
