//! Numerical helpers: first differences and Poisson deviance.

pub mod poisson;
pub mod series;

pub use poisson::*;
pub use series::*;
