//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the tunable parameters and their resolved values (`Parameter`, `ModelParameters`)
//! - the model's structural constants (`ModelSettings`)
//! - simulated, observed and predicted series (`SimulationTrajectory`, `ObservedSeries`, `Prediction`)
//! - run configuration derived from the CLI (`FitConfig`, `SimulateConfig`, `SynthConfig`)

pub mod series;
pub mod types;

pub use series::*;
pub use types::*;
