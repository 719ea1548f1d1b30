//! `epi-scan` library crate.
//!
//! Fits a compartmental epidemic model to daily case and death counts by
//! exhaustive grid search. The binary (`episcan`) is a thin wrapper around
//! this library so the core logic is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod report;
