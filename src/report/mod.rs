//! Reporting: fit summary, parameter profiles, prediction tables.

pub mod format;

pub use format::*;
