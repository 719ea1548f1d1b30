//! Parameter and configuration types.
//!
//! These are plain data: the model, the evaluator and the search engine all
//! receive them by reference and never keep state between calls.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Tolerance used when interpreting a grid value as a whole number of days.
const INTEGER_TOL: f64 = 1e-9;

/// Longest burn-in accepted, in days.
pub const MAX_BURN_IN_DAYS: usize = 1_000;

/// Longest simulation horizon accepted, in days.
pub const MAX_SIMULATION_DAYS: usize = 100_000;

/// One of the four tunable model parameters.
///
/// The declaration order is also the canonical display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
pub enum Parameter {
    /// Probability that an infection ends as a recorded death.
    #[serde(rename = "lethality")]
    #[value(name = "lethality")]
    Lethality,
    /// Simulated days before the first observed day.
    #[serde(rename = "burn-in")]
    #[value(name = "burn-in")]
    BurnIn,
    /// Reproduction number before the intervention.
    #[serde(rename = "R0-0")]
    #[value(name = "R0-0")]
    R0Before,
    /// Reproduction number from the intervention day on.
    #[serde(rename = "R0-1")]
    #[value(name = "R0-1")]
    R0After,
}

impl Parameter {
    pub const ALL: [Parameter; 4] = [
        Parameter::Lethality,
        Parameter::BurnIn,
        Parameter::R0Before,
        Parameter::R0After,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Parameter::Lethality => "lethality",
            Parameter::BurnIn => "burn-in",
            Parameter::R0Before => "R0-0",
            Parameter::R0After => "R0-1",
        }
    }

    /// Decimal places used when printing values of this parameter.
    pub fn display_digits(self) -> usize {
        match self {
            Parameter::Lethality => 3,
            Parameter::BurnIn => 0,
            Parameter::R0Before | Parameter::R0After => 1,
        }
    }

    /// Default scan range for this parameter.
    pub fn default_range(self) -> GridRange {
        match self {
            Parameter::Lethality => GridRange::new(0.005, 0.055, 0.005),
            Parameter::BurnIn => GridRange::new(2.0, 11.0, 1.0),
            Parameter::R0Before => GridRange::new(2.0, 3.1, 0.1),
            Parameter::R0After => GridRange::new(1.0, 2.7, 0.2),
        }
    }

    pub fn format_value(self, value: f64) -> String {
        format!("{:.*}", self.display_digits(), value)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Parameter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .into_iter()
            .find(|p| p.name() == s.trim())
            .ok_or_else(|| {
                AppError::invalid_input(format!(
                    "Unknown parameter '{s}' (expected one of: lethality, burn-in, R0-0, R0-1)."
                ))
            })
    }
}

/// Resolved values for all four tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub lethality: f64,
    pub burn_in: usize,
    pub r0_before: f64,
    pub r0_after: f64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            lethality: 0.01,
            burn_in: 5,
            r0_before: 2.5,
            r0_after: 1.0,
        }
    }
}

impl ModelParameters {
    /// Return a copy with one parameter replaced.
    pub fn with_value(mut self, parameter: Parameter, value: f64) -> Result<Self, AppError> {
        match parameter {
            Parameter::Lethality => self.lethality = value,
            Parameter::BurnIn => self.burn_in = burn_in_days(value)?,
            Parameter::R0Before => self.r0_before = value,
            Parameter::R0After => self.r0_after = value,
        }
        Ok(self)
    }

    pub fn value(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Lethality => self.lethality,
            Parameter::BurnIn => self.burn_in as f64,
            Parameter::R0Before => self.r0_before,
            Parameter::R0After => self.r0_after,
        }
    }

    /// Reject values outside the model's domain before anything is simulated.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.lethality.is_finite() && self.lethality > 0.0 && self.lethality < 1.0) {
            return Err(AppError::invalid_input(format!(
                "lethality must lie in (0, 1), got {}.",
                self.lethality
            )));
        }
        for (name, r0) in [("R0-0", self.r0_before), ("R0-1", self.r0_after)] {
            if !(r0.is_finite() && r0 > 0.0) {
                return Err(AppError::invalid_input(format!(
                    "{name} must be finite and > 0, got {r0}."
                )));
            }
        }
        if self.burn_in > MAX_BURN_IN_DAYS {
            return Err(AppError::invalid_input(format!(
                "burn-in must not exceed {MAX_BURN_IN_DAYS} days, got {}.",
                self.burn_in
            )));
        }
        Ok(())
    }

    /// Reproduction number in effect on simulated day `day`.
    pub fn reproduction_number(&self, day: usize, switch_day: Option<usize>) -> f64 {
        match switch_day {
            Some(d) if day >= d => self.r0_after,
            _ => self.r0_before,
        }
    }
}

fn burn_in_days(value: f64) -> Result<usize, AppError> {
    let rounded = value.round();
    if !value.is_finite() || value < 0.0 || (value - rounded).abs() > INTEGER_TOL {
        return Err(AppError::invalid_input(format!(
            "burn-in must be a non-negative whole number of days, got {value}."
        )));
    }
    if rounded > MAX_BURN_IN_DAYS as f64 {
        return Err(AppError::invalid_input(format!(
            "burn-in must not exceed {MAX_BURN_IN_DAYS} days, got {value}."
        )));
    }
    Ok(rounded as usize)
}

/// Structural constants of the compartmental model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub population: f64,
    /// Infections present on simulated day 0.
    pub seed_infections: f64,
    pub infectious_period_days: f64,
    /// Fraction of infections that eventually show up as confirmed cases.
    pub detection_rate: f64,
    /// Mean delay from infection to confirmation.
    pub confirmation_delay_days: f64,
    /// Mean delay from infection to death.
    pub death_delay_days: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            population: 83_000_000.0,
            seed_infections: 10.0,
            infectious_period_days: 5.0,
            detection_rate: 0.25,
            confirmation_delay_days: 4.0,
            death_delay_days: 14.0,
        }
    }
}

impl ModelSettings {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.population.is_finite() && self.population > 0.0) {
            return Err(AppError::invalid_input("population must be finite and > 0."));
        }
        if !(self.seed_infections.is_finite()
            && self.seed_infections > 0.0
            && self.seed_infections <= self.population)
        {
            return Err(AppError::invalid_input(
                "seed infections must be > 0 and not exceed the population.",
            ));
        }
        if !(self.detection_rate.is_finite()
            && self.detection_rate > 0.0
            && self.detection_rate <= 1.0)
        {
            return Err(AppError::invalid_input("detection rate must lie in (0, 1]."));
        }
        // Daily outflow fractions are 1/delay; anything below one day would
        // drain a compartment below zero in a single step.
        for (name, days) in [
            ("infectious period", self.infectious_period_days),
            ("confirmation delay", self.confirmation_delay_days),
            ("death delay", self.death_delay_days),
        ] {
            if !(days.is_finite() && days >= 1.0) {
                return Err(AppError::invalid_input(format!(
                    "{name} must be at least one day, got {days}."
                )));
            }
        }
        Ok(())
    }
}

/// An ordered set of named parameter values.
///
/// Entry order matches the scan order the vector was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    entries: Vec<(Parameter, f64)>,
}

impl ParameterVector {
    pub fn new(parameters: &[Parameter], values: &[f64]) -> Result<Self, AppError> {
        if parameters.len() != values.len() {
            return Err(AppError::invalid_input(format!(
                "Parameter vector has {} names but {} values.",
                parameters.len(),
                values.len()
            )));
        }
        for (i, p) in parameters.iter().enumerate() {
            if parameters[..i].contains(p) {
                return Err(AppError::invalid_input(format!("Parameter '{p}' listed twice.")));
            }
        }
        Ok(Self {
            entries: parameters.iter().copied().zip(values.iter().copied()).collect(),
        })
    }

    pub fn entries(&self) -> &[(Parameter, f64)] {
        &self.entries
    }

    pub fn get(&self, parameter: Parameter) -> Option<f64> {
        self.entries
            .iter()
            .find(|(p, _)| *p == parameter)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay these values on `base`; parameters not present keep their base value.
    pub fn apply_to(&self, base: &ModelParameters) -> Result<ModelParameters, AppError> {
        resolve_parameters(
            base,
            self.entries.iter().map(|(p, _)| *p),
            self.entries.iter().map(|(_, v)| *v),
        )
    }
}

/// Overlay `values` (in `parameters` order) on `base` and validate the result.
pub fn resolve_parameters(
    base: &ModelParameters,
    parameters: impl IntoIterator<Item = Parameter>,
    values: impl IntoIterator<Item = f64>,
) -> Result<ModelParameters, AppError> {
    let mut out = *base;
    for (p, v) in parameters.into_iter().zip(values) {
        out = out.with_value(p, v)?;
    }
    out.validate()?;
    Ok(out)
}

/// Half-open `start:stop:step` range of candidate values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridRange {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl GridRange {
    pub const fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    pub fn values(&self) -> Result<Vec<f64>, AppError> {
        crate::fit::grid::arange(self.start, self.stop, self.step)
    }
}

impl fmt::Display for GridRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.stop, self.step)
    }
}

impl FromStr for GridRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let [start, stop, step] = parts.as_slice() else {
            return Err(format!("expected start:stop:step, got '{s}'"));
        };
        let parse = |field: &str| {
            field
                .parse::<f64>()
                .map_err(|e| format!("invalid number '{field}' in range '{s}': {e}"))
        };
        Ok(GridRange::new(parse(*start)?, parse(*stop)?, parse(*step)?))
    }
}

/// How grid cells are evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Parallel,
    Sequential,
}

/// Noise applied to synthetic daily counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NoiseModel {
    /// Round expected counts to the nearest integer.
    None,
    /// Draw each day's count from a Poisson distribution.
    #[default]
    Poisson,
}

/// Where the observed series comes from and how it is trimmed.
#[derive(Debug, Clone)]
pub struct DataSource {
    pub csv_path: PathBuf,
    pub country: String,
    /// Leading rows dropped before the fit window starts.
    pub skip_days: usize,
    /// Subtracted from every cumulative confirmed value (imported early cases).
    pub confirmed_offset: f64,
}

/// A full `fit` run's configuration as understood by the pipeline.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub data: DataSource,
    pub scan_parameters: Vec<Parameter>,
    pub value_grids: BTreeMap<Parameter, GridRange>,
    /// Values for parameters that are not scanned.
    pub base: ModelParameters,
    pub settings: ModelSettings,
    /// Counted from the first observed day.
    pub intervention_day: Option<i64>,
    pub prediction_days: usize,
    pub execution: ExecutionMode,
    pub export_report: Option<PathBuf>,
}

/// Configuration for a single forward simulation.
#[derive(Debug, Clone)]
pub struct SimulateConfig {
    pub parameters: ModelParameters,
    pub settings: ModelSettings,
    pub days: usize,
    /// Simulated-day index.
    pub intervention_day: Option<i64>,
}

/// Configuration for synthetic data generation.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub parameters: ModelParameters,
    pub settings: ModelSettings,
    pub observed_days: usize,
    /// Counted from the first observed day.
    pub intervention_day: Option<i64>,
    pub noise: NoiseModel,
    pub seed: u64,
    pub country: String,
    pub start_date: NaiveDate,
    pub output: PathBuf,
}
