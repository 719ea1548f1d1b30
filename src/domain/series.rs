//! Time series exchanged between the model, the evaluator and the data layer.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::first_differences;

/// Daily cumulative trajectories produced by one simulation.
///
/// Index 0 is the first simulated day (the start of the burn-in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationTrajectory {
    pub total_cases: Vec<f64>,
    pub confirmed_cases: Vec<f64>,
    pub deaths: Vec<f64>,
    /// Simulated days preceding the first observed day.
    pub burn_in: usize,
}

impl SimulationTrajectory {
    pub fn days(&self) -> usize {
        self.total_cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_cases.is_empty()
    }

    /// The same trajectory with the burn-in days cut off, re-indexed so that
    /// day 0 is the first observed day.
    pub fn after_burn_in(&self) -> SimulationTrajectory {
        let from = self.burn_in.min(self.days());
        SimulationTrajectory {
            total_cases: self.total_cases[from..].to_vec(),
            confirmed_cases: self.confirmed_cases[from..].to_vec(),
            deaths: self.deaths[from..].to_vec(),
            burn_in: 0,
        }
    }

    pub fn daily_confirmed(&self) -> Vec<f64> {
        first_differences(&self.confirmed_cases)
    }

    pub fn daily_deaths(&self) -> Vec<f64> {
        first_differences(&self.deaths)
    }

    /// New confirmed cases and new deaths for the first `n_days` observed days.
    ///
    /// Element `k` is the increment from simulated day `burn_in + k` to
    /// `burn_in + k + 1`. Returns `None` when the trajectory is too short.
    pub fn observed_increments(&self, n_days: usize) -> Option<(Vec<f64>, Vec<f64>)> {
        let end = self.burn_in + n_days;
        if end >= self.days() {
            return None;
        }
        let window = |series: &[f64]| first_differences(&series[self.burn_in..=end]);
        Some((window(&self.confirmed_cases), window(&self.deaths)))
    }
}

/// Observed daily increments (new confirmed cases and new deaths per day).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedSeries {
    confirmed_day_data: Vec<u64>,
    dead_day_data: Vec<u64>,
}

impl ObservedSeries {
    pub fn new(confirmed_day_data: Vec<u64>, dead_day_data: Vec<u64>) -> Result<Self, AppError> {
        if confirmed_day_data.len() != dead_day_data.len() {
            return Err(AppError::invalid_input(format!(
                "Observed series differ in length: {} confirmed vs {} dead.",
                confirmed_day_data.len(),
                dead_day_data.len()
            )));
        }
        if confirmed_day_data.is_empty() {
            return Err(AppError::invalid_input("Observed series are empty."));
        }
        Ok(Self {
            confirmed_day_data,
            dead_day_data,
        })
    }

    /// Build daily increments from cumulative counts.
    ///
    /// Cumulative public-health data is occasionally revised downwards, which
    /// shows up as a negative daily difference. Such days are set to 0; the
    /// second element of the result counts how many were clamped.
    pub fn from_cumulative(confirmed: &[f64], dead: &[f64]) -> Result<(Self, usize), AppError> {
        if confirmed.len() != dead.len() {
            return Err(AppError::data(format!(
                "Cumulative series differ in length: {} confirmed vs {} dead.",
                confirmed.len(),
                dead.len()
            )));
        }
        if confirmed.len() < 2 {
            return Err(AppError::data(
                "At least two cumulative observations are needed to form daily counts.",
            ));
        }
        if let Some(v) = confirmed.iter().chain(dead).find(|v| !v.is_finite()) {
            return Err(AppError::data(format!("Non-finite cumulative count: {v}.")));
        }

        let mut clamped = 0usize;
        let mut to_counts = |series: &[f64]| -> Vec<u64> {
            first_differences(series)
                .into_iter()
                .map(|d| {
                    if d < 0.0 {
                        clamped += 1;
                        0
                    } else {
                        d.round() as u64
                    }
                })
                .collect()
        };
        let confirmed_day_data = to_counts(confirmed);
        let dead_day_data = to_counts(dead);

        Ok((Self::new(confirmed_day_data, dead_day_data)?, clamped))
    }

    pub fn len(&self) -> usize {
        self.confirmed_day_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed_day_data.is_empty()
    }

    pub fn confirmed_day_data(&self) -> &[u64] {
        &self.confirmed_day_data
    }

    pub fn dead_day_data(&self) -> &[u64] {
        &self.dead_day_data
    }
}

/// Best-fit trajectory carried past the end of the observations.
///
/// `trajectory` starts at the first observed day (burn-in already removed),
/// so index `k` falls on `start_date + k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub start_date: NaiveDate,
    /// Number of trajectory days covered by observations.
    pub observed_days: usize,
    pub trajectory: SimulationTrajectory,
}

impl Prediction {
    pub fn date(&self, day: usize) -> Option<NaiveDate> {
        self.start_date.checked_add_days(Days::new(day as u64))
    }

    /// Days past the last observation.
    pub fn forecast_days(&self) -> usize {
        self.trajectory.days().saturating_sub(self.observed_days)
    }
}
