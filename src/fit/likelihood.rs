//! Goodness-of-fit score for one parameter combination.
//!
//! Given candidate values for the scanned parameters:
//! - resolve a full `ModelParameters` (unscanned parameters keep their base value)
//! - simulate exactly enough days to produce one increment per observed day
//! - compare predicted and observed daily increments with the Poisson deviance
//!
//! The score is the deviance summed over both series (lower is better).

use crate::domain::{ModelParameters, ObservedSeries, Parameter, resolve_parameters};
use crate::error::AppError;
use crate::math::total_deviance;
use crate::models::EpidemicModel;

/// Scores candidate parameter values against observed data.
///
/// Holds only borrowed, immutable configuration; every call is independent.
#[derive(Debug, Clone, Copy)]
pub struct LikelihoodEvaluator<'a> {
    model: &'a EpidemicModel,
    parameters: &'a [Parameter],
    base: ModelParameters,
}

impl<'a> LikelihoodEvaluator<'a> {
    /// `parameters` fixes the meaning (and order) of the values passed to `score`.
    pub fn new(model: &'a EpidemicModel, parameters: &'a [Parameter], base: ModelParameters) -> Self {
        Self {
            model,
            parameters,
            base,
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        self.parameters
    }

    /// Resolve `values` (in scan order) into a full parameter set.
    pub fn resolve(&self, values: &[f64]) -> Result<ModelParameters, AppError> {
        if values.len() != self.parameters.len() {
            return Err(AppError::invalid_input(format!(
                "Expected {} parameter values, got {}.",
                self.parameters.len(),
                values.len()
            )));
        }
        resolve_parameters(&self.base, self.parameters.iter().copied(), values.iter().copied())
    }

    /// Score one combination.
    ///
    /// `intervention_day` counts from the first observed day; it is shifted by
    /// the burn-in before simulating so the intervention stays on the same
    /// calendar day whatever burn-in is tried.
    pub fn score(
        &self,
        values: &[f64],
        observed: &ObservedSeries,
        intervention_day: Option<i64>,
    ) -> Result<f64, AppError> {
        let params = self.resolve(values)?;
        let n_burn_in = params.burn_in;
        let n_obs = observed.len();
        let days_sim = n_obs
            .checked_add(n_burn_in)
            .and_then(|d| d.checked_add(1))
            .ok_or_else(|| {
                AppError::invalid_input(format!(
                    "{n_obs} observed days plus a burn-in of {n_burn_in} overflow the horizon."
                ))
            })?;

        let switch_day = to_simulated_day(intervention_day, n_burn_in)?;
        let trajectory = self.model.simulate(&params, days_sim, n_burn_in, switch_day)?;

        let (confirmed, dead) = trajectory.observed_increments(n_obs).ok_or_else(|| {
            AppError::numerical(format!(
                "Trajectory of {} days is too short for {n_obs} observed days.",
                trajectory.days()
            ))
        })?;

        let score = total_deviance(observed.confirmed_day_data(), &confirmed)
            + total_deviance(observed.dead_day_data(), &dead);

        if !score.is_finite() {
            return Err(AppError::numerical(format!(
                "Non-finite score {score} for {params:?}."
            )));
        }
        Ok(score)
    }
}

/// Convert an observed-day index into a simulated-day index.
pub fn to_simulated_day(
    intervention_day: Option<i64>,
    n_burn_in: usize,
) -> Result<Option<i64>, AppError> {
    match intervention_day {
        Some(d) if d < 0 => Err(AppError::invalid_input(format!(
            "Intervention day must be >= 0, got {d}."
        ))),
        Some(d) => Ok(Some(d.saturating_add(n_burn_in as i64))),
        None => Ok(None),
    }
}
