//! Synthetic outbreak generation.
//!
//! Simulates known parameters, then draws each observed day's new confirmed
//! cases and new deaths from the configured noise model. The result has the
//! same shape as ingested data, so a fit on it should recover the inputs.

use chrono::{Days, NaiveDate};
use log::{debug, info};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Poisson;

use crate::domain::{NoiseModel, SimulationTrajectory, SynthConfig};
use crate::error::AppError;
use crate::fit::to_simulated_day;
use crate::models::EpidemicModel;

/// A generated outbreak in cumulative form, ready to be written as CSV.
#[derive(Debug, Clone)]
pub struct SyntheticOutbreak {
    pub country: String,
    pub dates: Vec<NaiveDate>,
    pub confirmed_cumulative: Vec<f64>,
    pub deaths_cumulative: Vec<f64>,
    /// The noiseless trajectory the counts were drawn from.
    pub trajectory: SimulationTrajectory,
}

impl SyntheticOutbreak {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

pub fn generate_outbreak(config: &SynthConfig) -> Result<SyntheticOutbreak, AppError> {
    if config.observed_days < 2 {
        return Err(AppError::invalid_input(format!(
            "Synthetic data needs at least 2 observed days, got {}.",
            config.observed_days
        )));
    }
    config.parameters.validate()?;

    let model = EpidemicModel::new(config.settings)?;
    let burn_in = config.parameters.burn_in;
    let increments = config.observed_days - 1;
    let switch_day = to_simulated_day(config.intervention_day, burn_in)?;
    let trajectory = model.simulate(
        &config.parameters,
        config.observed_days + burn_in,
        burn_in,
        switch_day,
    )?;
    let (confirmed, dead) = trajectory
        .observed_increments(increments)
        .ok_or_else(|| AppError::numerical("Synthetic trajectory is shorter than requested."))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let confirmed = draw_counts(&confirmed, config.noise, &mut rng)?;
    let dead = draw_counts(&dead, config.noise, &mut rng)?;

    let confirmed_cumulative = accumulate(trajectory.confirmed_cases[burn_in].round(), &confirmed);
    let deaths_cumulative = accumulate(trajectory.deaths[burn_in].round(), &dead);

    let dates = (0..config.observed_days)
        .map(|k| {
            config
                .start_date
                .checked_add_days(Days::new(k as u64))
                .ok_or_else(|| AppError::invalid_input("Synthetic date range overflows the calendar."))
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        "Generated {} synthetic days for '{}' ({:?} noise, seed {}).",
        dates.len(),
        config.country,
        config.noise,
        config.seed
    );
    debug!(
        "Final cumulative counts: confirmed={}, deaths={}.",
        confirmed_cumulative.last().copied().unwrap_or_default(),
        deaths_cumulative.last().copied().unwrap_or_default()
    );

    Ok(SyntheticOutbreak {
        country: config.country.clone(),
        dates,
        confirmed_cumulative,
        deaths_cumulative,
        trajectory,
    })
}

/// Turn expected daily counts into whole counts.
fn draw_counts(expected: &[f64], noise: NoiseModel, rng: &mut StdRng) -> Result<Vec<f64>, AppError> {
    expected
        .iter()
        .map(|&mu| {
            if !mu.is_finite() || mu < 0.0 {
                return Err(AppError::numerical(format!("Invalid expected count {mu}.")));
            }
            match noise {
                NoiseModel::None => Ok(mu.round()),
                NoiseModel::Poisson if mu == 0.0 => Ok(0.0),
                NoiseModel::Poisson => {
                    let dist = Poisson::new(mu)
                        .map_err(|e| AppError::numerical(format!("Noise distribution error: {e}")))?;
                    Ok(dist.sample(rng))
                }
            }
        })
        .collect()
}

fn accumulate(start: f64, increments: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(increments.len() + 1);
    let mut total = start;
    out.push(total);
    for inc in increments {
        total += inc;
        out.push(total);
    }
    out
}
