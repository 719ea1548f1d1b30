//! Discrete-time compartmental epidemic model.
//!
//! Infection dynamics are SIR-like with one update per simulated day:
//!
//! - `new_inf = min(S, R_t / T_inf · S · I / N)`
//! - `I` loses `I / T_inf` per day to the removed compartment
//!
//! Reporting is modelled with two pending pools fed by new infections:
//!
//! - `Pc` receives `detection · new_inf` and releases `Pc / T_conf` confirmed cases per day
//! - `Pd` receives `lethality · new_inf` and releases `Pd / T_death` deaths per day
//!
//! Both pools are first-order (geometric) delays, so every infection is
//! eventually confirmed with probability `detection` and dies with probability
//! `lethality`. Cumulative confirmed cases equal `detection · total - Pc`,
//! which keeps `confirmed ≤ total` on every day.
//!
//! All quantities stay real-valued; nothing is rounded during propagation.

use crate::domain::{MAX_SIMULATION_DAYS, ModelParameters, ModelSettings, SimulationTrajectory};
use crate::error::AppError;

/// The forward model. Holds only immutable structural settings.
#[derive(Debug, Clone)]
pub struct EpidemicModel {
    settings: ModelSettings,
}

impl EpidemicModel {
    pub fn new(settings: ModelSettings) -> Result<Self, AppError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Simulate `days_sim` days starting from the seed infections on day 0.
    ///
    /// `intervention_day` is a simulated-day index: the step leaving day `d`
    /// and every later step use `R0-1`. `None`, or any day at or beyond the
    /// horizon, keeps `R0-0` throughout.
    ///
    /// `n_burn_in` does not change the dynamics; it only marks which day is
    /// aligned with the first observation.
    pub fn simulate(
        &self,
        params: &ModelParameters,
        days_sim: usize,
        n_burn_in: usize,
        intervention_day: Option<i64>,
    ) -> Result<SimulationTrajectory, AppError> {
        params.validate()?;
        if days_sim <= n_burn_in {
            return Err(AppError::invalid_input(format!(
                "Simulation length {days_sim} must exceed the burn-in of {n_burn_in} days."
            )));
        }
        if days_sim > MAX_SIMULATION_DAYS {
            return Err(AppError::invalid_input(format!(
                "Simulation length {days_sim} exceeds the limit of {MAX_SIMULATION_DAYS} days."
            )));
        }
        let switch_day = match intervention_day {
            Some(d) if d < 0 => {
                return Err(AppError::invalid_input(format!(
                    "Intervention day must be >= 0, got {d}."
                )));
            }
            Some(d) => Some(usize::try_from(d).unwrap_or(usize::MAX)),
            None => None,
        };

        let s = &self.settings;
        let n = s.population;
        let gamma = 1.0 / s.infectious_period_days;
        let confirm_rate = 1.0 / s.confirmation_delay_days;
        let death_rate = 1.0 / s.death_delay_days;

        let mut susceptible = n - s.seed_infections;
        let mut infectious = s.seed_infections;
        let mut pending_confirm = s.detection_rate * s.seed_infections;
        let mut pending_death = params.lethality * s.seed_infections;

        let mut total_cases = Vec::with_capacity(days_sim);
        let mut confirmed_cases = Vec::with_capacity(days_sim);
        let mut deaths = Vec::with_capacity(days_sim);

        let (mut total, mut confirmed, mut dead) = (s.seed_infections, 0.0, 0.0);
        total_cases.push(total);
        confirmed_cases.push(confirmed);
        deaths.push(dead);

        for day in 0..days_sim - 1 {
            let beta = params.reproduction_number(day, switch_day) * gamma;

            // Flows are computed from the state at the start of the day.
            let new_inf = (beta * susceptible * infectious / n).min(susceptible);
            let removed = gamma * infectious;
            let new_confirmed = confirm_rate * pending_confirm;
            let new_dead = death_rate * pending_death;

            susceptible -= new_inf;
            infectious += new_inf - removed;
            pending_confirm += s.detection_rate * new_inf - new_confirmed;
            pending_death += params.lethality * new_inf - new_dead;

            total += new_inf;
            confirmed += new_confirmed;
            dead += new_dead;

            total_cases.push(total);
            confirmed_cases.push(confirmed);
            deaths.push(dead);
        }

        if !(total.is_finite() && confirmed.is_finite() && dead.is_finite()) {
            return Err(AppError::numerical(format!(
                "Simulation produced non-finite counts for {params:?}."
            )));
        }

        Ok(SimulationTrajectory {
            total_cases,
            confirmed_cases,
            deaths,
            burn_in: n_burn_in,
        })
    }
}
