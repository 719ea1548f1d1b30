//! Shared run logic behind the CLI commands.
//!
//! fit: ingest -> scan plan -> grid search -> projections -> prediction
//!
//! Presentation (printing, exports) stays in `app`; everything here returns
//! plain values so the whole workflow is testable without a terminal.

use chrono::NaiveDate;
use log::info;

use crate::data::{SyntheticOutbreak, generate_outbreak};
use crate::domain::{
    FitConfig, ModelParameters, Prediction, SimulateConfig, SimulationTrajectory, SynthConfig,
};
use crate::error::AppError;
use crate::fit::{
    LikelihoodEvaluator, Projection, ScanPlan, SearchOutcome, fit_grid, project_all,
    to_simulated_day,
};
use crate::io::export::write_outbreak_csv;
use crate::io::ingest::{IngestedData, load_observed};
use crate::models::EpidemicModel;

/// All computed outputs of a single `fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub data: IngestedData,
    pub outcome: SearchOutcome,
    /// Best cell applied over the base parameters.
    pub best_parameters: ModelParameters,
    pub projections: Vec<Projection>,
    pub prediction: Prediction,
}

/// Ingest the configured CSV and fit it.
pub fn run_fit(config: &FitConfig) -> Result<FitRun, AppError> {
    let data = load_observed(&config.data)?;
    fit_observed(config, data)
}

/// Fit already-ingested data.
pub fn fit_observed(config: &FitConfig, data: IngestedData) -> Result<FitRun, AppError> {
    let plan = ScanPlan::from_ranges(&config.scan_parameters, &config.value_grids)?;
    let model = EpidemicModel::new(config.settings)?;
    let scan = plan.parameters();
    let evaluator = LikelihoodEvaluator::new(&model, &scan, config.base);

    let outcome = fit_grid(
        &plan,
        &evaluator,
        &data.observed,
        config.intervention_day,
        config.execution,
    )?;
    let best_parameters = outcome.best.parameters.apply_to(&config.base)?;
    info!(
        "Best fit: {} (score {:.3}).",
        outcome
            .best
            .parameters
            .entries()
            .iter()
            .map(|(p, v)| format!("{p}={}", p.format_value(*v)))
            .collect::<Vec<_>>()
            .join(", "),
        outcome.best.score
    );

    let projections = project_all(&outcome.tensor, &scan)?;
    let start_date = data
        .dates
        .first()
        .copied()
        .ok_or_else(|| AppError::data("Observed series has no dates."))?;
    let prediction = predict(
        &model,
        &best_parameters,
        data.observed_days(),
        config.prediction_days,
        config.intervention_day,
        start_date,
    )?;

    Ok(FitRun {
        data,
        outcome,
        best_parameters,
        projections,
        prediction,
    })
}

/// Simulate `params` over the observed window plus `prediction_days`.
///
/// The returned trajectory starts on the first observed day; the intervention
/// day is counted from there as well.
pub fn predict(
    model: &EpidemicModel,
    params: &ModelParameters,
    observed_days: usize,
    prediction_days: usize,
    intervention_day: Option<i64>,
    start_date: NaiveDate,
) -> Result<Prediction, AppError> {
    let burn_in = params.burn_in;
    let days_sim = observed_days
        .checked_add(burn_in)
        .and_then(|d| d.checked_add(prediction_days))
        .ok_or_else(|| {
            AppError::invalid_input(format!(
                "Prediction of {prediction_days} days past {observed_days} observed days is too long."
            ))
        })?;
    let switch_day = to_simulated_day(intervention_day, burn_in)?;
    let trajectory = model
        .simulate(params, days_sim, burn_in, switch_day)?
        .after_burn_in();
    Ok(Prediction {
        start_date,
        observed_days,
        trajectory,
    })
}

pub fn run_simulate(config: &SimulateConfig) -> Result<SimulationTrajectory, AppError> {
    let model = EpidemicModel::new(config.settings)?;
    model.simulate(
        &config.parameters,
        config.days,
        config.parameters.burn_in,
        config.intervention_day,
    )
}

/// Generate a synthetic outbreak and write it to `config.output`.
pub fn run_synth(config: &SynthConfig) -> Result<SyntheticOutbreak, AppError> {
    let outbreak = generate_outbreak(config)?;
    write_outbreak_csv(&config.output, &outbreak)?;
    info!("Wrote {} rows to '{}'.", outbreak.len(), config.output.display());
    Ok(outbreak)
}
