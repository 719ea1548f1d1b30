//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation
//! details and output changes stay localized.

use std::fmt::Write as _;

use crate::domain::{ModelParameters, Parameter, Prediction, SimulationTrajectory};
use crate::error::AppError;
use crate::fit::{SearchOutcome, profile};
use crate::io::ingest::IngestedData;

/// Header, data window, scan size and the best parameter set.
pub fn format_fit_summary(
    data: &IngestedData,
    outcome: &SearchOutcome,
    best: &ModelParameters,
    intervention_day: Option<i64>,
) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} - grid-search fit ===\n", env!("CARGO_PKG_NAME")));
    if let (Some(first), Some(last)) = (data.dates.first(), data.dates.last()) {
        out.push_str(&format!(
            "Country: {} | window {first} .. {last} ({} daily increments)\n",
            data.country,
            data.observed.len()
        ));
    }
    if data.clamped_days > 0 {
        out.push_str(&format!(
            "Note: {} negative daily differences clamped to 0.\n",
            data.clamped_days
        ));
    }

    let axes = outcome
        .plan
        .axes()
        .iter()
        .map(|a| format!("{}[{}]", a.parameter, a.values.len()))
        .collect::<Vec<_>>()
        .join(" x ");
    out.push_str(&format!("Scan: {axes} = {} cells\n", outcome.plan.len()));
    match intervention_day {
        Some(d) => out.push_str(&format!("Intervention: observed day {d}\n")),
        None => out.push_str("Intervention: none\n"),
    }
    out.push_str(&format!(
        "Best score (Poisson deviance): {:.3}\n",
        outcome.best.score
    ));

    out.push_str("\nBest parameters:\n");
    for p in Parameter::ALL {
        let tag = if outcome.plan.contains(p) { "" } else { " (fixed)" };
        out.push_str(&format!(
            "  {:<10} = {}{tag}\n",
            p.name(),
            p.format_value(best.value(p))
        ));
    }
    out
}

/// One minimum profile per scanned parameter; `*` marks the best value.
pub fn format_profiles(outcome: &SearchOutcome) -> Result<String, AppError> {
    let mut out = String::new();
    for (axis, scan_axis) in outcome.plan.axes().iter().enumerate() {
        let prof = profile(&outcome.tensor, axis)?;
        let _ = writeln!(out, "\nProfile over {}:", scan_axis.parameter);
        for (i, (value, score)) in scan_axis.values.iter().zip(&prof).enumerate() {
            let mark = if outcome.best.index[axis] == i { "*" } else { " " };
            let _ = writeln!(
                out,
                " {mark} {:>8}  {score:>14.3}",
                scan_axis.parameter.format_value(*value)
            );
        }
    }
    Ok(out)
}

/// Cumulative and daily predicted counts; forecast rows are marked `+`.
pub fn format_prediction_table(prediction: &Prediction) -> String {
    let traj = &prediction.trajectory;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\nPrediction ({} observed days, {} forecast):",
        prediction.observed_days,
        prediction.forecast_days()
    );
    let _ = writeln!(
        out,
        "  {:<10} {:>12} {:>12} {:>10} {:>10} {:>8}",
        "date", "total", "confirmed", "deaths", "new conf", "new dead"
    );
    let daily_confirmed = traj.daily_confirmed();
    let daily_deaths = traj.daily_deaths();
    for day in 0..traj.days() {
        let date = prediction
            .date(day)
            .map(|d| d.to_string())
            .unwrap_or_else(|| format!("day {day}"));
        let mark = if day >= prediction.observed_days { "+" } else { " " };
        let (new_conf, new_dead) = match day.checked_sub(1) {
            Some(prev) => (daily_confirmed[prev], daily_deaths[prev]),
            None => (0.0, 0.0),
        };
        let _ = writeln!(
            out,
            "{mark} {date:<10} {:>12.0} {:>12.0} {:>10.1} {:>10.0} {:>8.1}",
            traj.total_cases[day], traj.confirmed_cases[day], traj.deaths[day], new_conf, new_dead
        );
    }
    out
}

/// Plain per-day listing of a simulation.
pub fn format_trajectory(trajectory: &SimulationTrajectory) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5} {:>14} {:>14} {:>12}",
        "day", "total", "confirmed", "deaths"
    );
    for day in 0..trajectory.days() {
        let mark = if day < trajectory.burn_in { "b" } else { " " };
        let _ = writeln!(
            out,
            "{day:>4}{mark} {:>14.1} {:>14.1} {:>12.2}",
            trajectory.total_cases[day], trajectory.confirmed_cases[day], trajectory.deaths[day]
        );
    }
    out
}
