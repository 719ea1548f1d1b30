//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - maps arguments into run configurations
//! - runs the pipeline and prints reports
//! - writes optional exports once everything has succeeded

use std::collections::BTreeMap;

use clap::Parser;
use log::debug;

use crate::cli::{Cli, Command, FitArgs, SimulateArgs, SynthArgs};
use crate::domain::{DataSource, FitConfig, Parameter, SimulateConfig, SynthConfig};
use crate::error::AppError;
use crate::io::export::{FitReport, write_fit_report};
use crate::logging::init_logging;
use crate::report::{format_fit_summary, format_prediction_table, format_profiles, format_trajectory};

pub mod pipeline;

/// Intervention day (from the first observation) used when R0-1 is scanned.
pub const DEFAULT_INTERVENTION_DAY: i64 = 18;
pub const PREDICTION_DAYS_WITH_INTERVENTION: usize = 21;
pub const PREDICTION_DAYS: usize = 3;

/// Entry point for the `episcan` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.log_level.to_filter())?;

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Simulate(args) => handle_simulate(&args),
        Command::Synth(args) => handle_synth(&args),
    }
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args);
    debug!("{config:?}");
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        format_fit_summary(&run.data, &run.outcome, &run.best_parameters, config.intervention_day)
    );
    print!("{}", format_profiles(&run.outcome)?);
    print!("{}", format_prediction_table(&run.prediction));

    if let Some(path) = &config.export_report {
        let report = FitReport::new(
            &run.data,
            config.settings,
            config.base,
            config.intervention_day,
            &run.outcome,
            run.best_parameters,
            &run.projections,
            &run.prediction,
        );
        write_fit_report(path, &report)?;
        println!("\nFit report written to '{}'.", path.display());
    }
    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let config = SimulateConfig {
        parameters: args.parameters.to_parameters(),
        settings: args.settings.to_settings(),
        days: args.days,
        intervention_day: args.intervention_day,
    };
    let trajectory = pipeline::run_simulate(&config)?;
    if args.json {
        let json = serde_json::to_string_pretty(&trajectory)
            .map_err(|e| AppError::io(format!("Failed to serialize trajectory: {e}")))?;
        println!("{json}");
    } else {
        print!("{}", format_trajectory(&trajectory));
    }
    Ok(())
}

fn handle_synth(args: &SynthArgs) -> Result<(), AppError> {
    let config = SynthConfig {
        parameters: args.parameters.to_parameters(),
        settings: args.settings.to_settings(),
        observed_days: args.days,
        intervention_day: args.intervention_day,
        noise: args.noise,
        seed: args.seed,
        country: args.country.clone(),
        start_date: args.start_date,
        output: args.output.clone(),
    };
    let outbreak = pipeline::run_synth(&config)?;
    println!(
        "Wrote {} days for '{}' to '{}'.",
        outbreak.len(),
        config.country,
        config.output.display()
    );
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    let scans_intervention = args.scan.contains(&Parameter::R0After);

    let mut value_grids = BTreeMap::new();
    for (parameter, range) in [
        (Parameter::Lethality, args.lethality_range),
        (Parameter::BurnIn, args.burn_in_range),
        (Parameter::R0Before, args.r0_before_range),
        (Parameter::R0After, args.r0_after_range),
    ] {
        if let Some(range) = range {
            value_grids.insert(parameter, range);
        }
    }

    let intervention_day = if args.no_intervention {
        None
    } else {
        args.intervention_day
            .or(scans_intervention.then_some(DEFAULT_INTERVENTION_DAY))
    };
    let prediction_days = args.prediction_days.unwrap_or(if scans_intervention {
        PREDICTION_DAYS_WITH_INTERVENTION
    } else {
        PREDICTION_DAYS
    });

    FitConfig {
        data: DataSource {
            csv_path: args.data.clone(),
            country: args.country.clone(),
            skip_days: args.skip_days,
            confirmed_offset: args.confirmed_offset,
        },
        scan_parameters: args.scan.clone(),
        value_grids,
        base: args.parameters.to_parameters(),
        settings: args.settings.to_settings(),
        intervention_day,
        prediction_days,
        execution: args.execution,
        export_report: args.export.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GridRange;

    fn fit_args(extra: &[&str]) -> FitArgs {
        let mut argv = vec!["episcan", "fit", "--data", "cases.csv"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Fit(args) => args,
            other => panic!("expected fit, got {other:?}"),
        }
    }

    #[test]
    fn defaults_without_intervention_scan() {
        let config = fit_config_from_args(&fit_args(&[]));
        assert_eq!(config.intervention_day, None);
        assert_eq!(config.prediction_days, PREDICTION_DAYS);
        assert!(config.value_grids.is_empty());
        assert_eq!(config.data.skip_days, 36);
        assert_eq!(config.data.confirmed_offset, 16.0);
    }

    #[test]
    fn scanning_r0_after_enables_the_intervention() {
        let config = fit_config_from_args(&fit_args(&["--scan", "lethality,R0-0,R0-1"]));
        assert_eq!(config.intervention_day, Some(DEFAULT_INTERVENTION_DAY));
        assert_eq!(config.prediction_days, PREDICTION_DAYS_WITH_INTERVENTION);

        let config = fit_config_from_args(&fit_args(&["--scan", "R0-1", "--no-intervention"]));
        assert_eq!(config.intervention_day, None);

        let config = fit_config_from_args(&fit_args(&[
            "--scan",
            "R0-1",
            "--intervention-day",
            "10",
            "--prediction-days",
            "5",
        ]));
        assert_eq!(config.intervention_day, Some(10));
        assert_eq!(config.prediction_days, 5);
    }

    #[test]
    fn ranges_are_keyed_by_parameter() {
        let config = fit_config_from_args(&fit_args(&["--burn-in-range", "3:6:1"]));
        assert_eq!(
            config.value_grids.get(&Parameter::BurnIn),
            Some(&GridRange::new(3.0, 6.0, 1.0))
        );
    }
}
