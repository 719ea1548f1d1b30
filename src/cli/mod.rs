//! Command-line parsing for the epidemic grid-search fitter.
//!
//! Argument parsing and command dispatch stay separate from the model and
//! fitting code; `app` maps these structs into plain run configurations.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use crate::domain::{ExecutionMode, GridRange, ModelParameters, ModelSettings, NoiseModel, Parameter};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "episcan", version, about = "Grid-search fitting of a compartmental epidemic model")]
pub struct Cli {
    /// Log verbosity (logs go to stderr).
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit observed case/death counts by scanning a parameter grid.
    Fit(FitArgs),
    /// Run the model forward for fixed parameters and print the trajectory.
    Simulate(SimulateArgs),
    /// Write a synthetic outbreak CSV drawn from known parameters.
    Synth(SynthArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Values for the four tunables; scanned parameters ignore theirs.
#[derive(Debug, Args, Clone)]
pub struct ParameterArgs {
    /// Fraction of infections that end in death.
    #[arg(long, default_value_t = 0.01)]
    pub lethality: f64,

    /// Simulated days before the first observed day.
    #[arg(long, default_value_t = 5)]
    pub burn_in: usize,

    /// Reproduction number before the intervention.
    #[arg(long = "r0-0", default_value_t = 2.5)]
    pub r0_before: f64,

    /// Reproduction number from the intervention day on.
    #[arg(long = "r0-1", default_value_t = 1.0)]
    pub r0_after: f64,
}

impl ParameterArgs {
    pub fn to_parameters(&self) -> ModelParameters {
        ModelParameters {
            lethality: self.lethality,
            burn_in: self.burn_in,
            r0_before: self.r0_before,
            r0_after: self.r0_after,
        }
    }
}

/// Structural constants of the model.
#[derive(Debug, Args, Clone)]
pub struct SettingsArgs {
    #[arg(long, default_value_t = 83_000_000.0)]
    pub population: f64,

    /// Infections present on the first simulated day.
    #[arg(long, default_value_t = 10.0)]
    pub seed_infections: f64,

    #[arg(long, default_value_t = 5.0)]
    pub infectious_period: f64,

    /// Fraction of infections that are eventually confirmed.
    #[arg(long, default_value_t = 0.25)]
    pub detection_rate: f64,

    /// Mean days from infection to confirmation.
    #[arg(long, default_value_t = 4.0)]
    pub confirmation_delay: f64,

    /// Mean days from infection to death.
    #[arg(long, default_value_t = 14.0)]
    pub death_delay: f64,
}

impl SettingsArgs {
    pub fn to_settings(&self) -> ModelSettings {
        ModelSettings {
            population: self.population,
            seed_infections: self.seed_infections,
            infectious_period_days: self.infectious_period,
            detection_rate: self.detection_rate,
            confirmation_delay_days: self.confirmation_delay,
            death_delay_days: self.death_delay,
        }
    }
}

/// Options for `episcan fit`.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Country-aggregated CSV (Date,Country,Confirmed,Recovered,Deaths).
    #[arg(long, value_name = "CSV")]
    pub data: PathBuf,

    #[arg(long, default_value = "Germany")]
    pub country: String,

    /// Leading rows dropped before the fit window.
    #[arg(long, default_value_t = 36)]
    pub skip_days: usize,

    /// Subtracted from every cumulative confirmed value.
    #[arg(long, default_value_t = 16.0)]
    pub confirmed_offset: f64,

    /// Parameters to scan, in axis order.
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values = ["lethality", "burn-in", "R0-0"]
    )]
    pub scan: Vec<Parameter>,

    /// Grid for lethality as start:stop:step (stop excluded).
    #[arg(long, value_name = "RANGE")]
    pub lethality_range: Option<GridRange>,

    #[arg(long, value_name = "RANGE")]
    pub burn_in_range: Option<GridRange>,

    #[arg(long = "r0-0-range", value_name = "RANGE")]
    pub r0_before_range: Option<GridRange>,

    #[arg(long = "r0-1-range", value_name = "RANGE")]
    pub r0_after_range: Option<GridRange>,

    #[command(flatten)]
    pub parameters: ParameterArgs,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Day of the R0 switch, counted from the first observed day
    /// (default 18 when R0-1 is scanned).
    #[arg(long, conflicts_with = "no_intervention")]
    pub intervention_day: Option<i64>,

    /// Disable the R0 switch even when R0-1 is scanned.
    #[arg(long)]
    pub no_intervention: bool,

    /// Days predicted past the data (default 21 when R0-1 is scanned, else 3).
    #[arg(long)]
    pub prediction_days: Option<usize>,

    #[arg(long, value_enum, default_value_t = ExecutionMode::Parallel)]
    pub execution: ExecutionMode,

    /// Write the full fit report as JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

/// Options for `episcan simulate`.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub parameters: ParameterArgs,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Simulated days, burn-in included.
    #[arg(long, default_value_t = 60)]
    pub days: usize,

    /// Simulated day on which R0-1 takes over.
    #[arg(long)]
    pub intervention_day: Option<i64>,

    /// Print the trajectory as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Options for `episcan synth`.
#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    #[command(flatten)]
    pub parameters: ParameterArgs,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Number of observed (cumulative) days to write.
    #[arg(long, default_value_t = 40)]
    pub days: usize,

    /// Day of the R0 switch, counted from the first observed day.
    #[arg(long)]
    pub intervention_day: Option<i64>,

    #[arg(long, value_enum, default_value_t = NoiseModel::Poisson)]
    pub noise: NoiseModel,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value = "Synthland")]
    pub country: String,

    /// Date of the first written row (YYYY-MM-DD).
    #[arg(long, default_value = "2020-03-01")]
    pub start_date: NaiveDate,

    #[arg(long, value_name = "CSV")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fit_defaults() {
        let cli = Cli::parse_from(["episcan", "fit", "--data", "cases.csv"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(
            args.scan,
            vec![Parameter::Lethality, Parameter::BurnIn, Parameter::R0Before]
        );
        assert_eq!(args.skip_days, 36);
        assert_eq!(args.country, "Germany");
        assert_eq!(args.execution, ExecutionMode::Parallel);
        assert_eq!(args.parameters.to_parameters(), ModelParameters::default());
        assert_eq!(args.settings.to_settings(), ModelSettings::default());
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn fit_scan_and_ranges_parse() {
        let cli = Cli::parse_from([
            "episcan",
            "--log-level",
            "debug",
            "fit",
            "--data",
            "cases.csv",
            "--scan",
            "R0-0,R0-1",
            "--r0-1-range",
            "1.0:2.0:0.5",
            "--execution",
            "sequential",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.scan, vec![Parameter::R0Before, Parameter::R0After]);
        assert_eq!(args.r0_after_range, Some(GridRange::new(1.0, 2.0, 0.5)));
        assert_eq!(args.execution, ExecutionMode::Sequential);
        assert_eq!(cli.log_level.to_filter(), LevelFilter::Debug);
    }

    #[test]
    fn bad_range_is_rejected() {
        let res = Cli::try_parse_from([
            "episcan",
            "fit",
            "--data",
            "cases.csv",
            "--lethality-range",
            "0.1:0.2",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn synth_requires_output() {
        assert!(Cli::try_parse_from(["episcan", "synth"]).is_err());
        let cli = Cli::parse_from(["episcan", "synth", "--output", "out.csv", "--seed", "7"]);
        let Command::Synth(args) = cli.command else {
            panic!("expected synth");
        };
        assert_eq!(args.seed, 7);
        assert_eq!(args.noise, NoiseModel::Poisson);
        assert_eq!(args.start_date, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
    }
}
