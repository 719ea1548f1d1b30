//! Result exports.
//!
//! - JSON fit report: scan axes, the flat score tensor with its shape, the best
//!   cell, every 2-D projection and the prediction trajectory
//! - synthetic outbreaks as CSV in the same format the ingest reads
//!
//! Exports are serialized in memory first so a failure never leaves a
//! half-written file behind.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::SyntheticOutbreak;
use crate::domain::{ModelParameters, ModelSettings, Parameter, Prediction};
use crate::error::AppError;
use crate::fit::{BestFit, Projection, ScanAxis, SearchOutcome};
use crate::io::ingest::IngestedData;

/// A projection in row-major form (rows follow the first parameter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRows {
    pub parameters: (Parameter, Parameter),
    pub rows: Vec<Vec<f64>>,
}

impl From<&Projection> for ProjectionRows {
    fn from(p: &Projection) -> Self {
        let rows = (0..p.scores.nrows())
            .map(|r| p.scores.row(r).iter().copied().collect())
            .collect();
        Self {
            parameters: p.parameters,
            rows,
        }
    }
}

/// Everything a `fit` run produced, in a portable JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub tool: String,
    pub country: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub settings: ModelSettings,
    /// Values used for parameters that were not scanned.
    pub base: ModelParameters,
    /// Counted from the first observed day.
    pub intervention_day: Option<i64>,
    pub axes: Vec<ScanAxis>,
    pub shape: Vec<usize>,
    /// Row-major, `shape.iter().product()` entries.
    pub scores: Vec<f64>,
    pub best: BestFit,
    pub best_parameters: ModelParameters,
    pub projections: Vec<ProjectionRows>,
    pub prediction: Prediction,
}

impl FitReport {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data: &IngestedData,
        settings: ModelSettings,
        base: ModelParameters,
        intervention_day: Option<i64>,
        outcome: &SearchOutcome,
        best_parameters: ModelParameters,
        projections: &[Projection],
        prediction: &Prediction,
    ) -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            country: data.country.clone(),
            first_date: data.dates.first().copied().unwrap_or(prediction.start_date),
            last_date: data.dates.last().copied().unwrap_or(prediction.start_date),
            settings,
            base,
            intervention_day,
            axes: outcome.plan.axes().to_vec(),
            shape: outcome.tensor.shape().to_vec(),
            scores: outcome.tensor.as_slice().to_vec(),
            best: outcome.best.clone(),
            best_parameters,
            projections: projections.iter().map(ProjectionRows::from).collect(),
            prediction: prediction.clone(),
        }
    }
}

/// Write a fit report as pretty-printed JSON.
pub fn write_fit_report(path: &Path, report: &FitReport) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| AppError::io(format!("Failed to serialize fit report: {e}")))?;
    fs::write(path, json)
        .map_err(|e| AppError::io(format!("Failed to write fit report '{}': {e}", path.display())))
}

pub fn read_fit_report(path: &Path) -> Result<FitReport, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to open fit report '{}': {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| AppError::data(format!("Invalid fit report JSON: {e}")))
}

/// Write a synthetic outbreak as `Date,Country,Confirmed,Recovered,Deaths`.
///
/// `Recovered` is left empty; the ingest reads empty counts as 0.
pub fn write_outbreak_csv(path: &Path, outbreak: &SyntheticOutbreak) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| AppError::io(format!("Failed to encode synthetic CSV: {e}"));

    writer
        .write_record(["Date", "Country", "Confirmed", "Recovered", "Deaths"])
        .map_err(csv_err)?;
    for ((date, confirmed), deaths) in outbreak
        .dates
        .iter()
        .zip(&outbreak.confirmed_cumulative)
        .zip(&outbreak.deaths_cumulative)
    {
        writer
            .write_record([
                date.format("%Y-%m-%d").to_string(),
                outbreak.country.clone(),
                format!("{confirmed:.0}"),
                String::new(),
                format!("{deaths:.0}"),
            ])
            .map_err(csv_err)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::io(format!("Failed to encode synthetic CSV: {e}")))?;
    fs::write(path, bytes)
        .map_err(|e| AppError::io(format!("Failed to write CSV '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_outbreak;
    use crate::domain::{DataSource, NoiseModel, ObservedSeries, SimulationTrajectory, SynthConfig};
    use crate::fit::{ScanPlan, ScoreTensor, project_all, select_best};
    use crate::io::ingest::load_observed;
    use std::collections::BTreeMap;

    fn synth_config(output: std::path::PathBuf) -> SynthConfig {
        SynthConfig {
            parameters: ModelParameters::default(),
            settings: ModelSettings::default(),
            observed_days: 12,
            intervention_day: None,
            noise: NoiseModel::Poisson,
            seed: 3,
            country: "Synthland".to_string(),
            start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            output,
        }
    }

    #[test]
    fn synthetic_csv_reads_back_through_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synth.csv");
        let outbreak = generate_outbreak(&synth_config(path.clone())).unwrap();
        write_outbreak_csv(&path, &outbreak).unwrap();

        let data = load_observed(&DataSource {
            csv_path: path,
            country: "Synthland".to_string(),
            skip_days: 0,
            confirmed_offset: 0.0,
        })
        .unwrap();
        assert_eq!(data.dates, outbreak.dates);
        assert_eq!(data.confirmed_cumulative, outbreak.confirmed_cumulative);
        assert_eq!(data.deaths_cumulative, outbreak.deaths_cumulative);
        assert_eq!(data.clamped_days, 0);
    }

    #[test]
    fn fit_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut grids = BTreeMap::new();
        grids.insert(Parameter::Lethality, vec![0.01, 0.02]);
        grids.insert(Parameter::R0Before, vec![2.0, 2.5, 3.0]);
        let plan = ScanPlan::from_grids(&[Parameter::Lethality, Parameter::R0Before], &grids).unwrap();
        let tensor = ScoreTensor::from_fn(plan.shape(), |i| (i[0] + i[1]) as f64 + 0.5).unwrap();
        let best = select_best(&plan, &tensor).unwrap();
        let projections = project_all(&tensor, &plan.parameters()).unwrap();
        let outcome = SearchOutcome { plan, tensor, best };

        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let data = IngestedData {
            country: "Germany".to_string(),
            dates: vec![start, start.succ_opt().unwrap()],
            confirmed_cumulative: vec![1.0, 3.0],
            deaths_cumulative: vec![0.0, 0.0],
            observed: ObservedSeries::new(vec![2], vec![0]).unwrap(),
            clamped_days: 0,
            rows_read: 2,
        };
        let prediction = Prediction {
            start_date: start,
            observed_days: 2,
            trajectory: SimulationTrajectory {
                total_cases: vec![4.0, 8.0, 16.0],
                confirmed_cases: vec![1.0, 2.0, 4.0],
                deaths: vec![0.0, 0.0, 0.1],
                burn_in: 0,
            },
        };

        let report = FitReport::new(
            &data,
            ModelSettings::default(),
            ModelParameters::default(),
            None,
            &outcome,
            ModelParameters::default(),
            &projections,
            &prediction,
        );
        write_fit_report(&path, &report).unwrap();
        let back = read_fit_report(&path).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.shape, vec![2, 3]);
        assert_eq!(back.projections[0].rows, vec![vec![0.5, 1.5, 2.5], vec![1.5, 2.5, 3.5]]);
    }

    #[test]
    fn unreadable_report_is_an_io_error() {
        let err = read_fit_report(Path::new("/nonexistent/report.json")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }
}
