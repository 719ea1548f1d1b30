//! Candidate value grids and the N-axis scan plan.
//!
//! Each scanned parameter gets an ordered list of candidate values; the scan
//! visits the full Cartesian product in row-major order (the first listed
//! parameter varies slowest).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{GridRange, Parameter};
use crate::error::AppError;

/// Fraction of a step below which `stop` counts as reached.
const STOP_TOL: f64 = 1e-9;

/// Most candidate values a single axis may hold.
pub const MAX_AXIS_POINTS: usize = 100_000;

/// Most cells a scan may visit.
pub const MAX_GRID_CELLS: usize = 10_000_000;

/// Evenly spaced values in `[start, stop)`.
///
/// Values are computed as `start + k * step` rather than by repeated addition
/// so that long ranges do not accumulate drift.
pub fn arange(start: f64, stop: f64, step: f64) -> Result<Vec<f64>, AppError> {
    if !(start.is_finite() && stop.is_finite() && step.is_finite() && step > 0.0) {
        return Err(AppError::invalid_input(format!(
            "Invalid grid range {start}:{stop}:{step} (must be finite with step > 0)."
        )));
    }
    let span = (stop - start) / step;
    if span <= STOP_TOL {
        return Err(AppError::invalid_input(format!(
            "Grid range {start}:{stop}:{step} is empty."
        )));
    }
    if span - STOP_TOL > MAX_AXIS_POINTS as f64 {
        return Err(AppError::invalid_input(format!(
            "Grid range {start}:{stop}:{step} has more than {MAX_AXIS_POINTS} values."
        )));
    }
    let n = (span - STOP_TOL).ceil() as usize;
    Ok((0..n).map(|k| start + step * k as f64).collect())
}

/// One axis of the scan: a parameter and its candidate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanAxis {
    pub parameter: Parameter,
    pub values: Vec<f64>,
}

/// A validated, ordered set of scan axes.
///
/// Axis `k` of every score tensor built from this plan corresponds to
/// `axes()[k]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPlan {
    axes: Vec<ScanAxis>,
}

impl ScanPlan {
    pub fn new(axes: Vec<ScanAxis>) -> Result<Self, AppError> {
        if axes.is_empty() {
            return Err(AppError::invalid_input("Scan needs at least one parameter."));
        }
        for (i, axis) in axes.iter().enumerate() {
            if axes[..i].iter().any(|a| a.parameter == axis.parameter) {
                return Err(AppError::invalid_input(format!(
                    "Parameter '{}' is scanned twice.",
                    axis.parameter
                )));
            }
            if axis.values.is_empty() {
                return Err(AppError::invalid_input(format!(
                    "Grid for '{}' has no values.",
                    axis.parameter
                )));
            }
            if let Some(v) = axis.values.iter().find(|v| !v.is_finite()) {
                return Err(AppError::invalid_input(format!(
                    "Grid for '{}' contains non-finite value {v}.",
                    axis.parameter
                )));
            }
        }
        let cells = axes
            .iter()
            .try_fold(1usize, |acc, a| acc.checked_mul(a.values.len()))
            .filter(|&n| n <= MAX_GRID_CELLS);
        if cells.is_none() {
            return Err(AppError::invalid_input(format!(
                "Scan has more than {MAX_GRID_CELLS} grid cells."
            )));
        }
        Ok(Self { axes })
    }

    /// Build a plan from a scan order and a per-parameter grid mapping.
    ///
    /// Every scanned parameter needs a grid and every grid must belong to a
    /// scanned parameter, so the tensor's dimensionality always agrees with
    /// the scan list.
    pub fn from_grids(
        scan_parameters: &[Parameter],
        value_grids: &BTreeMap<Parameter, Vec<f64>>,
    ) -> Result<Self, AppError> {
        if let Some(extra) = value_grids.keys().find(|p| !scan_parameters.contains(p)) {
            return Err(AppError::invalid_input(format!(
                "A grid was given for '{extra}', which is not in the scan list."
            )));
        }
        let axes = scan_parameters
            .iter()
            .map(|&parameter| {
                value_grids
                    .get(&parameter)
                    .map(|values| ScanAxis {
                        parameter,
                        values: values.clone(),
                    })
                    .ok_or_else(|| {
                        AppError::invalid_input(format!("No grid given for '{parameter}'."))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(axes)
    }

    /// Expand `start:stop:step` ranges into a plan.
    ///
    /// Scanned parameters without a range use their default range; a range
    /// for a parameter that is not scanned is an error.
    pub fn from_ranges(
        scan_parameters: &[Parameter],
        ranges: &BTreeMap<Parameter, GridRange>,
    ) -> Result<Self, AppError> {
        if let Some(extra) = ranges.keys().find(|p| !scan_parameters.contains(p)) {
            return Err(AppError::invalid_input(format!(
                "A range was given for '{extra}', which is not in the scan list."
            )));
        }
        let mut grids = BTreeMap::new();
        for &p in scan_parameters {
            let range = ranges.get(&p).copied().unwrap_or_else(|| p.default_range());
            grids.insert(p, range.values()?);
        }
        Self::from_grids(scan_parameters, &grids)
    }

    pub fn axes(&self) -> &[ScanAxis] {
        &self.axes
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        self.axes.iter().map(|a| a.parameter).collect()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.values.len()).collect()
    }

    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    /// Number of grid cells.
    pub fn len(&self) -> usize {
        self.axes.iter().map(|a| a.values.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, parameter: Parameter) -> bool {
        self.axes.iter().any(|a| a.parameter == parameter)
    }

    /// Row-major multi-index of flat cell `flat`.
    pub fn unravel(&self, flat: usize) -> Vec<usize> {
        unravel_index(flat, &self.shape())
    }

    /// Candidate values at a multi-index, in axis order.
    pub fn values_at(&self, index: &[usize]) -> Vec<f64> {
        self.axes
            .iter()
            .zip(index)
            .map(|(axis, &i)| axis.values[i])
            .collect()
    }
}

/// Row-major multi-index for a flat position within `shape`.
pub fn unravel_index(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (slot, &len) in index.iter_mut().zip(shape).rev() {
        *slot = flat % len;
        flat /= len;
    }
    index
}
