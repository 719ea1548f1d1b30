//! Exhaustive grid search.
//!
//! Every cell of the scan plan is scored exactly once and stored in a dense
//! row-major tensor. The best cell is then picked by a separate sequential
//! pass in enumeration order, so the first cell reaching the minimum wins
//! regardless of how the scores were computed.

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{ExecutionMode, ObservedSeries, ParameterVector};
use crate::error::AppError;
use crate::fit::grid::{ScanPlan, unravel_index};
use crate::fit::likelihood::LikelihoodEvaluator;

/// Dense N-dimensional score array, one axis per scanned parameter.
///
/// Only built through `new`, which guarantees at least one cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreTensor {
    shape: Vec<usize>,
    scores: Vec<f64>,
}

impl ScoreTensor {
    /// Wrap row-major `scores` of the given `shape`.
    pub fn new(shape: Vec<usize>, scores: Vec<f64>) -> Result<Self, AppError> {
        if shape.is_empty() || shape.contains(&0) {
            return Err(AppError::invalid_input(format!(
                "Score tensor shape {shape:?} must have at least one axis and no empty axes."
            )));
        }
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &len| acc.checked_mul(len))
            .ok_or_else(|| {
                AppError::invalid_input(format!("Score tensor shape {shape:?} is too large."))
            })?;
        if scores.len() != expected {
            return Err(AppError::invalid_input(format!(
                "Score tensor of shape {shape:?} needs {expected} cells, got {}.",
                scores.len()
            )));
        }
        Ok(Self { shape, scores })
    }

    /// Build a tensor by evaluating `f` at every multi-index.
    pub fn from_fn(shape: Vec<usize>, f: impl Fn(&[usize]) -> f64) -> Result<Self, AppError> {
        let len = shape
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .filter(|&n| n <= crate::fit::grid::MAX_GRID_CELLS)
            .ok_or_else(|| {
                AppError::invalid_input(format!("Score tensor shape {shape:?} is too large."))
            })?;
        let scores = (0..len).map(|flat| f(&unravel_index(flat, &shape))).collect();
        Self::new(shape, scores)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Scores in row-major order.
    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }

    pub fn flat_index(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0usize;
        for (&i, &len) in index.iter().zip(&self.shape) {
            if i >= len {
                return None;
            }
            flat = flat * len + i;
        }
        Some(flat)
    }

    pub fn get(&self, index: &[usize]) -> Option<f64> {
        self.flat_index(index).map(|flat| self.scores[flat])
    }

    pub fn unravel(&self, flat: usize) -> Vec<usize> {
        unravel_index(flat, &self.shape)
    }

    /// First cell (in row-major order) holding the minimum score.
    pub fn argmin(&self) -> (usize, f64) {
        let mut best = (0, self.scores[0]);
        for (flat, &score) in self.scores.iter().enumerate().skip(1) {
            // Strict comparison: an equal score later in the scan never wins.
            if score < best.1 {
                best = (flat, score);
            }
        }
        best
    }

    pub fn min(&self) -> f64 {
        self.argmin().1
    }
}

/// The best-scoring grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestFit {
    /// Grid index per axis.
    pub index: Vec<usize>,
    pub parameters: ParameterVector,
    pub score: f64,
}

/// Result of a full scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub plan: ScanPlan,
    pub tensor: ScoreTensor,
    pub best: BestFit,
}

/// Score every cell of `plan` with `objective`.
///
/// Any failing cell aborts the whole search: a tensor with holes is never
/// returned.
pub fn search_grid<F>(plan: &ScanPlan, mode: ExecutionMode, objective: F) -> Result<SearchOutcome, AppError>
where
    F: Fn(&[f64]) -> Result<f64, AppError> + Sync,
{
    let cells = plan.len();
    info!(
        "scanning {cells} grid cells over [{}] ({mode:?})",
        plan.parameters()
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let evaluate = |flat: usize| -> Result<f64, AppError> {
        let index = plan.unravel(flat);
        let values = plan.values_at(&index);
        let score = objective(&values).map_err(|e| {
            AppError::new(
                e.kind(),
                format!("Grid search aborted at cell {index:?} ({values:?}): {e}"),
            )
        })?;
        if !score.is_finite() {
            return Err(AppError::numerical(format!(
                "Grid search aborted: non-finite score {score} at cell {index:?} ({values:?})."
            )));
        }
        Ok(score)
    };

    // Indexed collection keeps row-major order, so each cell lands in its own slot.
    let scores: Vec<f64> = match mode {
        ExecutionMode::Parallel => (0..cells).into_par_iter().map(evaluate).collect::<Result<_, _>>()?,
        ExecutionMode::Sequential => (0..cells).map(evaluate).collect::<Result<_, _>>()?,
    };

    let tensor = ScoreTensor::new(plan.shape(), scores)?;
    let best = select_best(plan, &tensor)?;
    debug!("best cell {:?} with score {:.6}", best.index, best.score);

    Ok(SearchOutcome {
        plan: plan.clone(),
        tensor,
        best,
    })
}

/// Fit observed data by scoring every cell with the likelihood evaluator.
pub fn fit_grid(
    plan: &ScanPlan,
    evaluator: &LikelihoodEvaluator<'_>,
    observed: &ObservedSeries,
    intervention_day: Option<i64>,
    mode: ExecutionMode,
) -> Result<SearchOutcome, AppError> {
    if evaluator.parameters() != plan.parameters().as_slice() {
        return Err(AppError::invalid_input(format!(
            "Evaluator parameters {:?} do not match the scan axes {:?}.",
            evaluator.parameters(),
            plan.parameters()
        )));
    }
    search_grid(plan, mode, |values| {
        evaluator.score(values, observed, intervention_day)
    })
}

/// Deterministic minimum: first cell in enumeration order wins ties.
pub fn select_best(plan: &ScanPlan, tensor: &ScoreTensor) -> Result<BestFit, AppError> {
    if tensor.shape() != plan.shape().as_slice() {
        return Err(AppError::invalid_input(format!(
            "Tensor shape {:?} does not match scan shape {:?}.",
            tensor.shape(),
            plan.shape()
        )));
    }
    let (flat, score) = tensor.argmin();
    let index = tensor.unravel(flat);
    let parameters = ParameterVector::new(&plan.parameters(), &plan.values_at(&index))?;
    Ok(BestFit {
        index,
        parameters,
        score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::domain::{ModelParameters, ModelSettings, Parameter};
    use crate::fit::grid::ScanAxis;
    use crate::models::EpidemicModel;

    fn plan_2x3() -> ScanPlan {
        ScanPlan::new(vec![
            ScanAxis {
                parameter: Parameter::Lethality,
                values: vec![0.01, 0.02],
            },
            ScanAxis {
                parameter: Parameter::R0Before,
                values: vec![2.0, 2.5, 3.0],
            },
        ])
        .unwrap()
    }

    #[test]
    fn tensor_indexing_is_row_major() {
        let t = ScoreTensor::from_fn(vec![2, 3], |i| (i[0] * 10 + i[1]) as f64).unwrap();
        assert_eq!(t.as_slice(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(t.get(&[1, 2]), Some(12.0));
        assert_eq!(t.get(&[2, 0]), None);
        assert_eq!(t.get(&[0]), None);
    }

    #[test]
    fn tensor_rejects_bad_shapes() {
        assert!(ScoreTensor::new(vec![2, 2], vec![0.0; 3]).is_err());
        assert!(ScoreTensor::new(vec![], vec![]).is_err());
        assert!(ScoreTensor::new(vec![0], vec![]).is_err());
        assert!(ScoreTensor::new(vec![usize::MAX, 2], vec![0.0]).is_err());
        assert!(ScoreTensor::from_fn(vec![usize::MAX, 2], |_| 0.0).is_err());
    }

    #[test]
    fn every_tensor_has_a_minimum() {
        // `new` is the only constructor, so argmin always has a first cell.
        let t = ScoreTensor::new(vec![1], vec![7.5]).unwrap();
        assert_eq!(t.argmin(), (0, 7.5));
    }

    #[test]
    fn ties_resolve_to_first_cell_in_enumeration_order() {
        let plan = plan_2x3();
        // Cells (0, 2) and (1, 1) share the minimum 1.0.
        let outcome = search_grid(&plan, ExecutionMode::Parallel, |v| {
            Ok(match (v[0], v[1]) {
                (a, b) if a == 0.01 && b == 3.0 => 1.0,
                (a, b) if a == 0.02 && b == 2.5 => 1.0,
                _ => 5.0,
            })
        })
        .unwrap();
        assert_eq!(outcome.best.index, vec![0, 2]);
        assert_eq!(outcome.best.parameters.get(Parameter::R0Before), Some(3.0));
        assert_eq!(outcome.best.score, 1.0);
    }

    #[test]
    fn parallel_and_sequential_agree_bit_for_bit() {
        let plan = plan_2x3();
        let f = |v: &[f64]| Ok((v[0] * 100.0 - 1.5).powi(2) + (v[1] - 2.4).abs());
        let par = search_grid(&plan, ExecutionMode::Parallel, f).unwrap();
        let seq = search_grid(&plan, ExecutionMode::Sequential, f).unwrap();
        assert_eq!(par, seq);
    }

    #[test]
    fn failing_cell_aborts_the_search() {
        let plan = plan_2x3();
        let err = search_grid(&plan, ExecutionMode::Parallel, |v| {
            if v[1] == 2.5 {
                Err(AppError::numerical("boom"))
            } else {
                Ok(1.0)
            }
        })
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Numerical);
    }

    #[test]
    fn non_finite_scores_abort_the_search() {
        let plan = plan_2x3();
        let err = search_grid(&plan, ExecutionMode::Sequential, |_| Ok(f64::NAN)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Numerical);
    }

    #[test]
    fn repeated_fits_are_identical() {
        let model = EpidemicModel::new(ModelSettings::default()).unwrap();
        let observed = ObservedSeries::new(vec![3, 5, 8, 12, 18], vec![0, 0, 1, 0, 1]).unwrap();
        let plan = plan_2x3();
        let params = plan.parameters();
        let eval = LikelihoodEvaluator::new(&model, &params, ModelParameters::default());
        let a = fit_grid(&plan, &eval, &observed, None, ExecutionMode::Parallel).unwrap();
        let b = fit_grid(&plan, &eval, &observed, None, ExecutionMode::Parallel).unwrap();
        assert_eq!(a.tensor, b.tensor);
        assert_eq!(a.best, b.best);
        assert_eq!(a.best.score, a.tensor.min());
    }

    #[test]
    fn lethality_only_scan_end_to_end() {
        let model = EpidemicModel::new(ModelSettings::default()).unwrap();
        let observed = ObservedSeries::new(vec![10, 12, 15], vec![0, 1, 1]).unwrap();
        let mut grids = BTreeMap::new();
        grids.insert(Parameter::Lethality, vec![0.01, 0.02]);
        let plan = ScanPlan::from_grids(&[Parameter::Lethality], &grids).unwrap();
        let params = plan.parameters();
        let eval = LikelihoodEvaluator::new(&model, &params, ModelParameters::default());

        let outcome = fit_grid(&plan, &eval, &observed, None, ExecutionMode::Sequential).unwrap();
        assert_eq!(outcome.tensor.shape(), &[2]);
        let scores = outcome.tensor.as_slice();
        assert_ne!(scores[0], scores[1]);
    }

    #[test]
    fn evaluator_and_plan_must_agree() {
        let model = EpidemicModel::new(ModelSettings::default()).unwrap();
        let observed = ObservedSeries::new(vec![1], vec![0]).unwrap();
        let plan = plan_2x3();
        let wrong = [Parameter::R0Before, Parameter::Lethality];
        let eval = LikelihoodEvaluator::new(&model, &wrong, ModelParameters::default());
        assert!(fit_grid(&plan, &eval, &observed, None, ExecutionMode::Sequential).is_err());
    }
}
