//! Minimum projections of the score tensor.
//!
//! A projection onto axes `(i, j)` keeps those two axes and minimizes over all
//! others, so entry `[a, b]` is the best score reachable with parameter `i`
//! pinned to grid index `a` and parameter `j` pinned to `b`. Every projection
//! therefore shares the tensor's global minimum.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::Parameter;
use crate::error::AppError;
use crate::fit::search::ScoreTensor;

/// A 2-D slice keyed by the parameter pair it spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub axes: (usize, usize),
    pub parameters: (Parameter, Parameter),
    /// Rows follow axis `axes.0`, columns follow axis `axes.1`.
    pub scores: DMatrix<f64>,
}

/// Project `tensor` onto the axis pair `(axis_i, axis_j)`.
pub fn project_pair(
    tensor: &ScoreTensor,
    axis_i: usize,
    axis_j: usize,
) -> Result<DMatrix<f64>, AppError> {
    let ndim = tensor.ndim();
    if axis_i == axis_j || axis_i >= ndim || axis_j >= ndim {
        return Err(AppError::invalid_input(format!(
            "Cannot project a {ndim}-axis tensor onto axes ({axis_i}, {axis_j})."
        )));
    }
    let shape = tensor.shape();
    let mut out = DMatrix::from_element(shape[axis_i], shape[axis_j], f64::INFINITY);
    for (flat, &score) in tensor.as_slice().iter().enumerate() {
        let index = tensor.unravel(flat);
        let cell = &mut out[(index[axis_i], index[axis_j])];
        if score < *cell {
            *cell = score;
        }
    }
    Ok(out)
}

/// Every projection `(i, j)` with `i < j`, in lexicographic axis order.
pub fn project_all(tensor: &ScoreTensor, parameters: &[Parameter]) -> Result<Vec<Projection>, AppError> {
    if parameters.len() != tensor.ndim() {
        return Err(AppError::invalid_input(format!(
            "{} parameter names for a {}-axis tensor.",
            parameters.len(),
            tensor.ndim()
        )));
    }
    let mut out = Vec::new();
    for i in 0..tensor.ndim() {
        for j in (i + 1)..tensor.ndim() {
            out.push(Projection {
                axes: (i, j),
                parameters: (parameters[i], parameters[j]),
                scores: project_pair(tensor, i, j)?,
            });
        }
    }
    Ok(out)
}

/// Minimum over all axes but `axis`: the 1-D profile of one parameter.
pub fn profile(tensor: &ScoreTensor, axis: usize) -> Result<Vec<f64>, AppError> {
    if axis >= tensor.ndim() {
        return Err(AppError::invalid_input(format!(
            "Axis {axis} out of range for a {}-axis tensor.",
            tensor.ndim()
        )));
    }
    let mut out = vec![f64::INFINITY; tensor.shape()[axis]];
    for (flat, &score) in tensor.as_slice().iter().enumerate() {
        let a = tensor.unravel(flat)[axis];
        out[a] = out[a].min(score);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic, non-separable fill with a unique minimum at (1, 2, 3).
    fn tensor_3x4x5() -> ScoreTensor {
        ScoreTensor::from_fn(vec![3, 4, 5], |i| {
            let (a, b, c) = (i[0] as f64, i[1] as f64, i[2] as f64);
            (a - 1.0).powi(2) + 0.5 * (b - 2.0).powi(2) + 0.25 * (c - 3.0).powi(2) + 0.1 * a * c
        })
        .unwrap()
    }

    #[test]
    fn projections_share_the_global_minimum() {
        let t = tensor_3x4x5();
        let global = t.min();
        for (i, j) in [(0, 1), (0, 2), (1, 2)] {
            let p = project_pair(&t, i, j).unwrap();
            assert_eq!(p.min(), global, "pair ({i}, {j})");
        }
    }

    #[test]
    fn projection_cells_are_minima_over_the_reduced_axis() {
        let t = tensor_3x4x5();

        let p01 = project_pair(&t, 0, 1).unwrap();
        assert_eq!(p01.shape(), (3, 4));
        let manual = (0..5).map(|c| t.get(&[2, 1, c]).unwrap()).fold(f64::INFINITY, f64::min);
        assert_eq!(p01[(2, 1)], manual);

        let p02 = project_pair(&t, 0, 2).unwrap();
        assert_eq!(p02.shape(), (3, 5));
        let manual = (0..4).map(|b| t.get(&[0, b, 4]).unwrap()).fold(f64::INFINITY, f64::min);
        assert_eq!(p02[(0, 4)], manual);

        let p12 = project_pair(&t, 1, 2).unwrap();
        assert_eq!(p12.shape(), (4, 5));
        let manual = (0..3).map(|a| t.get(&[a, 3, 1]).unwrap()).fold(f64::INFINITY, f64::min);
        assert_eq!(p12[(3, 1)], manual);
    }

    #[test]
    fn reversed_pair_is_the_transpose() {
        let t = tensor_3x4x5();
        let p = project_pair(&t, 0, 2).unwrap();
        let q = project_pair(&t, 2, 0).unwrap();
        assert_eq!(p.transpose(), q);
    }

    #[test]
    fn two_axis_projection_is_the_tensor_itself() {
        let t = ScoreTensor::from_fn(vec![2, 3], |i| (i[0] * 3 + i[1]) as f64).unwrap();
        let p = project_pair(&t, 0, 1).unwrap();
        for a in 0..2 {
            for b in 0..3 {
                assert_eq!(p[(a, b)], t.get(&[a, b]).unwrap());
            }
        }
    }

    #[test]
    fn project_all_enumerates_pairs_in_order() {
        let t = tensor_3x4x5();
        let names = [Parameter::Lethality, Parameter::BurnIn, Parameter::R0Before];
        let all = project_all(&t, &names).unwrap();
        let axes: Vec<_> = all.iter().map(|p| p.axes).collect();
        assert_eq!(axes, vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(all[2].parameters, (Parameter::BurnIn, Parameter::R0Before));

        let one_axis = ScoreTensor::new(vec![2], vec![1.0, 0.5]).unwrap();
        assert!(project_all(&one_axis, &[Parameter::Lethality]).unwrap().is_empty());
    }

    #[test]
    fn invalid_axes_are_rejected() {
        let t = tensor_3x4x5();
        assert!(project_pair(&t, 1, 1).is_err());
        assert!(project_pair(&t, 0, 3).is_err());
        assert!(project_all(&t, &[Parameter::Lethality]).is_err());
    }

    #[test]
    fn profile_minimizes_other_axes() {
        let t = tensor_3x4x5();
        let prof = profile(&t, 1).unwrap();
        assert_eq!(prof.len(), 4);
        let global = t.min();
        assert_eq!(prof.iter().copied().fold(f64::INFINITY, f64::min), global);
        assert!(profile(&t, 3).is_err());
    }

    #[test]
    fn projection_does_not_modify_the_tensor() {
        let t = tensor_3x4x5();
        let before = t.clone();
        let _ = project_all(&t, &[Parameter::Lethality, Parameter::BurnIn, Parameter::R0Before]);
        assert_eq!(t, before);
    }
}
