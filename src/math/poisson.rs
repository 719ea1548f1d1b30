//! Poisson deviance for count data.
//!
//! For an observed count `k` and expected count `μ`:
//!
//! `d(k, μ) = 2 [k ln(k/μ) - (k - μ)]`
//!
//! with the `k ln(k/μ)` term taken as 0 for `k = 0`. The deviance is
//! non-negative, zero only at `μ = k`, and grows with the discrepancy in
//! either direction.
//!
//! Numerical notes:
//! - Early in an outbreak the model can predict vanishingly small counts
//!   while the data already shows a few cases. `μ` is floored so that
//!   `ln(k/μ)` stays finite; the resulting penalty is large but bounded.

/// Smallest expected count used in the deviance.
pub const EXPECTED_FLOOR: f64 = 1e-8;

/// Deviance contribution of a single observation.
pub fn poisson_deviance(observed: f64, expected: f64) -> f64 {
    let mu = expected.max(EXPECTED_FLOOR);
    if observed <= 0.0 {
        return 2.0 * mu;
    }
    2.0 * (observed * (observed / mu).ln() - (observed - mu))
}

/// Summed deviance over paired observed/expected series.
///
/// Extra elements in the longer slice are ignored.
pub fn total_deviance(observed: &[u64], expected: &[f64]) -> f64 {
    observed
        .iter()
        .zip(expected)
        .map(|(&k, &mu)| poisson_deviance(k as f64, mu))
        .sum()
}
