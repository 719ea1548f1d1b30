/// `out[k] = values[k + 1] - values[k]`; empty for fewer than two values.
pub fn first_differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}
