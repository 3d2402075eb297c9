//! src/util/statistics.rs

/// Arithmetic mean. An empty slice yields `NaN`.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with `ddof` delta degrees of freedom.
///
/// A single observation has no spread and returns `0.0`.
pub fn stddev_ddof(values: &[f64], ddof: usize) -> f64 {
    if values.len() == 1 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    (sum_sq / (values.len() as f64 - ddof as f64)).sqrt()
}

/// Sample standard deviation (`ddof = 1`).
pub fn stddev(values: &[f64]) -> f64 {
    stddev_ddof(values, 1)
}
