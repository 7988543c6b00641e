/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn population_std_dev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let mean = mean(samples);
    let variance = samples
        .iter()
        .map(|s| (s - mean).powi(2))
        .sum::<f64>()
        / samples.len() as f64;
    variance.sqrt()
}
