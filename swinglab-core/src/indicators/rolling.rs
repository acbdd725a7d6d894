//! Centered rolling extremum with windows clipped at the series edges.
//!
//! For bar t the window is `[t - w, t + w]` intersected with the series, so the
//! first and last `w` bars still get a value computed from the bars available.

/// Maximum of `values` over the clipped centered window of half-width `half_window`.
pub fn centered_max(values: &[f64], half_window: usize) -> Vec<f64> {
    centered_fold(values, half_window, f64::NEG_INFINITY, f64::max)
}

/// Minimum of `values` over the clipped centered window of half-width `half_window`.
pub fn centered_min(values: &[f64], half_window: usize) -> Vec<f64> {
    centered_fold(values, half_window, f64::INFINITY, f64::min)
}

fn centered_fold(values: &[f64], half_window: usize, init: f64, f: fn(f64, f64) -> f64) -> Vec<f64> {
    let n = values.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half_window);
            let hi = i.saturating_add(half_window).min(n - 1);
            values[lo..=hi].iter().copied().fold(init, f)
        })
        .collect()
}
