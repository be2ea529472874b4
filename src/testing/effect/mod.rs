use crate::testing::utils::mean_and_variance;

/// Calculate Cohen's d between two groups: `(mean(x) - mean(y)) / pooled_sd`.
///
/// Returns `None` when either group has fewer than two values or the pooled
/// standard deviation is zero.
pub fn cohens_d(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() < 2 || y.len() < 2 {
        return None;
    }

    let (mean1, var1) = mean_and_variance(x);
    let (mean2, var2) = mean_and_variance(y);

    // Calculate pooled standard deviation
    let n1 = x.len() as f64;
    let n2 = y.len() as f64;
    let pooled_sd = (((n1 - 1.0) * var1 + (n2 - 1.0) * var2) / (n1 + n2 - 2.0)).sqrt();

    if pooled_sd == 0.0 || !pooled_sd.is_finite() {
        return None;
    }

    Some((mean1 - mean2) / pooled_sd)
}

/// Calculate Hedge's g (bias-corrected effect size)
pub fn hedges_g(x: &[f64], y: &[f64]) -> Option<f64> {
    let d = cohens_d(x, y)?;

    let n = (x.len() + y.len()) as f64;
    let correction = 1.0 - 3.0 / (4.0 * (n - 2.0) - 1.0);

    Some(d * correction)
}
