use crate::testing::{Alternative, TestResult};
use single_utilities::traits::FloatOps;
use statrs::distribution::{ContinuousCDF, Normal};
use std::cmp::Ordering;

/// The exact null distribution of U is used when the smaller group has at
/// most this many observations and the pooled sample has no ties.
pub const EXACT_MAX_GROUP_SIZE: usize = 8;

/// Mann-Whitney U (Wilcoxon rank-sum) test.
///
/// The reported statistic is the U of the first sample,
/// `R_x - nx (nx + 1) / 2`, for every alternative. Tie-free comparisons where
/// either group has at most [`EXACT_MAX_GROUP_SIZE`] observations use the exact
/// distribution of U; everything else uses the normal approximation with
/// tie-corrected variance and a continuity correction of 0.5.
pub fn mann_whitney<T>(x: &[T], y: &[T], alternative: Alternative) -> TestResult<f64>
where
    T: FloatOps,
{
    let nx = x.len();
    let ny = y.len();

    if nx == 0 || ny == 0 {
        return TestResult::new(f64::NAN, 1.0); // Insufficient data
    }

    // Combine samples and assign group labels (0 for x, 1 for y)
    let mut combined: Vec<(f64, usize)> = Vec::with_capacity(nx + ny);
    combined.extend(x.iter().map(|v| (v.to_f64().unwrap_or(f64::NAN), 0)));
    combined.extend(y.iter().map(|v| (v.to_f64().unwrap_or(f64::NAN), 1)));

    combined.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    // Assign ranks (with ties averaged) and collect the tie correction term
    let n = combined.len();
    let mut rank_sum_x = 0.0;
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let val = combined[i].0;
        let mut j = i + 1;
        while j < n && combined[j].0 == val {
            j += 1;
        }

        let rank = (i + j - 1) as f64 / 2.0 + 1.0;
        let x_in_run = combined[i..j].iter().filter(|(_, g)| *g == 0).count();
        rank_sum_x += rank * x_in_run as f64;

        let t = (j - i) as f64;
        tie_term += t * t * t - t;

        i = j;
    }

    let nx_f = nx as f64;
    let ny_f = ny as f64;
    let n_f = n as f64;

    let u_x = rank_sum_x - nx_f * (nx_f + 1.0) / 2.0;
    let mean_u = nx_f * ny_f / 2.0;
    let var_u = nx_f * ny_f / 12.0 * ((n_f + 1.0) - tie_term / (n_f * (n_f - 1.0)));

    if nx.min(ny) <= EXACT_MAX_GROUP_SIZE && tie_term == 0.0 {
        let p_value = exact_p_value(u_x, nx, ny, alternative);
        return TestResult::new(u_x, p_value)
            .with_metadata("mean_u", mean_u)
            .with_metadata("exact", 1.0)
            .with_metadata("nx", nx_f)
            .with_metadata("ny", ny_f);
    }

    // Every observation tied: no rank information at all
    if var_u <= 0.0 {
        return TestResult::new(u_x, 1.0)
            .with_metadata("mean_u", mean_u)
            .with_metadata("var_u", 0.0);
    }

    let sd_u = var_u.sqrt();
    let correction = 0.5;

    let z = match alternative {
        Alternative::TwoSided => ((u_x - mean_u).abs() - correction) / sd_u,
        Alternative::Less => (u_x - mean_u + correction) / sd_u,
        Alternative::Greater => (u_x - mean_u - correction) / sd_u,
    };

    let normal = match Normal::new(0.0, 1.0) {
        Ok(normal) => normal,
        Err(_) => return TestResult::new(u_x, 1.0),
    };

    let p_value = match alternative {
        Alternative::TwoSided => 2.0 * normal.sf(z),
        Alternative::Less => normal.cdf(z),
        Alternative::Greater => normal.sf(z),
    };
    let p_value = p_value.clamp(0.0, 1.0);

    let effect_size = z / n_f.sqrt();

    TestResult::with_effect_size(u_x, p_value, effect_size)
        .with_standard_error(sd_u)
        .with_metadata("z_score", z)
        .with_metadata("mean_u", mean_u)
        .with_metadata("var_u", var_u)
        .with_metadata("nx", nx_f)
        .with_metadata("ny", ny_f)
}

fn exact_p_value(u: f64, nx: usize, ny: usize, alternative: Alternative) -> f64 {
    let counts = u_null_counts(nx.min(ny), nx.max(ny));
    let total: f64 = counts.iter().sum();
    // U is integral without ties
    let u = u.round().max(0.0) as usize;

    let lower: f64 = counts[..=u.min(counts.len() - 1)].iter().sum::<f64>() / total;
    let upper: f64 = counts[u.min(counts.len())..].iter().sum::<f64>() / total;

    let p = match alternative {
        Alternative::TwoSided => 2.0 * lower.min(upper),
        Alternative::Less => lower,
        Alternative::Greater => upper,
    };
    p.clamp(0.0, 1.0)
}

/// Number of rank arrangements giving each value of U under the null, for
/// groups of size `m <= n`.
///
/// These are the coefficients of the Gaussian binomial `[m + n choose m]`,
/// built as the product over `k = 1..=m` of `(1 - q^(n + k)) / (1 - q^k)`.
/// Each step multiplies by the numerator and divides by the denominator, so
/// the work is `O(m * m * n)` and the largest vector has `m * n + 1` entries.
fn u_null_counts(m: usize, n: usize) -> Vec<f64> {
    let mut counts = vec![1.0];
    for k in 1..=m {
        let degree = k * n;
        let mut next = vec![0.0; degree + 1];
        for (i, &c) in counts.iter().enumerate() {
            next[i] += c;
            if i + n + k <= degree {
                next[i + n + k] -= c;
            }
        }
        // Dividing by (1 - q^k) is a running sum with stride k
        for i in k..=degree {
            next[i] += next[i - k];
        }
        counts = next;
    }

    // Rounding error accumulates in the high tail; mirror the low half
    let len = counts.len();
    for i in 0..len / 2 {
        counts[len - 1 - i] = counts[i];
    }
    counts
}
