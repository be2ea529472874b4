//! Normality tests used to gate the choice between parametric and
//! non-parametric comparisons.
//!
//! - **Shapiro-Wilk**: Royston's AS R94 approximation of the W statistic and
//!   its p-value, for small and moderate samples.
//! - **Kolmogorov-Smirnov**: one-sample goodness of fit against a normal
//!   distribution, with the asymptotic Kolmogorov distribution, for large samples.

use crate::testing::TestResult;
use crate::testing::utils::{mean_and_variance, sorted};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

// Royston polynomial coefficients (AS R94)
const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

/// Reference distribution for the Kolmogorov-Smirnov normality test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalReference {
    /// Normal with the sample's own mean and standard deviation.
    #[default]
    Fitted,
    /// Standard normal N(0, 1).
    Standard,
}

/// Shapiro-Wilk test for normality.
///
/// Returns `None` for fewer than three observations, and when the range of
/// the sample or the statistic is not finite. A sample whose values are all
/// identical gets `W = 1, p = 1`.
pub fn shapiro_wilk(values: &[f64]) -> Option<TestResult<f64>> {
    let n = values.len();
    if n < 3 {
        return None;
    }

    let x = sorted(values);
    let range = x[n - 1] - x[0];
    if !range.is_finite() {
        return None;
    }
    if range <= 0.0 {
        return Some(TestResult::new(1.0, 1.0));
    }

    if n == 3 {
        let a = std::f64::consts::FRAC_1_SQRT_2;
        let w = (a * (x[2] - x[0])).powi(2) / sum_of_squares(&x);
        if !w.is_finite() {
            return None;
        }
        let w = w.clamp(0.75, 1.0);
        // Exact distribution for n = 3
        let p = 6.0 / std::f64::consts::PI * (w.sqrt().asin() - 0.75f64.sqrt().asin());
        return Some(TestResult::new(w, p.clamp(0.0, 1.0)));
    }

    let a = shapiro_wilk_coefficients(n)?;

    // Scale by the range first so wide-valued samples stay well conditioned
    let scaled: Vec<f64> = x.iter().map(|v| (v - x[0]) / range).collect();
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (scaled[n - 1 - i] - scaled[i]))
        .sum();
    let w = numerator * numerator / sum_of_squares(&scaled);
    if !w.is_finite() {
        return None;
    }
    let w = w.min(1.0);

    let p = shapiro_wilk_p_value(w, n);
    Some(TestResult::new(w, p.clamp(0.0, 1.0)).with_metadata("n", n as f64))
}

/// Half-vector of Shapiro-Wilk coefficients for the lower order statistics,
/// all positive, normalised so the full antisymmetric vector has unit length.
fn shapiro_wilk_coefficients(n: usize) -> Option<Vec<f64>> {
    let standard = Normal::new(0.0, 1.0).ok()?;
    let nn2 = n / 2;
    let an25 = n as f64 + 0.25;

    // Blom-type approximations of expected normal order statistics (positive half)
    let m: Vec<f64> = (1..=nn2)
        .map(|i| -standard.inverse_cdf((i as f64 - 0.375) / an25))
        .collect();
    let summ2 = 2.0 * m.iter().map(|mi| mi * mi).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / (n as f64).sqrt();

    let mut a = vec![0.0; nn2];
    a[0] = m[0] / ssumm2 + poly(&C1, rsn);

    let (first_free, fac_sq, one_minus) = if n > 5 {
        a[1] = m[1] / ssumm2 + poly(&C2, rsn);
        (
            2,
            summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1],
            1.0 - 2.0 * a[0] * a[0] - 2.0 * a[1] * a[1],
        )
    } else {
        (1, summ2 - 2.0 * m[0] * m[0], 1.0 - 2.0 * a[0] * a[0])
    };

    if fac_sq <= 0.0 || one_minus <= 0.0 {
        return None;
    }
    let fac = (fac_sq / one_minus).sqrt();
    for i in first_free..nn2 {
        a[i] = m[i] / fac;
    }

    Some(a)
}

fn shapiro_wilk_p_value(w: f64, n: usize) -> f64 {
    let w1 = 1.0 - w;
    if w1 <= 0.0 {
        return 1.0;
    }
    let y = w1.ln();
    let nf = n as f64;

    let (y, m, s) = if n <= 11 {
        let gamma = poly(&G, nf);
        if y >= gamma {
            return 0.0;
        }
        (-(gamma - y).ln(), poly(&C3, nf), poly(&C4, nf).exp())
    } else {
        let ln_n = nf.ln();
        (y, poly(&C5, ln_n), poly(&C6, ln_n).exp())
    };

    match Normal::new(m, s) {
        Ok(dist) => dist.sf(y),
        Err(_) => 0.0,
    }
}

/// One-sample Kolmogorov-Smirnov test against a normal distribution.
///
/// The statistic is the two-sided supremum distance `D`; the p-value is the
/// asymptotic Kolmogorov tail probability `P(K > sqrt(n) D)`. Returns `None`
/// for an empty sample or when the fitted moments are not finite. With
/// [`NormalReference::Fitted`], a constant sample gets `D = 0, p = 1`.
pub fn kolmogorov_smirnov_normal(
    values: &[f64],
    reference: NormalReference,
) -> Option<TestResult<f64>> {
    let n = values.len();
    if n == 0 {
        return None;
    }

    let (mean, sd) = match reference {
        NormalReference::Standard => (0.0, 1.0),
        NormalReference::Fitted => {
            let (mean, variance) = mean_and_variance(values);
            (mean, variance.sqrt())
        }
    };
    if !mean.is_finite() || sd.is_infinite() {
        return None;
    }
    if sd.is_nan() || sd <= 0.0 {
        return Some(TestResult::new(0.0, 1.0));
    }
    let dist = Normal::new(mean, sd).ok()?;

    let x = sorted(values);
    let nf = n as f64;
    let d = x
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let cdf = dist.cdf(v);
            let above = (i + 1) as f64 / nf - cdf;
            let below = cdf - i as f64 / nf;
            above.max(below)
        })
        .fold(0.0, f64::max);

    let p = kolmogorov_survival(nf.sqrt() * d);

    Some(
        TestResult::new(d, p)
            .with_metadata("n", nf)
            .with_metadata("reference_mean", mean)
            .with_metadata("reference_sd", sd),
    )
}

/// `P(K > lambda)` for the Kolmogorov distribution.
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda < 0.2 {
        return 1.0;
    }
    let mut sum = 0.0;
    for k in 1..=100 {
        let kf = k as f64;
        let term = (-2.0 * kf * kf * lambda * lambda).exp();
        sum += if k % 2 == 1 { term } else { -term };
        if term < 1e-16 {
            break;
        }
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

// c[0] + c[1] x + c[2] x^2 + ...
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci)
}

fn sum_of_squares(x: &[f64]) -> f64 {
    let mean = x.iter().sum::<f64>() / x.len() as f64;
    x.iter().map(|v| (v - mean) * (v - mean)).sum()
}
