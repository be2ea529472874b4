//! Parametric two-sample tests.
//!
//! The t-tests work from per-group moments, taken from raw slices or supplied
//! as precomputed summaries. Moments are computed in two passes (mean, then
//! squared deviations).

use crate::testing::utils::mean_and_variance;
use crate::testing::{TTestType, TestResult};
use single_utilities::traits::FloatOps;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Count, mean and unbiased variance of one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMoments {
    pub n: f64,
    pub mean: f64,
    pub variance: f64,
}

impl GroupMoments {
    pub fn from_values<T>(values: &[T]) -> Self
    where
        T: FloatOps,
    {
        let values: Vec<f64> = values
            .iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect();
        let (mean, variance) = mean_and_variance(&values);
        GroupMoments {
            n: values.len() as f64,
            mean,
            variance,
        }
    }
}

/// Perform a two-sided t-test comparing two samples.
///
/// This function performs either Student's t-test (assuming equal variances) or
/// Welch's t-test (allowing unequal variances). The statistic is signed as
/// `mean(x) - mean(y)`.
///
/// # Arguments
///
/// * `x` - First sample
/// * `y` - Second sample
/// * `test_type` - Type of t-test to perform
///
/// # Returns
///
/// `TestResult` containing the t-statistic, p-value and degrees of freedom.
/// Samples with fewer than two observations give `t = 0, p = 1`.
pub fn t_test<T>(x: &[T], y: &[T], test_type: TTestType) -> TestResult<f64>
where
    T: FloatOps,
{
    t_test_from_moments(
        GroupMoments::from_values(x),
        GroupMoments::from_values(y),
        test_type,
    )
}

/// Welch's unequal-variance t-test.
pub fn welch_t_test<T>(x: &[T], y: &[T]) -> TestResult<f64>
where
    T: FloatOps,
{
    t_test(x, y, TTestType::Welch)
}

/// Perform a t-test using precomputed group moments.
pub fn t_test_from_moments(
    group1: GroupMoments,
    group2: GroupMoments,
    test_type: TTestType,
) -> TestResult<f64> {
    let (n1, n2) = (group1.n, group2.n);

    // Early exit for insufficient sample sizes
    if n1 < 2.0 || n2 < 2.0 {
        return TestResult::new(0.0, 1.0);
    }

    let (var1, var2) = (group1.variance, group2.variance);
    let mean_diff = group1.mean - group2.mean;

    let (std_err, df) = match test_type {
        TTestType::Student => {
            let pooled_var = ((n1 - 1.0) * var1 + (n2 - 1.0) * var2) / (n1 + n2 - 2.0);
            ((pooled_var * (1.0 / n1 + 1.0 / n2)).sqrt(), n1 + n2 - 2.0)
        }
        TTestType::Welch => {
            let term1 = var1 / n1;
            let term2 = var2 / n2;
            let combined_var = term1 + term2;

            // Welch-Satterthwaite equation for degrees of freedom
            let df = combined_var * combined_var
                / (term1 * term1 / (n1 - 1.0) + term2 * term2 / (n2 - 1.0));
            (combined_var.sqrt(), df)
        }
    };

    // Both groups constant: identical means carry no evidence, distinct means are conclusive.
    if std_err == 0.0 {
        return if mean_diff == 0.0 {
            TestResult::new(0.0, 1.0).with_standard_error(0.0)
        } else {
            TestResult::new(mean_diff.signum() * f64::INFINITY, 0.0).with_standard_error(0.0)
        };
    }

    let t_stat = mean_diff / std_err;
    let p_value = two_sided_t_p_value(t_stat, df);

    TestResult::new(t_stat, p_value)
        .with_degrees_of_freedom(df)
        .with_standard_error(std_err)
        .with_metadata("mean_difference", mean_diff)
}

fn two_sided_t_p_value(t_stat: f64, df: f64) -> f64 {
    if t_stat.is_nan() {
        return 1.0;
    }
    if t_stat.is_infinite() {
        return 0.0;
    }
    if df <= 0.0 || !df.is_finite() {
        return 1.0;
    }

    match StudentsT::new(0.0, 1.0, df) {
        Ok(t_dist) => (2.0 * t_dist.sf(t_stat.abs())).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}
