//! Normality-gated two-sample comparison of one feature between cases and controls.
//!
//! Each group is checked for normality on its own. When both pass, the groups
//! are compared with Welch's t-test; otherwise with the two-sided Mann-Whitney
//! U test. The comparison is a pure function of the two samples and the
//! [`ComparatorConfig`], so repeated calls return bit-identical results.

use crate::config::ComparatorConfig;
use crate::error::{ComparisonError, ConfigError};
use crate::testing::effect::cohens_d;
use crate::testing::inference::nonparametric::mann_whitney;
use crate::testing::inference::normality::{kolmogorov_smirnov_normal, shapiro_wilk};
use crate::testing::inference::parametric::welch_t_test;
use crate::testing::utils::GroupLabel;
use crate::testing::{Alternative, TestMethod};
use single_utilities::traits::FloatOps;
use std::fmt;
use tracing::debug;

/// Which normality test, if any, was run on a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalityMethod {
    /// Too few observations to assess normality.
    NotAssessed,
    ShapiroWilk,
    KolmogorovSmirnov,
}

impl fmt::Display for NormalityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NormalityMethod::NotAssessed => "not assessed",
            NormalityMethod::ShapiroWilk => "Shapiro-Wilk",
            NormalityMethod::KolmogorovSmirnov => "Kolmogorov-Smirnov",
        })
    }
}

/// Outcome of the normality gate for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalityCheck {
    pub method: NormalityMethod,
    pub sample_size: usize,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    /// True when the sample may be treated as normal.
    pub passed: bool,
}

impl NormalityCheck {
    fn not_assessed(sample_size: usize) -> Self {
        NormalityCheck {
            method: NormalityMethod::NotAssessed,
            sample_size,
            statistic: None,
            p_value: None,
            passed: false,
        }
    }
}

/// Result of comparing one feature between cases and controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub feature_name: String,
    pub test_used: TestMethod,
    /// Welch t (case minus control) or the Mann-Whitney U of the case sample.
    pub statistic: f64,
    pub p_value: f64,
    pub case_count: usize,
    pub control_count: usize,
    pub significant: bool,
    pub case_normality: NormalityCheck,
    pub control_normality: NormalityCheck,
    /// Welch-Satterthwaite degrees of freedom, parametric path only.
    pub degrees_of_freedom: Option<f64>,
    /// Cohen's d of case versus control.
    pub effect_size: Option<f64>,
}

/// Why a feature produced no comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyCaseSample,
    EmptyControlSample,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::EmptyCaseSample => "empty case sample",
            SkipReason::EmptyControlSample => "empty control sample",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonOutcome {
    Compared(ComparisonResult),
    Skipped {
        feature_name: String,
        reason: SkipReason,
    },
}

impl ComparisonOutcome {
    pub fn feature_name(&self) -> &str {
        match self {
            ComparisonOutcome::Compared(result) => &result.feature_name,
            ComparisonOutcome::Skipped { feature_name, .. } => feature_name,
        }
    }

    pub fn result(&self) -> Option<&ComparisonResult> {
        match self {
            ComparisonOutcome::Compared(result) => Some(result),
            ComparisonOutcome::Skipped { .. } => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            ComparisonOutcome::Compared(_) => None,
            ComparisonOutcome::Skipped { reason, .. } => Some(*reason),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ComparisonOutcome::Skipped { .. })
    }
}

/// Stateless case/control comparator; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct GroupComparator {
    config: ComparatorConfig,
}

impl GroupComparator {
    pub fn new(config: ComparatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(GroupComparator { config })
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Run the normality gate on one sample of finite values.
    pub fn check_normality(&self, sample: &[f64]) -> NormalityCheck {
        let n = sample.len();
        if n < self.config.min_sample_for_normality_test {
            return NormalityCheck::not_assessed(n);
        }

        let (method, test) = if n < self.config.large_sample_cutoff {
            (NormalityMethod::ShapiroWilk, shapiro_wilk(sample))
        } else {
            (
                NormalityMethod::KolmogorovSmirnov,
                kolmogorov_smirnov_normal(sample, self.config.normal_reference),
            )
        };

        match test {
            Some(test) => NormalityCheck {
                method,
                sample_size: n,
                statistic: Some(test.statistic),
                p_value: Some(test.p_value),
                passed: test.p_value > self.config.normality_alpha,
            },
            None => NormalityCheck::not_assessed(n),
        }
    }

    /// Compare one feature between a case and a control sample.
    ///
    /// Missing values must already be removed. Any non-finite value left in
    /// either sample fails the comparison with [`ComparisonError::InvalidInput`];
    /// an empty sample yields [`ComparisonOutcome::Skipped`].
    pub fn compare<T>(
        &self,
        feature_name: &str,
        case_sample: &[T],
        control_sample: &[T],
    ) -> Result<ComparisonOutcome, ComparisonError>
    where
        T: FloatOps,
    {
        let case = finite_values(feature_name, GroupLabel::Case, case_sample)?;
        let control = finite_values(feature_name, GroupLabel::Control, control_sample)?;

        let skip = if case.is_empty() {
            Some(SkipReason::EmptyCaseSample)
        } else if control.is_empty() {
            Some(SkipReason::EmptyControlSample)
        } else {
            None
        };
        if let Some(reason) = skip {
            return Ok(ComparisonOutcome::Skipped {
                feature_name: feature_name.to_string(),
                reason,
            });
        }

        let case_normality = self.check_normality(&case);
        let control_normality = self.check_normality(&control);

        let test_used = if case_normality.passed && control_normality.passed {
            TestMethod::ParametricTTest
        } else {
            TestMethod::NonParametricRankSum
        };

        debug!(
            feature = feature_name,
            case_normality_p = ?case_normality.p_value,
            control_normality_p = ?control_normality.p_value,
            test = %test_used,
            "normality gate decided"
        );

        let test = match test_used {
            TestMethod::ParametricTTest => welch_t_test(&case, &control),
            TestMethod::NonParametricRankSum => {
                mann_whitney(&case, &control, Alternative::TwoSided)
            }
        };

        Ok(ComparisonOutcome::Compared(ComparisonResult {
            feature_name: feature_name.to_string(),
            test_used,
            statistic: test.statistic,
            p_value: test.p_value,
            case_count: case.len(),
            control_count: control.len(),
            significant: test.p_value < self.config.significance_alpha,
            case_normality,
            control_normality,
            degrees_of_freedom: test.degrees_of_freedom,
            effect_size: cohens_d(&case, &control),
        }))
    }
}

fn finite_values<T>(
    feature: &str,
    group: GroupLabel,
    sample: &[T],
) -> Result<Vec<f64>, ComparisonError>
where
    T: FloatOps,
{
    sample
        .iter()
        .enumerate()
        .map(|(position, v)| {
            let value = v.to_f64().unwrap_or(f64::NAN);
            if value.is_finite() {
                Ok(value)
            } else {
                Err(ComparisonError::InvalidInput {
                    feature: feature.to_string(),
                    group,
                    position,
                    value,
                })
            }
        })
        .collect()
}
