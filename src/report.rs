//! Plain-text rendering of a comparison run.
//!
//! One block per compared feature, then the skipped and failed features and
//! the list of significant features. Block layout:
//!
//! ```text
//! Feature: volume_of_grey_matter
//! Test: T-Test
//! Statistic: -3.214113052729311
//! P-value: 0.0014120983712840032
//! Cases: 112, Controls: 4021
//! Normality: case Shapiro-Wilk (p = 0.3127), control Kolmogorov-Smirnov (p = 0.0831)
//! ==================================================
//! ```
//!
//! Statistic and p-value are printed at full precision; normality p-values
//! are rounded to four decimals. With a correction, an
//! `Adjusted P-value (<method>): <value>` line follows the raw p-value.

use crate::testing::batch::BatchResults;
use crate::testing::correction::Correction;
use std::fmt::Write;

const SEPARATOR_WIDTH: usize = 50;

pub fn render_text_report(results: &BatchResults, correction: Correction) -> anyhow::Result<String> {
    let adjusted = results.adjusted_p_values(correction)?;
    let mut out = String::new();

    writeln!(out, "Statistical Comparison of Case and Control")?;
    writeln!(out)?;

    for (i, result) in results.compared().enumerate() {
        writeln!(out, "Feature: {}", result.feature_name)?;
        writeln!(out, "Test: {}", result.test_used)?;
        writeln!(out, "Statistic: {}", result.statistic)?;
        writeln!(out, "P-value: {}", result.p_value)?;
        if correction != Correction::None {
            writeln!(out, "Adjusted P-value ({}): {}", correction, adjusted[i])?;
        }
        writeln!(
            out,
            "Cases: {}, Controls: {}",
            result.case_count, result.control_count
        )?;
        writeln!(
            out,
            "Normality: case {} (p = {}), control {} (p = {})",
            result.case_normality.method,
            format_optional(result.case_normality.p_value),
            result.control_normality.method,
            format_optional(result.control_normality.p_value),
        )?;
        writeln!(out, "{}", "=".repeat(SEPARATOR_WIDTH))?;
    }

    let skipped: Vec<_> = results.skipped().collect();
    if !skipped.is_empty() {
        writeln!(out)?;
        writeln!(out, "Skipped features:")?;
        for (feature, reason) in skipped {
            writeln!(out, "  {}: {}", feature, reason)?;
        }
    }

    let failed: Vec<_> = results.failed().collect();
    if !failed.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failed features:")?;
        for (feature, error) in failed {
            writeln!(out, "  {}: {}", feature, error)?;
        }
    }

    writeln!(out)?;
    let significant: Vec<_> = results.significant().collect();
    if significant.is_empty() {
        writeln!(out, "No significant differences were found.")?;
    } else {
        writeln!(out, "Significant differences found:")?;
        for result in significant {
            writeln!(
                out,
                "  {}: {} p = {:.4}",
                result.feature_name, result.test_used, result.p_value
            )?;
        }
    }

    let summary = results.summary();
    writeln!(
        out,
        "Features: {} total, {} compared, {} skipped, {} failed",
        summary.total, summary.compared, summary.skipped, summary.failed
    )?;

    Ok(out)
}

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "n/a".to_string(),
    }
}
