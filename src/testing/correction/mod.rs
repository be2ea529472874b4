use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Multiple testing correction methods to control for false positives
/// when many features are compared in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correction {
    /// Raw p-values only.
    #[default]
    None,
    Bonferroni,
    Holm,
    BenjaminiHochberg,
}

impl Correction {
    /// Adjust `p_values` with this method. `None` returns them unchanged.
    pub fn adjust(&self, p_values: &[f64]) -> Result<Vec<f64>> {
        match self {
            Correction::None => {
                validate_p_values(p_values)?;
                Ok(p_values.to_vec())
            }
            Correction::Bonferroni => bonferroni_correction(p_values),
            Correction::Holm => holm_bonferroni_correction(p_values),
            Correction::BenjaminiHochberg => benjamini_hochberg_correction(p_values),
        }
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Correction::None => "none",
            Correction::Bonferroni => "Bonferroni",
            Correction::Holm => "Holm-Bonferroni",
            Correction::BenjaminiHochberg => "Benjamini-Hochberg",
        })
    }
}

fn validate_p_values(p_values: &[f64]) -> Result<()> {
    if p_values.is_empty() {
        return Err(anyhow!("Empty p-value array"));
    }

    for (i, &p) in p_values.iter().enumerate() {
        if !(0.0..=1.0).contains(&p) {
            return Err(anyhow!("Invalid p-value at index {}: {}", i, p));
        }
    }
    Ok(())
}

/// Indices of `p_values` in ascending p-value order.
fn ascending_order(p_values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p_values.len()).collect();
    order.sort_by(|&a, &b| {
        p_values[a]
            .partial_cmp(&p_values[b])
            .unwrap_or(Ordering::Equal)
    });
    order
}

/// Apply Bonferroni correction to p-values
///
/// Bonferroni correction is a simple but conservative method that multiplies
/// each p-value by the number of tests.
pub fn bonferroni_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len() as f64;

    // Multiply each p-value by n, capping at 1.0
    Ok(p_values.iter().map(|&p| (p * n).min(1.0)).collect())
}

/// Apply the Holm-Bonferroni step-down method for controlling family-wise error rate
pub fn holm_bonferroni_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len();

    let mut adjusted_p_values = vec![0.0; n];
    let mut running_max: f64 = 0.0;

    // Process from smallest to largest, enforcing monotonicity
    for (i, idx) in ascending_order(p_values).into_iter().enumerate() {
        let adjustment = (p_values[idx] * (n - i) as f64).min(1.0);
        running_max = running_max.max(adjustment);
        adjusted_p_values[idx] = running_max;
    }

    Ok(adjusted_p_values)
}

/// Apply Benjamini-Hochberg (BH) procedure for controlling false discovery rate
///
/// The BH procedure controls the false discovery rate (FDR), which is the expected
/// proportion of false positives among all rejected null hypotheses.
pub fn benjamini_hochberg_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len();
    let order = ascending_order(p_values);

    let mut adjusted_p_values = vec![0.0; n];
    let mut current_min: f64 = 1.0;

    // Process from largest to smallest p-value
    for (i, &idx) in order.iter().enumerate().rev() {
        let rank = i + 1;
        let adjustment = (p_values[idx] * n as f64 / rank as f64).min(1.0);
        current_min = adjustment.min(current_min);
        adjusted_p_values[idx] = current_min;
    }

    Ok(adjusted_p_values)
}
