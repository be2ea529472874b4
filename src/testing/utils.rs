use serde::{Deserialize, Serialize};
use std::fmt;

/// Cohort membership of a subject row.
///
/// Subjects present in the imaging table but absent from the case/control
/// label file are `Other` and never reach a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupLabel {
    Case,
    Control,
    Other,
}

impl GroupLabel {
    /// Parse a label cell. Anything but "case" or "control" (trimmed,
    /// case-insensitive) is `Other`, including an empty cell.
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("case") {
            GroupLabel::Case
        } else if label.eq_ignore_ascii_case("control") {
            GroupLabel::Control
        } else {
            GroupLabel::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupLabel::Case => "case",
            GroupLabel::Control => "control",
            GroupLabel::Other => "other",
        }
    }
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a full label column, treating missing cells as `Other`.
pub fn parse_labels<S: AsRef<str>>(labels: &[Option<S>]) -> Vec<GroupLabel> {
    labels
        .iter()
        .map(|label| match label {
            Some(label) => GroupLabel::parse(label.as_ref()),
            None => GroupLabel::Other,
        })
        .collect()
}

/// Get row indices for the case and control groups
pub fn get_group_indices(labels: &[GroupLabel]) -> (Vec<usize>, Vec<usize>) {
    let case_indices = labels
        .iter()
        .enumerate()
        .filter_map(|(i, &g)| if g == GroupLabel::Case { Some(i) } else { None })
        .collect();

    let control_indices = labels
        .iter()
        .enumerate()
        .filter_map(|(i, &g)| if g == GroupLabel::Control { Some(i) } else { None })
        .collect();

    (case_indices, control_indices)
}

/// Arithmetic mean and unbiased (n - 1) variance, computed in two passes.
pub(crate) fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, f64::NAN);
    }
    let ss: f64 = values.iter().map(|&v| (v - mean) * (v - mean)).sum();
    (mean, ss / (n - 1) as f64)
}

pub(crate) fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}
