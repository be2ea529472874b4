//! Configuration for case/control comparisons.
//!
//! Thresholds that differed between historical analysis scripts are explicit
//! fields here rather than literals in the comparison code. An analysis run is
//! described by [`AnalysisConfig`], usually loaded from a TOML file:
//!
//! ```toml
//! features = ["volume_of_grey_matter", "volume_of_white_matter"]
//! correction = "benjamini_hochberg"
//!
//! [comparator]
//! min_sample_for_normality_test = 4
//! large_sample_cutoff = 5000
//! normal_reference = "fitted"
//! ```

use crate::error::ConfigError;
use crate::testing::correction::Correction;
use crate::testing::inference::normality::NormalReference;
use crate::testing::{NORMALITY_LEVEL, SIGNIFICANCE_LEVEL};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Thresholds used by [`GroupComparator`](crate::testing::comparator::GroupComparator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorConfig {
    /// Smallest sample size on which a normality test is attempted. Smaller
    /// samples never count as normal.
    ///
    /// Default: 4 (a sample needs more than three values)
    pub min_sample_for_normality_test: usize,

    /// Sample size from which Kolmogorov-Smirnov replaces Shapiro-Wilk.
    ///
    /// Default: 5000
    pub large_sample_cutoff: usize,

    /// A sample is normal when its normality p-value exceeds this level.
    pub normality_alpha: f64,

    /// A comparison is significant when its p-value is below this level.
    pub significance_alpha: f64,

    /// Reference distribution for the large-sample Kolmogorov-Smirnov test.
    pub normal_reference: NormalReference,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            min_sample_for_normality_test: 4,
            large_sample_cutoff: 5000,
            normality_alpha: NORMALITY_LEVEL,
            significance_alpha: SIGNIFICANCE_LEVEL,
            normal_reference: NormalReference::Fitted,
        }
    }
}

impl ComparatorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Shapiro-Wilk is undefined below three observations
        if self.min_sample_for_normality_test < 3 {
            return Err(ConfigError::InvalidParameter(format!(
                "min_sample_for_normality_test must be >= 3, got {}",
                self.min_sample_for_normality_test
            )));
        }

        if self.large_sample_cutoff <= self.min_sample_for_normality_test {
            return Err(ConfigError::InvalidParameter(format!(
                "large_sample_cutoff ({}) must exceed min_sample_for_normality_test ({})",
                self.large_sample_cutoff, self.min_sample_for_normality_test
            )));
        }

        for (name, alpha) in [
            ("normality_alpha", self.normality_alpha),
            ("significance_alpha", self.significance_alpha),
        ] {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(ConfigError::InvalidParameter(format!(
                    "{name} must be in (0, 1), got {alpha}"
                )));
            }
        }

        Ok(())
    }
}

/// One analysis run: which columns to compare and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub comparator: ComparatorConfig,

    /// Columns to compare, in report order. `None` compares every column
    /// other than the identifier and label columns.
    pub features: Option<Vec<String>>,

    /// Subject identifier column.
    pub id_column: String,

    /// Case/control label column.
    pub label_column: String,

    /// Multiple-testing adjustment shown alongside raw p-values.
    pub correction: Correction,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            comparator: ComparatorConfig::default(),
            features: None,
            id_column: "eid".to_string(),
            label_column: "label".to_string(),
            correction: Correction::None,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.comparator.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn is_reserved(&self, column: &str) -> bool {
        column == self.id_column || column == self.label_column
    }

    /// Resolve the feature selection against a table header.
    ///
    /// Returns `(column index, column name)` pairs in selection order, or in
    /// header order when no explicit selection is configured.
    pub fn resolve_features<S: AsRef<str>>(
        &self,
        header: &[S],
    ) -> Result<Vec<(usize, String)>, ConfigError> {
        let resolved: Vec<(usize, String)> = match &self.features {
            None => header
                .iter()
                .enumerate()
                .map(|(i, name)| (i, name.as_ref()))
                .filter(|(_, name)| !self.is_reserved(name))
                .map(|(i, name)| (i, name.to_string()))
                .collect(),
            Some(selection) => {
                let mut seen = HashSet::with_capacity(selection.len());
                let mut resolved = Vec::with_capacity(selection.len());
                for feature in selection {
                    let feature = feature.trim();
                    if self.is_reserved(feature) {
                        return Err(ConfigError::ReservedFeature(feature.to_string()));
                    }
                    if !seen.insert(feature) {
                        return Err(ConfigError::DuplicateFeature(feature.to_string()));
                    }
                    let index = header
                        .iter()
                        .position(|column| column.as_ref() == feature)
                        .ok_or_else(|| ConfigError::UnknownFeature(feature.to_string()))?;
                    resolved.push((index, feature.to_string()));
                }
                resolved
            }
        };

        if resolved.is_empty() {
            return Err(ConfigError::EmptySelection);
        }
        Ok(resolved)
    }
}
