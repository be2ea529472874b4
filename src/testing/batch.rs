//! Ordered per-feature outcomes of a comparison run.

use crate::error::ComparisonError;
use crate::testing::comparator::{ComparisonOutcome, ComparisonResult, GroupComparator, SkipReason};
use crate::testing::correction::Correction;
use single_utilities::traits::FloatOps;
use tracing::{info, warn};

/// Outcome of one feature, tagged with its position in the input order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureOutcome {
    pub index: usize,
    pub feature_name: String,
    pub outcome: Result<ComparisonOutcome, ComparisonError>,
}

impl FeatureOutcome {
    pub fn result(&self) -> Option<&ComparisonResult> {
        self.outcome.as_ref().ok().and_then(ComparisonOutcome::result)
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.outcome.as_ref().ok().and_then(ComparisonOutcome::skip_reason)
    }

    pub fn error(&self) -> Option<&ComparisonError> {
        self.outcome.as_ref().err()
    }
}

/// Counts of a batch run; `compared + skipped + failed == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub compared: usize,
    pub skipped: usize,
    pub failed: usize,
    pub significant: usize,
}

/// Exactly one outcome per input feature, in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchResults {
    outcomes: Vec<FeatureOutcome>,
}

impl BatchResults {
    /// Build from outcomes in any order; they are re-sorted by input index.
    pub fn from_outcomes(mut outcomes: Vec<FeatureOutcome>) -> Self {
        outcomes.sort_by_key(|o| o.index);
        BatchResults { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[FeatureOutcome] {
        &self.outcomes
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureOutcome> {
        self.outcomes.iter()
    }

    pub fn compared(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.outcomes.iter().filter_map(FeatureOutcome::result)
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, SkipReason)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.skip_reason().map(|r| (o.feature_name.as_str(), r)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &ComparisonError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error().map(|e| (o.feature_name.as_str(), e)))
    }

    pub fn significant(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.compared().filter(|r| r.significant)
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.len(),
            compared: self.compared().count(),
            skipped: self.skipped().count(),
            failed: self.failed().count(),
            significant: self.significant().count(),
        }
    }

    /// Adjusted p-values over the compared features, aligned with [`Self::compared`].
    pub fn adjusted_p_values(&self, correction: Correction) -> anyhow::Result<Vec<f64>> {
        let p_values: Vec<f64> = self.compared().map(|r| r.p_value).collect();
        if p_values.is_empty() {
            return Ok(Vec::new());
        }
        correction.adjust(&p_values)
    }

    /// Emit one log event per skipped or failed feature, then the summary.
    pub fn log_outcomes(&self) {
        for (feature, reason) in self.skipped() {
            info!(feature, %reason, "skipping feature");
        }
        for (feature, error) in self.failed() {
            warn!(feature, %error, "feature comparison failed");
        }
        let summary = self.summary();
        info!(
            total = summary.total,
            compared = summary.compared,
            skipped = summary.skipped,
            failed = summary.failed,
            significant = summary.significant,
            "comparison run finished"
        );
    }
}

/// Compare already-extracted samples, one `(feature, case, control)` triple
/// per feature, sequentially and in order.
pub fn compare_samples<'a, T, I>(comparator: &GroupComparator, features: I) -> BatchResults
where
    T: FloatOps + 'a,
    I: IntoIterator<Item = (&'a str, &'a [T], &'a [T])>,
{
    let outcomes = features
        .into_iter()
        .enumerate()
        .map(|(index, (feature_name, case, control))| FeatureOutcome {
            index,
            feature_name: feature_name.to_string(),
            outcome: comparator.compare(feature_name, case, control),
        })
        .collect();

    let results = BatchResults::from_outcomes(outcomes);
    results.log_outcomes();
    results
}
