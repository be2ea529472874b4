//! # cohort-statistics
//!
//! Case/control comparisons of biobank-derived brain volume features.
//!
//! For every feature, each cohort is first checked for normality (Shapiro-Wilk
//! for small and moderate samples, Kolmogorov-Smirnov for large ones). When
//! both cohorts look normal they are compared with Welch's t-test, otherwise
//! with the two-sided Mann-Whitney U test. Features with an empty cohort are
//! reported as skipped rather than dropped, so a run accounts for every
//! requested feature.
//!
//! ## Quick Start
//!
//! ```
//! use cohort_statistics::testing::comparator::{ComparisonOutcome, GroupComparator};
//! use cohort_statistics::testing::TestMethod;
//!
//! let comparator = GroupComparator::default();
//! let case = [10.0, 12.0, 11.0, 13.0, 10.0, 12.0];
//! let control = [20.0, 22.0, 21.0, 23.0, 20.0, 22.0];
//!
//! match comparator.compare("volume_of_grey_matter", &case, &control).unwrap() {
//!     ComparisonOutcome::Compared(result) => {
//!         assert_eq!(result.test_used, TestMethod::ParametricTTest);
//!         assert!(result.significant);
//!     }
//!     ComparisonOutcome::Skipped { .. } => unreachable!(),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - **[`testing`]**: the comparator, the underlying tests, batch runs over
//!   subject × feature tables, and multiple testing correction
//! - **[`config`]**: comparator thresholds and feature selection
//! - **[`report`]**: plain-text report of a run

pub mod config;
pub mod error;
pub mod report;
pub mod testing;

pub use config::{AnalysisConfig, ComparatorConfig};
pub use error::{ComparisonError, ConfigError};
pub use testing::batch::{BatchResults, BatchSummary, FeatureOutcome};
pub use testing::comparator::{
    ComparisonOutcome, ComparisonResult, GroupComparator, NormalityCheck, NormalityMethod,
    SkipReason,
};
pub use testing::inference::CohortStatTests;
pub use testing::utils::GroupLabel;
pub use testing::TestMethod;
