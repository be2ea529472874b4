// End-to-end behaviour of case/control comparisons: the comparator contract,
// batch runs over dense and sparse subject × feature tables, configuration,
// and the text report.

use approx::assert_relative_eq;
use cohort_statistics::config::{AnalysisConfig, ComparatorConfig};
use cohort_statistics::error::{ComparisonError, ConfigError};
use cohort_statistics::report::render_text_report;
use cohort_statistics::testing::batch::compare_samples;
use cohort_statistics::testing::comparator::{
    ComparisonOutcome, ComparisonResult, GroupComparator, NormalityMethod, SkipReason,
};
use cohort_statistics::testing::correction::Correction;
use cohort_statistics::testing::inference::CohortStatTests;
use cohort_statistics::testing::inference::normality::NormalReference;
use cohort_statistics::testing::utils::GroupLabel;
use cohort_statistics::testing::TestMethod;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use ndarray::Array2;

fn compared(outcome: ComparisonOutcome) -> ComparisonResult {
    match outcome {
        ComparisonOutcome::Compared(result) => result,
        ComparisonOutcome::Skipped { feature_name, reason } => {
            panic!("{feature_name} was skipped: {reason}")
        }
    }
}

#[cfg(test)]
mod comparator_scenarios {
    use super::*;

    #[test]
    fn separated_normal_groups_use_t_test() {
        let comparator = GroupComparator::default();
        let case = [10.0, 12.0, 11.0, 13.0, 10.0, 12.0];
        let control = [20.0, 22.0, 21.0, 23.0, 20.0, 22.0];

        let result = compared(comparator.compare("volume", &case, &control).unwrap());

        assert_eq!(result.test_used, TestMethod::ParametricTTest);
        assert!(result.case_normality.passed);
        assert!(result.control_normality.passed);
        assert_eq!(result.case_normality.method, NormalityMethod::ShapiroWilk);
        assert!(result.p_value < 1e-6, "p = {}", result.p_value);
        assert!(result.significant);
        assert!(result.statistic < 0.0);
        assert_eq!((result.case_count, result.control_count), (6, 6));
        assert!(result.degrees_of_freedom.is_some());
        // both groups have variance 7.333 / 5
        let pooled_sd = (22.0f64 / 3.0 / 5.0).sqrt();
        assert_relative_eq!(result.effect_size.unwrap(), -10.0 / pooled_sd, epsilon = 1e-9);
    }

    #[test]
    fn single_case_never_uses_t_test() {
        let comparator = GroupComparator::default();
        let result = compared(
            comparator
                .compare("volume", &[5.0], &[1.0, 2.0, 3.0, 4.0, 5.0])
                .unwrap(),
        );

        assert_eq!(result.test_used, TestMethod::NonParametricRankSum);
        assert_eq!(result.case_normality.method, NormalityMethod::NotAssessed);
        assert!(!result.case_normality.passed);
        assert_eq!(result.case_count, 1);
        assert!(result.degrees_of_freedom.is_none());
    }

    #[test]
    fn few_cases_against_many_controls_use_exact_rank_sum() {
        let comparator = GroupComparator::default();
        let case = [1.5, 2.5, 3.5];
        let control: Vec<f64> = (0..40).map(|i| i as f64 + 0.1).collect();

        let result = compared(comparator.compare("volume", &case, &control).unwrap());

        assert_eq!(result.test_used, TestMethod::NonParametricRankSum);
        assert_eq!(result.statistic, 9.0);
        assert_relative_eq!(result.p_value, 0.008589255327769224, epsilon = 1e-12);
        assert!(result.significant);
    }

    #[test]
    fn overflowing_sample_is_not_assessed_for_normality() {
        let comparator = GroupComparator::default();
        let case = [-f64::MAX, -1.0, 1.0, f64::MAX];
        let control = [10.0, 12.0, 11.0, 13.0, 10.0, 12.0];

        let result = compared(comparator.compare("volume", &case, &control).unwrap());

        assert_eq!(result.case_normality.method, NormalityMethod::NotAssessed);
        assert!(!result.case_normality.passed);
        assert_eq!(result.test_used, TestMethod::NonParametricRankSum);
    }

    #[test]
    fn empty_case_sample_is_skipped() {
        let comparator = GroupComparator::default();
        let outcome = comparator
            .compare::<f64>("volume", &[], &[1.0, 2.0, 3.0])
            .unwrap();

        assert_eq!(
            outcome,
            ComparisonOutcome::Skipped {
                feature_name: "volume".to_string(),
                reason: SkipReason::EmptyCaseSample,
            }
        );
        assert_eq!(SkipReason::EmptyCaseSample.to_string(), "empty case sample");
    }

    #[test]
    fn empty_control_sample_is_skipped() {
        let comparator = GroupComparator::default();
        let outcome = comparator
            .compare::<f64>("volume", &[1.0, 2.0], &[])
            .unwrap();
        assert_eq!(outcome.skip_reason(), Some(SkipReason::EmptyControlSample));
        assert_eq!(outcome.feature_name(), "volume");
    }

    #[test]
    fn narrow_normal_samples_use_t_test() {
        let offsets = [-0.002, -0.001, 0.0, 0.001, 0.002];
        let case: Vec<f64> = offsets.iter().map(|o| 100.0 + o).collect();
        let control: Vec<f64> = offsets.iter().map(|o| 200.0 + o).collect();

        let result = compared(GroupComparator::default().compare("v", &case, &control).unwrap());
        assert_eq!(result.test_used, TestMethod::ParametricTTest);
        assert!(result.significant);
    }

    #[test]
    fn three_values_never_qualify_as_normal() {
        let comparator = GroupComparator::default();
        let result = compared(
            comparator
                .compare("v", &[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0, 7.0, 5.0])
                .unwrap(),
        );
        assert_eq!(result.test_used, TestMethod::NonParametricRankSum);
    }

    #[test]
    fn lower_threshold_allows_three_value_samples() {
        let config = ComparatorConfig {
            min_sample_for_normality_test: 3,
            ..ComparatorConfig::default()
        };
        let comparator = GroupComparator::new(config).unwrap();
        let result = compared(
            comparator
                .compare("v", &[1.0, 2.0, 3.0], &[11.0, 12.0, 13.0])
                .unwrap(),
        );
        assert_eq!(result.case_normality.method, NormalityMethod::ShapiroWilk);
        assert_eq!(result.test_used, TestMethod::ParametricTTest);
    }

    #[test]
    fn skewed_sample_falls_back_to_rank_sum() {
        let case = [0.1, 0.2, 0.3, 0.5, 0.8, 1.3, 2.1, 3.4, 5.5, 8.9, 14.4, 23.3];
        let control = [10.0, 12.0, 11.0, 13.0, 10.0, 12.0];

        let result = compared(GroupComparator::default().compare("v", &case, &control).unwrap());

        assert!(!result.case_normality.passed);
        assert_eq!(result.test_used, TestMethod::NonParametricRankSum);
        assert_eq!(result.test_used.to_string(), "Mann-Whitney U Test");
    }

    #[test]
    fn large_samples_use_kolmogorov_smirnov() {
        let case: Vec<f64> = (0..5000).map(|i| (i % 100) as f64).collect();
        let control: Vec<f64> = (0..10).map(|i| i as f64).collect();

        let comparator = GroupComparator::default();
        let result = compared(comparator.compare("v", &case, &control).unwrap());

        assert_eq!(result.case_normality.method, NormalityMethod::KolmogorovSmirnov);
        assert_eq!(result.control_normality.method, NormalityMethod::ShapiroWilk);
    }

    #[test]
    fn non_finite_values_are_invalid_input() {
        let comparator = GroupComparator::default();
        let err = comparator
            .compare("v", &[1.0, 2.0, 3.0], &[1.0, f64::INFINITY])
            .unwrap_err();

        match err {
            ComparisonError::InvalidInput {
                feature,
                group,
                position,
                value,
            } => {
                assert_eq!(feature, "v");
                assert_eq!(group, GroupLabel::Control);
                assert_eq!(position, 1);
                assert_eq!(value, f64::INFINITY);
            }
        }

        // Validation runs before the empty-sample check
        assert!(comparator.compare("v", &[], &[f64::NAN]).is_err());
    }

    #[test]
    fn repeated_comparisons_are_bitwise_identical() {
        let comparator = GroupComparator::default();
        let case = [3.1, 2.7, 3.3, 2.9, 3.8, 3.0, 2.6];
        let control = [2.1, 2.4, 1.9, 2.8, 2.2, 2.0, 2.5, 2.3];

        let first = compared(comparator.compare("v", &case, &control).unwrap());
        let second = compared(comparator.compare("v", &case, &control).unwrap());

        assert_eq!(first.test_used, second.test_used);
        assert_eq!(first.statistic.to_bits(), second.statistic.to_bits());
        assert_eq!(first.p_value.to_bits(), second.p_value.to_bits());
    }
}

#[cfg(test)]
mod comparator_properties {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(-1.0e3f64..1.0e3, 0..40)
    }

    proptest! {
        #[test]
        fn every_input_yields_a_result_or_a_skip(case in sample(), control in sample()) {
            let outcome = GroupComparator::default().compare("f", &case, &control).unwrap();
            match outcome {
                ComparisonOutcome::Compared(result) => {
                    prop_assert!(!case.is_empty() && !control.is_empty());
                    prop_assert!((0.0..=1.0).contains(&result.p_value));
                    prop_assert_eq!(result.significant, result.p_value < 0.05);
                    prop_assert_eq!(result.case_count, case.len());
                    prop_assert_eq!(result.control_count, control.len());
                    if case.len() < 4 || control.len() < 4 {
                        prop_assert_eq!(result.test_used, TestMethod::NonParametricRankSum);
                    }
                    if result.test_used == TestMethod::ParametricTTest {
                        prop_assert!(result.case_normality.passed && result.control_normality.passed);
                    }
                }
                ComparisonOutcome::Skipped { reason, .. } => {
                    let expected = if case.is_empty() {
                        SkipReason::EmptyCaseSample
                    } else {
                        SkipReason::EmptyControlSample
                    };
                    prop_assert!(case.is_empty() || control.is_empty());
                    prop_assert_eq!(reason, expected);
                }
            }
        }

        #[test]
        fn comparisons_are_deterministic(case in sample(), control in sample()) {
            let comparator = GroupComparator::default();
            let first = comparator.compare("f", &case, &control).unwrap();
            let second = comparator.compare("f", &case, &control).unwrap();
            match (first.result(), second.result()) {
                (Some(a), Some(b)) => {
                    prop_assert_eq!(a.test_used, b.test_used);
                    prop_assert_eq!(a.statistic.to_bits(), b.statistic.to_bits());
                    prop_assert_eq!(a.p_value.to_bits(), b.p_value.to_bits());
                }
                (None, None) => {}
                _ => prop_assert!(false, "outcome kind changed between calls"),
            }
        }

        #[test]
        fn batch_preserves_feature_order(
            samples in prop::collection::vec((sample(), sample()), 1..12)
        ) {
            let names: Vec<String> = (0..samples.len()).map(|i| format!("feature_{i}")).collect();
            let features: Vec<(&str, &[f64], &[f64])> = names
                .iter()
                .zip(&samples)
                .map(|(name, (case, control))| (name.as_str(), case.as_slice(), control.as_slice()))
                .collect();

            let results = compare_samples(&GroupComparator::default(), features);

            prop_assert_eq!(results.len(), samples.len());
            for (i, outcome) in results.iter().enumerate() {
                prop_assert_eq!(outcome.index, i);
                prop_assert_eq!(&outcome.feature_name, &names[i]);
            }
            let summary = results.summary();
            prop_assert_eq!(summary.compared + summary.skipped + summary.failed, summary.total);
        }
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;

    fn labels() -> Vec<GroupLabel> {
        let mut labels = vec![GroupLabel::Case; 6];
        labels.extend(vec![GroupLabel::Control; 5]);
        labels.push(GroupLabel::Other);
        labels
    }

    /// 12 subjects × 4 features: separated volumes, no case measurements,
    /// an infinite control value, and identical cohorts.
    fn dense_table() -> Array2<f64> {
        let separated = [10.0, 12.0, 11.0, 13.0, 10.0, 12.0, 20.0, 22.0, 21.0, 23.0, 20.0, 1000.0];
        let mut table = Array2::<f64>::from_elem((12, 4), f64::NAN);
        for (row, value) in separated.iter().enumerate() {
            table[[row, 0]] = *value;
        }
        for row in 6..12 {
            table[[row, 1]] = row as f64;
        }
        for row in 0..12 {
            table[[row, 2]] = if row == 7 { f64::INFINITY } else { row as f64 };
            table[[row, 3]] = (row % 3) as f64;
        }
        table
    }

    #[test]
    fn dense_table_yields_one_outcome_per_feature() {
        let names = ["separated", "controls_only", "with_infinity", "identical"];
        let results = dense_table()
            .compare_groups(&labels(), &names, &GroupComparator::default())
            .unwrap();

        assert_eq!(results.len(), 4);
        let feature_names: Vec<&str> = results.iter().map(|o| o.feature_name.as_str()).collect();
        assert_eq!(feature_names, names);

        let separated = results.outcomes()[0].result().unwrap();
        // The "other" subject's 1000.0 is excluded
        assert_eq!((separated.case_count, separated.control_count), (6, 5));
        assert_eq!(separated.test_used, TestMethod::ParametricTTest);
        assert!(separated.significant);

        assert_eq!(
            results.outcomes()[1].skip_reason(),
            Some(SkipReason::EmptyCaseSample)
        );
        assert!(matches!(
            results.outcomes()[2].error(),
            Some(ComparisonError::InvalidInput { position: 1, .. })
        ));
        assert!(!results.outcomes()[3].result().unwrap().significant);

        let summary = results.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.compared, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.significant, 1);
    }

    #[test]
    fn selected_features_follow_selection_order() {
        let header = ["eid", "label", "grey", "white"];
        let config = AnalysisConfig {
            features: Some(vec!["white".to_string(), "grey".to_string()]),
            ..AnalysisConfig::default()
        };
        let selection = config.resolve_features(&header).unwrap();
        assert_eq!(selection, vec![(3, "white".to_string()), (2, "grey".to_string())]);

        let mut table = Array2::<f64>::zeros((8, 4));
        for row in 0..8 {
            table[[row, 2]] = row as f64;
            table[[row, 3]] = (row * row) as f64;
        }
        let labels: Vec<GroupLabel> = (0..8)
            .map(|row| if row < 4 { GroupLabel::Case } else { GroupLabel::Control })
            .collect();

        let results = table
            .compare_selected(&labels, &selection, &GroupComparator::default())
            .unwrap();
        assert_eq!(results.outcomes()[0].feature_name, "white");
        assert_eq!(results.outcomes()[1].feature_name, "grey");
    }

    #[test]
    fn sparse_table_treats_absent_entries_as_missing() {
        // 8 subjects × 2 features; feature 1 is only measured for controls
        let mut coo = CooMatrix::<f64>::new(8, 2);
        for (row, value) in [(0, 1.0), (1, 2.0), (2, 3.0), (4, 7.0), (5, 8.0), (6, 9.0), (7, 10.0)] {
            coo.push(row, 0, value);
        }
        for row in 4..8 {
            coo.push(row, 1, row as f64);
        }
        let table = CsrMatrix::from(&coo);
        let labels: Vec<GroupLabel> = (0..8)
            .map(|row| if row < 4 { GroupLabel::Case } else { GroupLabel::Control })
            .collect();

        let results = table
            .compare_groups(&labels, &["f0", "f1"], &GroupComparator::default())
            .unwrap();

        let f0 = results.outcomes()[0].result().unwrap();
        assert_eq!((f0.case_count, f0.control_count), (3, 4));
        assert_eq!(f0.test_used, TestMethod::NonParametricRankSum);
        assert_eq!(
            results.outcomes()[1].skip_reason(),
            Some(SkipReason::EmptyCaseSample)
        );
    }

    #[test]
    fn shape_mismatches_are_errors() {
        let table = dense_table();
        let comparator = GroupComparator::default();
        assert!(table.compare_groups(&labels()[..5], &["a", "b", "c", "d"], &comparator).is_err());
        assert!(table.compare_groups(&labels(), &["a", "b"], &comparator).is_err());
        assert!(table
            .compare_selected(&labels(), &[(9, "x".to_string())], &comparator)
            .is_err());
    }

    #[test]
    fn cohort_without_cases_skips_every_feature() {
        let labels = vec![GroupLabel::Control; 12];
        let results = dense_table()
            .compare_groups(&labels, &["a", "b", "c", "d"], &GroupComparator::default())
            .unwrap();
        // the infinite value is still reported ahead of the skip
        assert_eq!(results.summary().skipped, 3);
        assert_eq!(results.summary().failed, 1);
    }

    #[test]
    fn adjusted_p_values_align_with_compared_features() {
        let names = ["separated", "controls_only", "with_infinity", "identical"];
        let results = dense_table()
            .compare_groups(&labels(), &names, &GroupComparator::default())
            .unwrap();

        let raw: Vec<f64> = results.compared().map(|r| r.p_value).collect();
        let adjusted = results.adjusted_p_values(Correction::Bonferroni).unwrap();
        assert_eq!(adjusted.len(), 2);
        for (a, p) in adjusted.iter().zip(raw) {
            assert_relative_eq!(*a, (p * 2.0).min(1.0));
        }
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ComparatorConfig::default();
        assert_eq!(config.min_sample_for_normality_test, 4);
        assert_eq!(config.large_sample_cutoff, 5000);
        assert_eq!(config.significance_alpha, 0.05);
        assert_eq!(config.normal_reference, NormalReference::Fitted);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        let too_small = ComparatorConfig {
            min_sample_for_normality_test: 2,
            ..ComparatorConfig::default()
        };
        assert!(GroupComparator::new(too_small).is_err());

        let inverted = ComparatorConfig {
            large_sample_cutoff: 4,
            ..ComparatorConfig::default()
        };
        assert!(inverted.validate().is_err());

        let bad_alpha = ComparatorConfig {
            significance_alpha: 1.5,
            ..ComparatorConfig::default()
        };
        assert!(matches!(bad_alpha.validate(), Err(ConfigError::InvalidParameter(_))));
    }

    #[test]
    fn analysis_config_from_toml() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            features = ["volume_of_grey_matter", "volume_of_white_matter"]
            correction = "benjamini_hochberg"
            label_column = "group"

            [comparator]
            large_sample_cutoff = 3000
            normal_reference = "standard"
            "#,
        )
        .unwrap();

        assert_eq!(config.correction, Correction::BenjaminiHochberg);
        assert_eq!(config.label_column, "group");
        assert_eq!(config.id_column, "eid");
        assert_eq!(config.comparator.large_sample_cutoff, 3000);
        assert_eq!(config.comparator.min_sample_for_normality_test, 4);
        assert_eq!(config.comparator.normal_reference, NormalReference::Standard);
    }

    #[test]
    fn analysis_config_rejects_bad_input() {
        assert!(matches!(
            AnalysisConfig::from_toml_str("features = 3"),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            AnalysisConfig::from_toml_str("[comparator]\nmin_sample_for_normality_test = 1"),
            Err(ConfigError::InvalidParameter(_))
        ));
    }

    #[test]
    fn all_non_reserved_columns_by_default() {
        let header = ["eid", "volume_a", "label", "volume_b"];
        let selection = AnalysisConfig::default().resolve_features(&header).unwrap();
        assert_eq!(
            selection,
            vec![(1, "volume_a".to_string()), (3, "volume_b".to_string())]
        );
    }

    #[test]
    fn feature_selection_is_validated() {
        let header = ["eid", "label", "volume_a", "volume_b"];
        let select = |features: &[&str]| AnalysisConfig {
            features: Some(features.iter().map(|f| f.to_string()).collect()),
            ..AnalysisConfig::default()
        };

        assert!(matches!(
            select(&["volume_c"]).resolve_features(&header),
            Err(ConfigError::UnknownFeature(name)) if name == "volume_c"
        ));
        assert!(matches!(
            select(&["volume_a", "volume_a"]).resolve_features(&header),
            Err(ConfigError::DuplicateFeature(_))
        ));
        assert!(matches!(
            select(&["label"]).resolve_features(&header),
            Err(ConfigError::ReservedFeature(_))
        ));
        assert!(matches!(
            select(&[]).resolve_features(&header),
            Err(ConfigError::EmptySelection)
        ));
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;

    #[test]
    fn report_lists_every_feature() {
        let grey_case: &[f64] = &[10.0, 12.0, 11.0, 13.0, 10.0, 12.0];
        let grey_control: &[f64] = &[20.0, 22.0, 21.0, 23.0, 20.0, 22.0];
        let white_case: &[f64] = &[];
        let white_control: &[f64] = &[1.0, 2.0, 3.0];
        let csf_case: &[f64] = &[1.0, f64::NAN];
        let csf_control: &[f64] = &[1.0, 2.0];
        let features = vec![
            ("volume_of_grey_matter", grey_case, grey_control),
            ("volume_of_white_matter", white_case, white_control),
            ("volume_of_csf", csf_case, csf_control),
        ];
        let results = compare_samples(&GroupComparator::default(), features);

        let report = render_text_report(&results, Correction::BenjaminiHochberg).unwrap();
        println!("{report}");

        assert!(report.starts_with("Statistical Comparison of Case and Control"));
        assert!(report.contains("Feature: volume_of_grey_matter\nTest: T-Test\n"));
        assert!(report.contains("Cases: 6, Controls: 6"));
        assert!(report.contains("Adjusted P-value (Benjamini-Hochberg)"));
        assert!(report.contains(&"=".repeat(50)));
        assert!(report.contains("Skipped features:\n  volume_of_white_matter: empty case sample"));
        assert!(report.contains("Failed features:\n  volume_of_csf:"));
        assert!(report.contains("Significant differences found:"));
        assert!(report.contains("Features: 3 total, 1 compared, 1 skipped, 1 failed"));
    }

    #[test]
    fn report_block_matches_result_fields() {
        let case: &[f64] = &[10.0, 12.0, 11.0, 13.0, 10.0, 12.0];
        let control: &[f64] = &[20.0, 22.0, 21.0, 23.0, 20.0, 22.0];
        let results = compare_samples(
            &GroupComparator::default(),
            vec![("volume_of_grey_matter", case, control)],
        );
        let result = results.compared().next().unwrap();
        let report = render_text_report(&results, Correction::None).unwrap();

        let block = format!(
            "Feature: volume_of_grey_matter\nTest: T-Test\nStatistic: {}\nP-value: {}\nCases: 6, Controls: 6\n",
            result.statistic, result.p_value
        );
        assert!(report.contains(&block), "{report}");

        let normality = format!(
            "Normality: case Shapiro-Wilk (p = {:.4}), control Shapiro-Wilk (p = {:.4})\n{}",
            result.case_normality.p_value.unwrap(),
            result.control_normality.p_value.unwrap(),
            "=".repeat(50)
        );
        assert!(report.contains(&normality), "{report}");
    }

    #[test]
    fn report_without_significant_features() {
        let values: &[f64] = &[1.0, 2.0, 3.0];
        let features = vec![("volume", values, values)];
        let results = compare_samples(&GroupComparator::default(), features);
        let report = render_text_report(&results, Correction::None).unwrap();
        assert!(report.contains("No significant differences were found."));
        assert!(!report.contains("Adjusted P-value"));
    }
}
