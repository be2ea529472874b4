use crate::testing::batch::{BatchResults, FeatureOutcome};
use crate::testing::comparator::GroupComparator;
use crate::testing::utils::{GroupLabel, get_group_indices};
use nalgebra_sparse::{CsrMatrix, SparseEntry};
use ndarray::Array2;
use rayon::prelude::*;
use single_utilities::traits::FloatOpsTS;

pub mod nonparametric;

pub mod normality;

pub mod parametric;

/// Case/control comparisons over a subject × feature table.
///
/// Rows are subjects and columns are features. Each row carries a
/// [`GroupLabel`]; `Other` rows are ignored. Features are compared in
/// parallel, and the returned [`BatchResults`] hold one outcome per requested
/// feature in request order.
pub trait CohortStatTests<T>
where
    T: FloatOpsTS,
{
    /// Observed values of `column` for the given rows, missing values removed.
    fn observed_values(&self, column: usize, rows: &[usize]) -> Vec<T>;

    fn n_subjects(&self) -> usize;

    fn n_features(&self) -> usize;

    /// Compare the listed `(column, feature name)` pairs.
    fn compare_selected(
        &self,
        labels: &[GroupLabel],
        features: &[(usize, String)],
        comparator: &GroupComparator,
    ) -> anyhow::Result<BatchResults>
    where
        Self: Sync,
    {
        if labels.len() != self.n_subjects() {
            return Err(anyhow::anyhow!(
                "Expected {} group labels, got {}",
                self.n_subjects(),
                labels.len()
            ));
        }
        if let Some((column, name)) = features.iter().find(|(c, _)| *c >= self.n_features()) {
            return Err(anyhow::anyhow!(
                "Feature '{}' refers to column {} but the table has {} columns",
                name,
                column,
                self.n_features()
            ));
        }

        let (case_rows, control_rows) = get_group_indices(labels);

        // collect() on an indexed parallel iterator keeps input order
        let outcomes: Vec<FeatureOutcome> = features
            .par_iter()
            .enumerate()
            .map(|(index, (column, feature_name))| {
                let case = self.observed_values(*column, &case_rows);
                let control = self.observed_values(*column, &control_rows);
                FeatureOutcome {
                    index,
                    feature_name: feature_name.clone(),
                    outcome: comparator.compare(feature_name, &case, &control),
                }
            })
            .collect();

        let results = BatchResults::from_outcomes(outcomes);
        results.log_outcomes();
        Ok(results)
    }

    /// Compare every column, named by `feature_names`.
    fn compare_groups<S: AsRef<str>>(
        &self,
        labels: &[GroupLabel],
        feature_names: &[S],
        comparator: &GroupComparator,
    ) -> anyhow::Result<BatchResults>
    where
        Self: Sync,
    {
        if feature_names.len() != self.n_features() {
            return Err(anyhow::anyhow!(
                "Expected {} feature names, got {}",
                self.n_features(),
                feature_names.len()
            ));
        }

        let features: Vec<(usize, String)> = feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| (i, name.as_ref().to_string()))
            .collect();
        self.compare_selected(labels, &features, comparator)
    }
}

/// Dense tables mark missing measurements with NaN, which are dropped.
/// Infinite values are kept so the comparison reports them as invalid input.
impl<T> CohortStatTests<T> for Array2<T>
where
    T: FloatOpsTS,
{
    fn observed_values(&self, column: usize, rows: &[usize]) -> Vec<T> {
        rows.iter()
            .map(|&row| self[[row, column]])
            .filter(|&value| !num_traits::Float::is_nan(value))
            .collect()
    }

    fn n_subjects(&self) -> usize {
        self.nrows()
    }

    fn n_features(&self) -> usize {
        self.ncols()
    }
}

/// Sparse tables store only measured values; structurally absent entries
/// are subjects without that measurement.
impl<T> CohortStatTests<T> for CsrMatrix<T>
where
    T: FloatOpsTS,
{
    fn observed_values(&self, column: usize, rows: &[usize]) -> Vec<T> {
        let mut values = Vec::with_capacity(rows.len());
        for &row in rows {
            if let Some(SparseEntry::NonZero(value)) = self.get_entry(row, column) {
                if !num_traits::Float::is_nan(*value) {
                    values.push(*value);
                }
            }
        }
        values
    }

    fn n_subjects(&self) -> usize {
        self.nrows()
    }

    fn n_features(&self) -> usize {
        self.ncols()
    }
}
