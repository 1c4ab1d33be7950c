//! Series Data Model
//!
//! Date-indexed series, the inner-joined panel every multi-series estimator
//! consumes, and the hedge vectors that turn a panel into a spread.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::error::AnalysisError;

/// Ordered (timestamp, value) pairs with strictly increasing timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    timestamps: Vec<NaiveDate>,
    values: Vec<f64>,
}

/// Per-period simple returns share the series representation
pub type ReturnSeries = TimeSeries;

impl TimeSeries {
    /// Build a series, rejecting mismatched lengths and unordered or duplicate dates
    pub fn new(timestamps: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, AnalysisError> {
        if timestamps.len() != values.len() {
            return Err(AnalysisError::InvalidInput(format!(
                "timestamp count {} does not match value count {}",
                timestamps.len(),
                values.len()
            )));
        }
        if let Some(pos) = timestamps.windows(2).position(|w| w[0] >= w[1]) {
            return Err(AnalysisError::InvalidInput(format!(
                "timestamps must be strictly increasing (violated at index {})",
                pos + 1
            )));
        }
        Ok(Self { timestamps, values })
    }

    /// Series on consecutive calendar days starting at `start`
    pub fn daily(start: NaiveDate, values: Vec<f64>) -> Self {
        let timestamps = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        Self { timestamps, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    /// Value at a given date, if present
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.timestamps
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }

    /// Same timestamps, transformed values
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> TimeSeries {
        TimeSeries {
            timestamps: self.timestamps.clone(),
            values: self.values.iter().map(|v| f(*v)).collect(),
        }
    }

    /// Simple returns `v[t]/v[t-1] - 1`, dated at t
    pub fn pct_change(&self) -> TimeSeries {
        let values = self
            .values
            .windows(2)
            .map(|w| w[1] / w[0] - 1.0)
            .collect();
        TimeSeries {
            timestamps: self.timestamps.iter().skip(1).copied().collect(),
            values,
        }
    }
}

/// Named series sharing one common date index (inner join, no gaps)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedPanel {
    names: Vec<String>,
    timestamps: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl AlignedPanel {
    /// Inner-join the given series on their timestamps
    pub fn align<S: AsRef<str>>(series: &[(S, &TimeSeries)]) -> Result<Self, AnalysisError> {
        if series.is_empty() {
            return Err(AnalysisError::InvalidInput("cannot align an empty set of series".to_string()));
        }

        let mut common: BTreeSet<NaiveDate> = series[0].1.timestamps().iter().copied().collect();
        for (_, s) in &series[1..] {
            let other: BTreeSet<NaiveDate> = s.timestamps().iter().copied().collect();
            common = common.intersection(&other).copied().collect();
        }
        let timestamps: Vec<NaiveDate> = common.into_iter().collect();

        let mut names = Vec::with_capacity(series.len());
        let mut columns = Vec::with_capacity(series.len());
        for (name, s) in series {
            let name = name.as_ref().to_string();
            if names.contains(&name) {
                return Err(AnalysisError::InvalidInput(format!("duplicate series name '{}'", name)));
            }
            // every date in `timestamps` exists in every series by construction
            let column = timestamps
                .iter()
                .filter_map(|d| s.get(*d))
                .collect::<Vec<f64>>();
            names.push(name);
            columns.push(column);
        }

        tracing::debug!(
            "Aligned {} series on {} common timestamps",
            names.len(),
            timestamps.len()
        );

        Ok(Self { names, timestamps, columns })
    }

    /// Build a panel from columns that are already aligned
    pub fn from_columns(
        names: Vec<String>,
        timestamps: Vec<NaiveDate>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, AnalysisError> {
        if names.len() != columns.len() {
            return Err(AnalysisError::InvalidInput(format!(
                "{} names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        // validates ordering of the shared index
        TimeSeries::new(timestamps.clone(), vec![0.0; timestamps.len()])?;
        if let Some(bad) = columns.iter().position(|c| c.len() != timestamps.len()) {
            return Err(AnalysisError::InvalidInput(format!(
                "column '{}' has {} values for {} timestamps",
                names[bad],
                columns[bad].len(),
                timestamps.len()
            )));
        }
        Ok(Self { names, timestamps, columns })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn n_series(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(|c| c.as_slice())
    }

    pub fn column_by_name(&self, name: &str) -> Option<&[f64]> {
        let index = self.names.iter().position(|n| n == name)?;
        self.column(index)
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// A single column as a standalone series
    pub fn series(&self, index: usize) -> Option<TimeSeries> {
        self.columns.get(index).map(|c| TimeSeries {
            timestamps: self.timestamps.clone(),
            values: c.clone(),
        })
    }

    /// Reject panels containing NaN or infinite values
    pub fn validate_finite(&self) -> Result<(), AnalysisError> {
        for (name, column) in self.names.iter().zip(&self.columns) {
            AnalysisError::require_finite(column, name)?;
        }
        Ok(())
    }

    /// Rows from `start` onwards
    pub fn slice_from(&self, start: usize) -> AlignedPanel {
        let start = start.min(self.len());
        AlignedPanel {
            names: self.names.clone(),
            timestamps: self.timestamps[start..].to_vec(),
            columns: self.columns.iter().map(|c| c[start..].to_vec()).collect(),
        }
    }

    /// Dot product of each row with a static hedge vector
    pub fn spread(&self, hedge: &HedgeVector) -> Result<TimeSeries, AnalysisError> {
        self.check_width(hedge)?;
        let values = (0..self.len())
            .map(|t| hedge.dot_row(&self.columns, t))
            .collect();
        Ok(TimeSeries {
            timestamps: self.timestamps.clone(),
            values,
        })
    }

    /// Dot product with a time-varying hedge, only where a hedge vector exists
    pub fn dynamic_spread(&self, hedges: &HedgeRatioSeries) -> Result<TimeSeries, AnalysisError> {
        let mut timestamps = Vec::with_capacity(hedges.len());
        let mut values = Vec::with_capacity(hedges.len());
        for (date, hedge) in hedges.iter() {
            self.check_width(hedge)?;
            let t = self.timestamps.binary_search(&date).map_err(|_| {
                AnalysisError::InvalidInput(format!("hedge date {} is not in the panel index", date))
            })?;
            timestamps.push(date);
            values.push(hedge.dot_row(&self.columns, t));
        }
        TimeSeries::new(timestamps, values)
    }

    fn check_width(&self, hedge: &HedgeVector) -> Result<(), AnalysisError> {
        if hedge.len() != self.n_series() {
            return Err(AnalysisError::InvalidInput(format!(
                "hedge vector has {} weights for {} series",
                hedge.len(),
                self.n_series()
            )));
        }
        Ok(())
    }
}

/// One weight per panel column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeVector {
    weights: Vec<f64>,
}

impl HedgeVector {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Scale so the first component is exactly 1
    pub fn normalized(&self) -> Result<HedgeVector, AnalysisError> {
        let first = *self
            .weights
            .first()
            .ok_or_else(|| AnalysisError::InvalidInput("empty hedge vector".to_string()))?;
        if first.abs() < f64::EPSILON {
            return Err(AnalysisError::NumericalDegeneracy(
                "first hedge component is zero; cannot normalize".to_string(),
            ));
        }
        Ok(HedgeVector {
            weights: self.weights.iter().map(|w| w / first).collect(),
        })
    }

    pub fn dot(&self, row: &[f64]) -> f64 {
        self.weights.iter().zip(row).map(|(w, v)| w * v).sum()
    }

    fn dot_row(&self, columns: &[Vec<f64>], t: usize) -> f64 {
        self.weights
            .iter()
            .zip(columns)
            .map(|(w, c)| w * c[t])
            .sum()
    }
}

/// One hedge vector per timestamp, produced by the dynamic estimators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HedgeRatioSeries {
    timestamps: Vec<NaiveDate>,
    vectors: Vec<HedgeVector>,
}

impl HedgeRatioSeries {
    pub fn new(timestamps: Vec<NaiveDate>, vectors: Vec<HedgeVector>) -> Self {
        debug_assert_eq!(timestamps.len(), vectors.len());
        Self { timestamps, vectors }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn vectors(&self) -> &[HedgeVector] {
        &self.vectors
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &HedgeVector)> + '_ {
        self.timestamps.iter().copied().zip(self.vectors.iter())
    }

    pub fn get(&self, date: NaiveDate) -> Option<&HedgeVector> {
        self.timestamps
            .binary_search(&date)
            .ok()
            .map(|i| &self.vectors[i])
    }

    /// Weight of component `index` across time
    pub fn component(&self, index: usize) -> Vec<f64> {
        self.vectors
            .iter()
            .map(|v| v.weights().get(index).copied().unwrap_or(f64::NAN))
            .collect()
    }
}

/// Open-unit tallies of the long and short legs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSeries {
    timestamps: Vec<NaiveDate>,
    long: Vec<u32>,
    short: Vec<u32>,
}

impl PositionSeries {
    pub fn new(timestamps: Vec<NaiveDate>, long: Vec<u32>, short: Vec<u32>) -> Self {
        debug_assert_eq!(timestamps.len(), long.len());
        debug_assert_eq!(timestamps.len(), short.len());
        Self { timestamps, long, short }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn long(&self) -> &[u32] {
        &self.long
    }

    pub fn short(&self) -> &[u32] {
        &self.short
    }

    /// `long - short` at every timestamp
    pub fn net(&self) -> Vec<i64> {
        self.long
            .iter()
            .zip(&self.short)
            .map(|(&l, &s)| i64::from(l) - i64::from(s))
            .collect()
    }

    /// Net position as a series of exposures
    pub fn exposure(&self) -> TimeSeries {
        TimeSeries {
            timestamps: self.timestamps.clone(),
            values: self.net().into_iter().map(|n| n as f64).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let result = TimeSeries::new(vec![d(2), d(1)], vec![1.0, 2.0]);
        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));

        let dup = TimeSeries::new(vec![d(1), d(1)], vec![1.0, 2.0]);
        assert!(matches!(dup, Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_series_rejects_length_mismatch() {
        let result = TimeSeries::new(vec![d(1), d(2)], vec![1.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_pct_change() {
        let s = TimeSeries::daily(d(1), vec![100.0, 110.0, 99.0]);
        let r = s.pct_change();
        assert_eq!(r.len(), 2);
        assert!((r.values()[0] - 0.1).abs() < 1e-12);
        assert!((r.values()[1] + 0.1).abs() < 1e-12);
        assert_eq!(r.timestamps()[0], d(2));
    }

    #[test]
    fn test_align_inner_join() {
        let a = TimeSeries::new(vec![d(1), d(2), d(3), d(5)], vec![1.0, 2.0, 3.0, 5.0]).unwrap();
        let b = TimeSeries::new(vec![d(2), d(3), d(4), d(5)], vec![20.0, 30.0, 40.0, 50.0]).unwrap();

        let panel = AlignedPanel::align(&[("a", &a), ("b", &b)]).unwrap();
        assert_eq!(panel.timestamps(), &[d(2), d(3), d(5)]);
        assert_eq!(panel.column_by_name("a").unwrap(), &[2.0, 3.0, 5.0]);
        assert_eq!(panel.column_by_name("b").unwrap(), &[20.0, 30.0, 50.0]);
    }

    #[test]
    fn test_align_rejects_duplicate_names() {
        let a = TimeSeries::daily(d(1), vec![1.0, 2.0]);
        let result = AlignedPanel::align(&[("a", &a), ("a", &a)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_static_spread() {
        let a = TimeSeries::daily(d(1), vec![1.0, 2.0, 3.0]);
        let b = TimeSeries::daily(d(1), vec![2.0, 4.0, 7.0]);
        let panel = AlignedPanel::align(&[("a", &a), ("b", &b)]).unwrap();

        let spread = panel.spread(&HedgeVector::new(vec![2.0, -1.0])).unwrap();
        assert_eq!(spread.values(), &[0.0, 0.0, -1.0]);

        assert!(panel.spread(&HedgeVector::new(vec![1.0])).is_err());
    }

    #[test]
    fn test_dynamic_spread_only_where_defined() {
        let a = TimeSeries::daily(d(1), vec![1.0, 2.0, 3.0]);
        let b = TimeSeries::daily(d(1), vec![2.0, 4.0, 7.0]);
        let panel = AlignedPanel::align(&[("a", &a), ("b", &b)]).unwrap();

        let hedges = HedgeRatioSeries::new(
            vec![d(2), d(3)],
            vec![HedgeVector::new(vec![-2.0, 1.0]), HedgeVector::new(vec![-1.0, 1.0])],
        );
        let spread = panel.dynamic_spread(&hedges).unwrap();
        assert_eq!(spread.timestamps(), &[d(2), d(3)]);
        assert_eq!(spread.values(), &[0.0, 4.0]);
    }

    #[test]
    fn test_hedge_vector_normalization() {
        let v = HedgeVector::new(vec![-0.5, 0.5]).normalized().unwrap();
        assert_eq!(v.weights(), &[1.0, -1.0]);

        let zero = HedgeVector::new(vec![0.0, 1.0]).normalized();
        assert!(matches!(zero, Err(AnalysisError::NumericalDegeneracy(_))));
    }

    #[test]
    fn test_validate_finite() {
        let panel = AlignedPanel::from_columns(
            vec!["a".into(), "b".into()],
            vec![d(1), d(2)],
            vec![vec![1.0, 2.0], vec![1.0, f64::INFINITY]],
        )
        .unwrap();
        assert!(matches!(panel.validate_finite(), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_position_series_net() {
        let p = PositionSeries::new(vec![d(1), d(2), d(3)], vec![1, 1, 0], vec![0, 1, 1]);
        assert_eq!(p.net(), vec![1, 0, -1]);
        assert_eq!(p.exposure().values(), &[1.0, 0.0, -1.0]);
    }
}
