//! Series Store Port
//!
//! Read contract for whatever supplies price history. The engine never writes
//! back; adapters only need to hand out ordered, date-indexed series.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::error::AnalysisError;
use crate::domain::series::{AlignedPanel, TimeSeries};

/// Series store error type
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Series not found: {0}")]
    NotFound(String),

    #[error("I/O error on {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Data parsing error in {name}: {message}")]
    Parse { name: String, message: String },

    #[error("Invalid series data: {0}")]
    Invalid(#[from] AnalysisError),
}

/// Series store port trait
pub trait SeriesStore: Send + Sync {
    /// Load one named series
    fn load(&self, name: &str) -> Result<TimeSeries, StoreError>;

    /// Load several series and inner-join them on date
    fn load_panel(&self, names: &[&str]) -> Result<AlignedPanel, StoreError> {
        let series = names
            .iter()
            .map(|name| -> Result<_, StoreError> { Ok((*name, self.load(name)?)) })
            .collect::<Result<Vec<_>, StoreError>>()?;
        let refs: Vec<(&str, &TimeSeries)> = series.iter().map(|(n, s)| (*n, s)).collect();
        let panel = AlignedPanel::align(&refs)?;

        if panel.is_empty() {
            tracing::warn!("Series {:?} share no common dates", names);
        }
        Ok(panel)
    }
}

/// Store backed by a map, for tests and generated data
#[derive(Debug, Clone, Default)]
pub struct InMemorySeriesStore {
    series: HashMap<String, TimeSeries>,
}

impl InMemorySeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, series: TimeSeries) {
        self.series.insert(name.into(), series);
    }

    /// Add every column of a panel under its own name
    pub fn insert_panel(&mut self, panel: &AlignedPanel) {
        for (i, name) in panel.names().iter().enumerate() {
            if let Some(series) = panel.series(i) {
                self.series.insert(name.clone(), series);
            }
        }
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.series.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl SeriesStore for InMemorySeriesStore {
    fn load(&self, name: &str) -> Result<TimeSeries, StoreError> {
        self.series
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 6, day).unwrap()
    }

    #[test]
    fn test_load_missing_series() {
        let store = InMemorySeriesStore::new();
        assert!(matches!(store.load("nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_load_panel_inner_joins() {
        let mut store = InMemorySeriesStore::new();
        store.insert("a", TimeSeries::new(vec![d(1), d(2), d(3)], vec![1.0, 2.0, 3.0]).unwrap());
        store.insert("b", TimeSeries::new(vec![d(2), d(3), d(4)], vec![5.0, 6.0, 7.0]).unwrap());

        let panel = store.load_panel(&["a", "b"]).unwrap();
        assert_eq!(panel.timestamps(), &[d(2), d(3)]);
        assert_eq!(panel.column(1).unwrap(), &[5.0, 6.0]);
        assert_eq!(store.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_insert_panel_round_trips_columns() {
        let panel = AlignedPanel::from_columns(
            vec!["x".into(), "y".into()],
            vec![d(1), d(2)],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        )
        .unwrap();
        let mut store = InMemorySeriesStore::new();
        store.insert_panel(&panel);

        assert_eq!(store.load_panel(&["x", "y"]).unwrap(), panel);
    }

    #[test]
    fn test_duplicate_names_are_invalid() {
        let mut store = InMemorySeriesStore::new();
        store.insert("a", TimeSeries::daily(d(1), vec![1.0]));
        assert!(matches!(store.load_panel(&["a", "a"]), Err(StoreError::Invalid(_))));
    }
}
