//! JSON Series Store
//!
//! File-backed [`SeriesStore`]: one `<dir>/<name>.json` file per series holding
//! `[{"date": "YYYY-MM-DD", "value": 1.23}, ...]`. Records may be in any order;
//! duplicate dates are rejected.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::series::TimeSeries;
use crate::ports::series_store::{SeriesStore, StoreError};

/// One dated observation as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub date: NaiveDate,
    pub value: f64,
}

/// Directory of JSON series files
#[derive(Debug, Clone)]
pub struct JsonSeriesStore {
    dir: PathBuf,
}

impl JsonSeriesStore {
    /// `~` in the directory is expanded
    pub fn new(dir: impl AsRef<str>) -> Self {
        let expanded = shellexpand::tilde(dir.as_ref()).to_string();
        Self {
            dir: PathBuf::from(expanded),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Write a series, creating the directory if needed
    pub fn save(&self, name: &str, series: &TimeSeries) -> Result<PathBuf, StoreError> {
        let io_error = |source| StoreError::Io {
            name: name.to_string(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_error)?;

        let records: Vec<SeriesRecord> = series
            .iter()
            .map(|(date, value)| SeriesRecord { date, value })
            .collect();
        let content = serde_json::to_string_pretty(&records).map_err(|e| StoreError::Parse {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        let path = self.path_for(name);
        fs::write(&path, content).map_err(io_error)?;

        tracing::info!("Series saved: {} ({} points) -> {}", name, series.len(), path.display());
        Ok(path)
    }
}

impl SeriesStore for JsonSeriesStore {
    fn load(&self, name: &str) -> Result<TimeSeries, StoreError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(StoreError::NotFound(format!("{} ({})", name, path.display())));
        }

        let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            name: name.to_string(),
            source,
        })?;
        let mut records: Vec<SeriesRecord> =
            serde_json::from_str(&content).map_err(|e| StoreError::Parse {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        records.sort_by_key(|r| r.date);

        let (dates, values) = records.into_iter().map(|r| (r.date, r.value)).unzip();
        let series = TimeSeries::new(dates, values)?;

        tracing::debug!("Series loaded: {} ({} points)", name, series.len());
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 3, day).unwrap()
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonSeriesStore::new(dir.path().to_string_lossy());
        let series = TimeSeries::new(vec![d(1), d(2), d(4)], vec![1.5, 2.5, 3.5]).unwrap();

        let path = store.save("spy", &series).unwrap();
        assert!(path.ends_with("spy.json"));
        assert_eq!(store.load("spy").unwrap(), series);
    }

    #[test]
    fn test_load_sorts_records() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("qqq.json"),
            r#"[{"date":"2022-03-02","value":2.0},{"date":"2022-03-01","value":1.0}]"#,
        )
        .unwrap();

        let store = JsonSeriesStore::new(dir.path().to_string_lossy());
        let series = store.load("qqq").unwrap();
        assert_eq!(series.timestamps(), &[d(1), d(2)]);
        assert_eq!(series.values(), &[1.0, 2.0]);
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();
        let store = JsonSeriesStore::new(dir.path().to_string_lossy());
        assert!(matches!(store.load("absent"), Err(StoreError::NotFound(_))));

        fs::write(dir.path().join("bad.json"), "{ invalid json }").unwrap();
        assert!(matches!(store.load("bad"), Err(StoreError::Parse { .. })));

        fs::write(
            dir.path().join("dup.json"),
            r#"[{"date":"2022-03-01","value":1.0},{"date":"2022-03-01","value":2.0}]"#,
        )
        .unwrap();
        assert!(matches!(store.load("dup"), Err(StoreError::Invalid(_))));
    }

    #[test]
    fn test_load_panel_from_files() {
        let dir = TempDir::new().unwrap();
        let store = JsonSeriesStore::new(dir.path().to_string_lossy());
        store
            .save("a", &TimeSeries::new(vec![d(1), d(2), d(3)], vec![1.0, 2.0, 3.0]).unwrap())
            .unwrap();
        store
            .save("b", &TimeSeries::new(vec![d(2), d(3)], vec![20.0, 30.0]).unwrap())
            .unwrap();

        let panel = store.load_panel(&["a", "b"]).unwrap();
        assert_eq!(panel.len(), 2);
        assert_eq!(panel.column_by_name("a").unwrap(), &[2.0, 3.0]);
    }

    #[test]
    fn test_tilde_is_expanded() {
        let store = JsonSeriesStore::new("~/prices");
        assert!(!store.dir().to_string_lossy().starts_with('~') || std::env::var("HOME").is_err());
    }
}
