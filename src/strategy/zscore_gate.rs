//! Z-Score Gate
//!
//! Standardizes a spread against its own trailing window:
//!
//! z = (value - rolling_mean) / rolling_std
//!
//! The window ends at (and includes) the current point and the standard
//! deviation is the sample (n-1) estimator. The first `window - 1` points have
//! no full window and are dropped, as are points whose window has no variance.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::error::AnalysisError;
use crate::domain::series::TimeSeries;

/// Below this the window is treated as flat
const MIN_STD_DEV: f64 = 1e-10;

/// Z-score of one point together with the window statistics behind it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZScorePoint {
    pub timestamp: NaiveDate,
    pub z_score: f64,
    /// Rolling mean used in calculation
    pub mean: f64,
    /// Rolling sample standard deviation
    pub std_dev: f64,
    pub value: f64,
}

impl ZScorePoint {
    /// Distance from mean in terms of standard deviations
    pub fn deviation_magnitude(&self) -> f64 {
        self.z_score.abs()
    }
}

/// Per-point window statistics for every defined z-score
pub fn zscore_points(series: &TimeSeries, window: usize) -> Result<Vec<ZScorePoint>, AnalysisError> {
    if window < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "z-score window must be at least 2, got {}",
            window
        )));
    }
    AnalysisError::require_len(window, series.len())?;
    AnalysisError::require_finite(series.values(), "spread")?;

    let values = series.values();
    let mut points = Vec::with_capacity(values.len() + 1 - window);
    let mut flat = 0usize;
    for end in window..=values.len() {
        let buffer = &values[end - window..end];
        let mean = rolling_mean(buffer);
        let std_dev = rolling_std(buffer, mean);

        // Avoid division by zero
        if std_dev < MIN_STD_DEV {
            flat += 1;
            continue;
        }

        let value = values[end - 1];
        points.push(ZScorePoint {
            timestamp: series.timestamps()[end - 1],
            z_score: (value - mean) / std_dev,
            mean,
            std_dev,
            value,
        });
    }

    if flat > 0 {
        tracing::warn!("Dropped {} z-scores with a zero-variance window", flat);
    }

    Ok(points)
}

/// Standardized spread, defined from the `window`-th point on
pub fn rolling_zscore(series: &TimeSeries, window: usize) -> Result<TimeSeries, AnalysisError> {
    let points = zscore_points(series, window)?;
    let (timestamps, values) = points.iter().map(|p| (p.timestamp, p.z_score)).unzip();
    TimeSeries::new(timestamps, values)
}

fn rolling_mean(buffer: &[f64]) -> f64 {
    buffer.iter().sum::<f64>() / buffer.len() as f64
}

fn rolling_std(buffer: &[f64], mean: f64) -> f64 {
    let variance = buffer
        .iter()
        .map(|&v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / (buffer.len() - 1) as f64;

    variance.sqrt()
}
