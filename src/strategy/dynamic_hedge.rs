//! Dynamic Hedge Ratios
//!
//! Time-varying hedge ratios for a pair: a trailing-window OLS refit and a
//! recursive linear-Gaussian filter over `[slope, intercept]`.
//!
//! # Model (Kalman)
//!
//! ```text
//! state[t] = state[t-1] + w,   w ~ N(0, delta/(1-delta) * I)
//! y[t]     = [x[t], 1] . state[t] + v,   v ~ N(0, 1)
//! ```
//!
//! Both estimators take a two-column panel: column 0 is `x`, column 1 is `y`.
//! Hedge vectors are `[-slope, 1]`, units of `x` held per unit of `y`.

use nalgebra::{Matrix2, RowVector2, Vector2};
use serde::Serialize;

use crate::domain::error::AnalysisError;
use crate::domain::series::{AlignedPanel, HedgeRatioSeries, HedgeVector};
use crate::strategy::regression::ols_fit;

/// Unit observation variance
const OBSERVATION_VARIANCE: f64 = 1.0;

/// One filtering step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KalmanEstimate {
    pub slope: f64,
    pub intercept: f64,
    /// `y - [x, 1] . predicted state`
    pub forecast_error: f64,
    /// Variance of the one-step forecast
    pub forecast_variance: f64,
}

/// Refit `y ~ x` on the trailing `lookback` rows, for every row `t >= lookback`
///
/// The window for row `t` is `[t - lookback, t)`, so row `t` itself is never
/// part of its own fit.
pub fn rolling_ols(panel: &AlignedPanel, lookback: usize) -> Result<HedgeRatioSeries, AnalysisError> {
    let (x, y) = pair_columns(panel)?;
    if lookback < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "rolling lookback must be at least 2, got {}",
            lookback
        )));
    }
    AnalysisError::require_len(lookback + 1, x.len())?;

    let mut timestamps = Vec::with_capacity(x.len() - lookback);
    let mut vectors = Vec::with_capacity(x.len() - lookback);
    for t in lookback..x.len() {
        let fit = ols_fit(&x[t - lookback..t], &y[t - lookback..t])?;
        timestamps.push(panel.timestamps()[t]);
        vectors.push(HedgeVector::new(vec![-fit.slope, 1.0]));
    }

    tracing::debug!(
        "Rolling OLS: lookback={}, {} hedge vectors",
        lookback,
        vectors.len()
    );

    Ok(HedgeRatioSeries::new(timestamps, vectors))
}

/// Forward filtering pass over the whole pair
pub fn kalman_filter(panel: &AlignedPanel, delta: f64) -> Result<Vec<KalmanEstimate>, AnalysisError> {
    let (x, y) = pair_columns(panel)?;
    if !(delta > 0.0 && delta < 1.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "kalman delta must lie in (0, 1), got {}",
            delta
        )));
    }
    AnalysisError::require_len(1, x.len())?;

    let process_noise = Matrix2::identity() * (delta / (1.0 - delta));

    // zero-mean prior, unit variances, fully correlated
    let mut mean = Vector2::zeros();
    let mut cov = Matrix2::repeat(1.0);

    let mut estimates = Vec::with_capacity(x.len());
    for (t, (&xt, &yt)) in x.iter().zip(y).enumerate() {
        // the prior already describes step 0
        if t > 0 {
            cov += process_noise;
        }

        let h = RowVector2::new(xt, 1.0);
        let forecast_error = yt - (h * mean)[0];
        let forecast_variance = (h * cov * h.transpose())[0] + OBSERVATION_VARIANCE;
        if !forecast_variance.is_finite() || forecast_variance <= 0.0 {
            return Err(AnalysisError::NumericalDegeneracy(format!(
                "forecast variance {} at step {}",
                forecast_variance, t
            )));
        }

        let gain = cov * h.transpose() / forecast_variance;
        mean += gain * forecast_error;
        cov = cov - gain * h * cov;

        estimates.push(KalmanEstimate {
            slope: mean[0],
            intercept: mean[1],
            forecast_error,
            forecast_variance,
        });
    }

    if let Some(last) = estimates.last() {
        tracing::debug!(
            "Kalman pass: delta={}, steps={}, final slope={:.6}, intercept={:.6}",
            delta,
            estimates.len(),
            last.slope,
            last.intercept
        );
    }

    Ok(estimates)
}

/// One hedge vector `[-slope, 1]` per row of the pair
pub fn kalman_hedge(panel: &AlignedPanel, delta: f64) -> Result<HedgeRatioSeries, AnalysisError> {
    let estimates = kalman_filter(panel, delta)?;
    let vectors = estimates
        .iter()
        .map(|e| HedgeVector::new(vec![-e.slope, 1.0]))
        .collect();
    Ok(HedgeRatioSeries::new(panel.timestamps().to_vec(), vectors))
}

fn pair_columns(panel: &AlignedPanel) -> Result<(&[f64], &[f64]), AnalysisError> {
    if panel.n_series() != 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "dynamic hedge estimators need exactly 2 series, got {}",
            panel.n_series()
        )));
    }
    panel.validate_finite()?;
    match (panel.column(0), panel.column(1)) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(AnalysisError::InvalidInput("panel is missing a column".to_string())),
    }
}
