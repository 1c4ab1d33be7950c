//! Performance Evaluation
//!
//! Summary statistics of a per-period simple return stream.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::domain::error::{negligible_variance, AnalysisError};

/// Annualized return, Sharpe ratio and drawdown of one return stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub annualized_return: f64,
    /// NaN when the returns have no variance
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub periods: usize,
}

/// `prod(1 + r) ^ (periods_per_year / n) - 1`
pub fn annualized_return(returns: &[f64], periods_per_year: f64) -> Result<f64, AnalysisError> {
    AnalysisError::require_len(1, returns.len())?;
    let growth: f64 = returns.iter().map(|r| 1.0 + r).product();
    Ok(growth.powf(periods_per_year / returns.len() as f64) - 1.0)
}

/// `(mean - risk_free_rate) / std`, times `sqrt(periods_per_year)` when annualized
///
/// Uses the sample standard deviation. Zero variance or fewer than two returns
/// gives NaN rather than an error.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: Option<f64>) -> f64 {
    let Some((mean, variance)) = mean_and_sample_variance(returns) else {
        return f64::NAN;
    };
    if negligible_variance(variance, mean) {
        return f64::NAN;
    }

    let sharpe = (mean - risk_free_rate) / variance.sqrt();
    match periods_per_year {
        Some(periods) => sharpe * periods.sqrt(),
        None => sharpe,
    }
}

/// Largest fractional fall of the wealth curve `cumprod(1 + r)` from its running peak
///
/// A curve that is wiped out before it ever holds positive wealth reports a
/// full drawdown of 1.
pub fn max_drawdown(returns: &[f64]) -> Result<f64, AnalysisError> {
    AnalysisError::require_len(1, returns.len())?;

    let mut wealth = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;
    for r in returns {
        wealth *= 1.0 + r;
        peak = peak.max(wealth);
        if peak <= 0.0 {
            return Ok(1.0);
        }
        worst = worst.max((peak - wealth) / peak);
    }
    Ok(worst)
}

/// One-sample t-test of the mean return against zero
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanReturnTest {
    /// Unannualized Sharpe ratio times `sqrt(n)`
    pub t_statistic: f64,
    /// Two-sided
    pub p_value: f64,
    pub degrees_of_freedom: usize,
}

/// Whether the returns' mean differs from zero, under a Student-t null
pub fn mean_return_t_test(returns: &[f64]) -> Result<MeanReturnTest, AnalysisError> {
    AnalysisError::require_len(2, returns.len())?;
    AnalysisError::require_finite(returns, "returns")?;
    let (mean, variance) = mean_and_sample_variance(returns).ok_or(AnalysisError::InsufficientData {
        required: 2,
        actual: returns.len(),
    })?;
    AnalysisError::require_variance(variance, mean, "returns")?;

    let n = returns.len();
    let t_statistic = mean / (variance / n as f64).sqrt();
    let dist = StudentsT::new(0.0, 1.0, (n - 1) as f64)
        .map_err(|e| AnalysisError::NumericalDegeneracy(e.to_string()))?;
    let p_value = 2.0 * (1.0 - dist.cdf(t_statistic.abs()));

    Ok(MeanReturnTest {
        t_statistic,
        p_value,
        degrees_of_freedom: n - 1,
    })
}

/// Kelly-optimal leverage of a single stream: `(mean - rf) / variance`
pub fn kelly_leverage(returns: &[f64], risk_free_rate: f64) -> f64 {
    match mean_and_sample_variance(returns) {
        Some((mean, variance)) if !negligible_variance(variance, mean) => {
            (mean - risk_free_rate) / variance
        }
        _ => f64::NAN,
    }
}

/// All three statistics for a return stream
pub fn summarize(
    returns: &[f64],
    periods_per_year: f64,
    risk_free_rate: f64,
) -> Result<PerformanceSummary, AnalysisError> {
    let summary = PerformanceSummary {
        annualized_return: annualized_return(returns, periods_per_year)?,
        sharpe_ratio: sharpe_ratio(returns, risk_free_rate, Some(periods_per_year)),
        max_drawdown: max_drawdown(returns)?,
        periods: returns.len(),
    };

    if summary.sharpe_ratio.is_nan() {
        tracing::warn!("Sharpe ratio undefined: returns have no variance");
    }

    Ok(summary)
}

/// Same as [`summarize`] for a cumulative wealth curve instead of returns
pub fn summarize_wealth_curve(
    wealth: &[f64],
    periods_per_year: f64,
    risk_free_rate: f64,
) -> Result<PerformanceSummary, AnalysisError> {
    AnalysisError::require_len(2, wealth.len())?;
    let returns: Vec<f64> = wealth.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    summarize(&returns, periods_per_year, risk_free_rate)
}

fn mean_and_sample_variance(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance))
}
