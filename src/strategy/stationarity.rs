//! Stationarity Diagnostics
//!
//! Three independent views on whether a single series mean-reverts:
//! - Unit-root test: OLS fit of `dx(t) = a + rho * x(t-1) + e(t)` plus a
//!   Dickey-Fuller test with zero augmentation lags and a constant-only regression
//! - Variance-ratio test (Lo-MacKinlay): k-period vs 1-period log-return variance
//! - Hurst exponent: scaling of lagged-difference variance with the lag
//!
//! A negative `rho` gives the half-life of mean reversion, `ceil(-ln 2 / rho)`.
//! A non-negative `rho` means there is no half-life; that is a terminal
//! "non-stationary" classification, not a failure.

use serde::Serialize;
use statrs::function::erf::erfc;

use crate::domain::error::AnalysisError;
use crate::strategy::params::StationarityParams;
use crate::strategy::regression::ols_fit;

/// Smallest series the unit-root regression accepts
pub const MIN_UNIT_ROOT_LEN: usize = 3;

// MacKinnon (1994) p-value surface, constant-only regression, one variable
const TAU_MAX_C: f64 = 2.74;
const TAU_MIN_C: f64 = -18.86;
const TAU_STAR_C: f64 = -1.61;
const TAU_C_SMALLP: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_C_LARGEP: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010) response surfaces for the critical values (1%, 5%, 10%)
const TAU_C_CRIT: [[f64; 4]; 3] = [
    [-3.43035, -6.5393, -16.786, -79.433],
    [-2.86154, -2.8903, -4.234, -40.040],
    [-2.56677, -1.5384, -2.809, 0.0],
];

/// Dickey-Fuller critical values at the usual levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

/// Result of the unit-root test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnitRootResult {
    /// Slope of dx on lagged x (negative = mean reverting)
    pub rho: f64,
    pub intercept: f64,
    /// t-ratio of rho
    pub adf_statistic: f64,
    /// Approximate p-value for the unit-root null
    pub p_value: f64,
    pub critical_values: CriticalValues,
    /// Observations used in the regression
    pub nobs: usize,
}

impl UnitRootResult {
    /// Half-life implied by `rho`, `None` when there is no mean reversion
    pub fn half_life(&self) -> Option<usize> {
        half_life(self.rho)
    }

    /// Whether the unit-root null is rejected at `significance`
    pub fn rejects_unit_root(&self, significance: f64) -> bool {
        self.p_value < significance
    }
}

/// Result of the variance-ratio test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VarianceRatioResult {
    pub k: usize,
    pub ratio: f64,
    pub z_homoskedastic: f64,
    pub z_heteroskedastic: f64,
    pub p_homoskedastic: f64,
    pub p_heteroskedastic: f64,
}

/// Combined stationarity diagnostics for one series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationarityReport {
    pub unit_root: UnitRootResult,
    pub half_life: Option<usize>,
    /// Only defined for strictly positive series
    pub variance_ratio: Option<VarianceRatioResult>,
    /// Only defined for strictly positive series
    pub hurst: Option<f64>,
    pub is_stationary: bool,
}

/// Unit-root test with zero augmentation lags and a constant
pub fn unit_root_test(series: &[f64]) -> Result<UnitRootResult, AnalysisError> {
    AnalysisError::require_len(MIN_UNIT_ROOT_LEN, series.len())?;
    AnalysisError::require_finite(series, "series")?;

    let lagged = &series[..series.len() - 1];
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let fit = ols_fit(lagged, &diffs)?;
    let adf_statistic = fit.slope_t_stat();
    let p_value = mackinnon_p_value(adf_statistic);
    let critical_values = mackinnon_critical_values(fit.nobs);

    tracing::debug!(
        "Unit-root test: rho={:.6}, adf={:.4}, p={:.4}, nobs={}",
        fit.slope,
        adf_statistic,
        p_value,
        fit.nobs
    );

    Ok(UnitRootResult {
        rho: fit.slope,
        intercept: fit.intercept,
        adf_statistic,
        p_value,
        critical_values,
        nobs: fit.nobs,
    })
}

/// `ceil(-ln 2 / rho)` for `rho < 0`
pub fn half_life(rho: f64) -> Option<usize> {
    if !rho.is_finite() || rho >= 0.0 {
        return None;
    }
    let periods = (-(2.0_f64.ln()) / rho).ceil();
    Some(periods as usize)
}

/// Lo-MacKinlay variance-ratio test on a price series at horizon `k`
pub fn variance_ratio_test(prices: &[f64], k: usize) -> Result<VarianceRatioResult, AnalysisError> {
    if k < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "variance-ratio horizon must be at least 2, got {}",
            k
        )));
    }
    AnalysisError::require_len(k + 2, prices.len())?;
    AnalysisError::require_finite(prices, "prices")?;
    AnalysisError::require_positive(prices, "prices")?;

    let log_prices: Vec<f64> = prices.iter().map(|p| p.ln()).collect();
    let rets: Vec<f64> = log_prices.windows(2).map(|w| w[1] - w[0]).collect();
    let t = rets.len();
    let tf = t as f64;
    let kf = k as f64;

    let mu = rets.iter().sum::<f64>() / tf;
    let sum_sq_dev: f64 = rets.iter().map(|r| (r - mu).powi(2)).sum();
    let var_1 = sum_sq_dev / (tf - 1.0);
    AnalysisError::require_variance(var_1, mu, "one-period returns")?;

    // overlapping k-period returns, bias-corrected
    let m = kf * (tf - kf + 1.0) * (1.0 - kf / tf);
    let var_k = log_prices
        .iter()
        .skip(k)
        .zip(&log_prices)
        .map(|(later, earlier)| (later - earlier - kf * mu).powi(2))
        .sum::<f64>()
        / m;
    let ratio = var_k / var_1;

    let phi_homo = 2.0 * (2.0 * kf - 1.0) * (kf - 1.0) / (3.0 * kf * tf);

    let denom = sum_sq_dev.powi(2);
    let phi_hetero: f64 = (1..k)
        .map(|j| {
            let delta: f64 = (j..t)
                .map(|s| ((rets[s] - mu) * (rets[s - j] - mu)).powi(2))
                .sum::<f64>()
                / denom;
            (2.0 * (kf - j as f64) / kf).powi(2) * delta
        })
        .sum();

    let z_homoskedastic = (ratio - 1.0) / phi_homo.sqrt();
    let z_heteroskedastic = (ratio - 1.0) / phi_hetero.sqrt();

    Ok(VarianceRatioResult {
        k,
        ratio,
        z_homoskedastic,
        z_heteroskedastic,
        p_homoskedastic: two_sided_p(z_homoskedastic),
        p_heteroskedastic: two_sided_p(z_heteroskedastic),
    })
}

/// Half the slope of log(var of lag-differences of log x) on log(lag), lags `2..max_lag`
pub fn hurst_exponent(series: &[f64], max_lag: usize) -> Result<f64, AnalysisError> {
    if max_lag < 4 {
        return Err(AnalysisError::InvalidInput(format!(
            "hurst max lag must be at least 4, got {}",
            max_lag
        )));
    }
    AnalysisError::require_len(max_lag + 1, series.len())?;
    AnalysisError::require_finite(series, "series")?;
    AnalysisError::require_positive(series, "series")?;

    let logs: Vec<f64> = series.iter().map(|v| v.ln()).collect();

    let mut log_lags = Vec::with_capacity(max_lag - 2);
    let mut log_tau = Vec::with_capacity(max_lag - 2);
    for lag in 2..max_lag {
        let diffs: Vec<f64> = logs[lag..]
            .iter()
            .zip(&logs)
            .map(|(later, earlier)| later - earlier)
            .collect();
        let (mean, tau) = mean_and_population_variance(&diffs);
        AnalysisError::require_variance(tau, mean, &format!("lag-{} differences", lag))?;
        log_lags.push((lag as f64).ln());
        log_tau.push(tau.ln());
    }

    let fit = ols_fit(&log_lags, &log_tau)?;
    Ok(fit.slope / 2.0)
}

/// Run all three diagnostics and classify the series
pub fn stationarity_analysis(
    series: &[f64],
    params: &StationarityParams,
) -> Result<StationarityReport, AnalysisError> {
    let unit_root = unit_root_test(series)?;
    let half_life = unit_root.half_life();

    let log_domain = series.iter().all(|v| *v > 0.0);
    let (variance_ratio, hurst) = if log_domain {
        // test at the half-life horizon when one exists
        let k = match half_life {
            Some(h) if h >= 2 && h + 2 <= series.len() => h,
            _ => params.variance_ratio_lag,
        };
        let variance_ratio = if k + 2 <= series.len() {
            Some(variance_ratio_test(series, k)?)
        } else {
            None
        };
        let hurst = if series.len() > params.hurst_max_lag {
            Some(hurst_exponent(series, params.hurst_max_lag)?)
        } else {
            tracing::debug!("Series too short for Hurst lags up to {}", params.hurst_max_lag);
            None
        };
        (variance_ratio, hurst)
    } else {
        tracing::debug!("Series is not strictly positive; skipping log-domain diagnostics");
        (None, None)
    };

    let is_stationary = half_life.is_some() && unit_root.rejects_unit_root(params.significance);

    tracing::info!(
        "Stationarity: rho={:.5}, p={:.4}, half_life={:?}, hurst={:?}, stationary={}",
        unit_root.rho,
        unit_root.p_value,
        half_life,
        hurst,
        is_stationary
    );

    Ok(StationarityReport {
        unit_root,
        half_life,
        variance_ratio,
        hurst,
        is_stationary,
    })
}

/// Standard normal CDF
pub(crate) fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Two-sided p-value of a standard normal statistic
pub(crate) fn two_sided_p(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    erfc(z.abs() / std::f64::consts::SQRT_2)
}

fn mackinnon_p_value(stat: f64) -> f64 {
    if stat.is_nan() {
        return f64::NAN;
    }
    if stat > TAU_MAX_C {
        return 1.0;
    }
    if stat < TAU_MIN_C {
        return 0.0;
    }
    let coeffs: &[f64] = if stat <= TAU_STAR_C {
        &TAU_C_SMALLP
    } else {
        &TAU_C_LARGEP
    };
    normal_cdf(polyval(coeffs, stat))
}

fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let inv = 1.0 / nobs as f64;
    CriticalValues {
        one_pct: polyval(&TAU_C_CRIT[0], inv),
        five_pct: polyval(&TAU_C_CRIT[1], inv),
        ten_pct: polyval(&TAU_C_CRIT[2], inv),
    }
}

/// `c0 + c1*x + c2*x^2 + ...`
fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn mean_and_population_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::synthetic::{ar1_series, random_walk};
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_root_requires_three_points() {
        assert!(matches!(
            unit_root_test(&[1.0, 2.0]),
            Err(AnalysisError::InsufficientData { required: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_unit_root_rejects_non_finite() {
        assert!(matches!(
            unit_root_test(&[1.0, f64::NAN, 2.0, 3.0]),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_random_walk_rarely_rejects() {
        let trials = 40;
        let rejections = (0..trials)
            .filter(|seed| {
                let walk = random_walk(500, 100.0, 1.0, *seed);
                unit_root_test(&walk).unwrap().p_value < 0.05
            })
            .count();
        // nominal rejection rate is 5%
        assert!(rejections <= 8, "random walk rejected {} of {} times", rejections, trials);
    }

    #[test]
    fn test_ar1_rejects_with_negative_rho() {
        let trials = 40;
        let mut rejections = 0;
        for seed in 0..trials {
            let series = ar1_series(500, 0.5, 1.0, seed);
            let result = unit_root_test(&series).unwrap();
            assert!(result.rho < 0.0);
            if result.p_value < 0.05 {
                rejections += 1;
            }
        }
        assert!(rejections >= 38, "AR(1) rejected only {} of {} times", rejections, trials);
    }

    #[test]
    fn test_half_life_matches_closed_form() {
        // dx = (phi - 1) x + e  ->  rho = phi - 1
        let phi: f64 = 0.9;
        let expected = (-(2.0_f64.ln()) / (phi - 1.0)).ceil() as f64;

        let short_err = {
            let r = unit_root_test(&ar1_series(500, phi, 1.0, 7)).unwrap();
            (r.half_life().unwrap() as f64 - expected).abs()
        };
        let long = unit_root_test(&ar1_series(20_000, phi, 1.0, 7)).unwrap();
        let long_err = (long.half_life().unwrap() as f64 - expected).abs();

        assert!(long_err <= 1.0, "half-life {:?} vs {}", long.half_life(), expected);
        assert!(long_err <= short_err.max(1.0));
    }

    #[test]
    fn test_half_life_undefined_without_reversion() {
        assert_eq!(half_life(0.0), None);
        assert_eq!(half_life(0.3), None);
        assert_eq!(half_life(f64::NAN), None);
        assert_eq!(half_life(-0.1), Some(7));
        assert_eq!(half_life(-0.5), Some(2));
    }

    #[test]
    fn test_mackinnon_p_value_anchors() {
        // 5% critical value for large samples
        assert_relative_eq!(mackinnon_p_value(-2.86), 0.05, epsilon = 0.01);
        assert_relative_eq!(mackinnon_p_value(-3.43), 0.01, epsilon = 0.005);
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        assert_eq!(mackinnon_p_value(-20.0), 0.0);
        assert!(mackinnon_p_value(0.0) > 0.9);
    }

    #[test]
    fn test_critical_values_ordering() {
        let cv = mackinnon_critical_values(250);
        assert!(cv.one_pct < cv.five_pct && cv.five_pct < cv.ten_pct);
        assert_relative_eq!(cv.five_pct, -2.873, epsilon = 0.005);
    }

    #[test]
    fn test_variance_ratio_random_walk_near_one() {
        let prices: Vec<f64> = random_walk(3000, 0.0, 0.01, 3)
            .into_iter()
            .map(|v| (v + 4.6).exp())
            .collect();
        let vr = variance_ratio_test(&prices, 5).unwrap();
        assert!((vr.ratio - 1.0).abs() < 0.15, "ratio {}", vr.ratio);
        assert!(vr.p_homoskedastic > 0.0 && vr.p_homoskedastic <= 1.0);
        assert!(vr.p_heteroskedastic > 0.0 && vr.p_heteroskedastic <= 1.0);
    }

    #[test]
    fn test_variance_ratio_mean_reverting_below_one() {
        let prices: Vec<f64> = ar1_series(3000, 0.5, 0.01, 11)
            .into_iter()
            .map(|v| (v + 4.6).exp())
            .collect();
        let vr = variance_ratio_test(&prices, 10).unwrap();
        assert!(vr.ratio < 0.5, "ratio {}", vr.ratio);
        assert!(vr.z_homoskedastic < 0.0);
        assert!(vr.p_homoskedastic < 0.01);
    }

    #[test]
    fn test_variance_ratio_input_checks() {
        assert!(matches!(
            variance_ratio_test(&[1.0, 2.0, 3.0, 4.0], 1),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(matches!(
            variance_ratio_test(&[1.0, 2.0, 3.0], 2),
            Err(AnalysisError::InsufficientData { .. })
        ));
        assert!(matches!(
            variance_ratio_test(&[1.0, -2.0, 3.0, 4.0, 5.0], 2),
            Err(AnalysisError::Domain(_))
        ));
    }

    #[test]
    fn test_hurst_random_walk_near_half() {
        let prices: Vec<f64> = random_walk(5000, 0.0, 0.01, 5)
            .into_iter()
            .map(|v| (v + 4.6).exp())
            .collect();
        let h = hurst_exponent(&prices, 100).unwrap();
        assert!((h - 0.5).abs() < 0.1, "hurst {}", h);
    }

    #[test]
    fn test_hurst_mean_reverting_below_half() {
        let prices: Vec<f64> = ar1_series(5000, 0.3, 0.01, 9)
            .into_iter()
            .map(|v| (v + 4.6).exp())
            .collect();
        let h = hurst_exponent(&prices, 100).unwrap();
        assert!(h < 0.2, "hurst {}", h);
    }

    #[test]
    fn test_hurst_domain_error() {
        let mut prices = vec![100.0; 200];
        prices[50] = 0.0;
        assert!(matches!(hurst_exponent(&prices, 20), Err(AnalysisError::Domain(_))));
    }

    #[test]
    fn test_hurst_constant_series_is_degenerate() {
        let prices = vec![100.0; 200];
        assert!(matches!(
            hurst_exponent(&prices, 20),
            Err(AnalysisError::NumericalDegeneracy(_))
        ));
    }

    #[test]
    fn test_constant_growth_is_degenerate() {
        // log returns are all ln(1.01); only rounding noise is left to measure
        let prices: Vec<f64> = (0..300).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        assert!(matches!(
            variance_ratio_test(&prices, 5),
            Err(AnalysisError::NumericalDegeneracy(_))
        ));
        assert!(matches!(
            hurst_exponent(&prices, 20),
            Err(AnalysisError::NumericalDegeneracy(_))
        ));
    }

    #[test]
    fn test_stationarity_analysis_classifies() {
        let params = StationarityParams::default();

        let stationary: Vec<f64> = ar1_series(1000, 0.5, 0.01, 21)
            .into_iter()
            .map(|v| (v + 4.6).exp())
            .collect();
        let report = stationarity_analysis(&stationary, &params).unwrap();
        assert!(report.is_stationary);
        assert!(report.half_life.is_some());
        assert!(report.variance_ratio.is_some());
        assert!(report.hurst.is_some());

        // negative values: log-domain diagnostics skipped, not failed
        let spread = ar1_series(1000, 0.5, 1.0, 22);
        let report = stationarity_analysis(&spread, &params).unwrap();
        assert!(report.variance_ratio.is_none());
        assert!(report.hurst.is_none());
    }
}
