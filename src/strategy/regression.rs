//! Simple Linear Regression
//!
//! Closed-form single-regressor OLS with intercept: y = a + b*x + e.
//! Shared by the unit-root test, the hedge-ratio estimators and the Hurst fit.

use serde::Serialize;

use crate::domain::error::AnalysisError;

/// Below this the regressor is treated as constant
const MIN_SXX: f64 = 1e-14;

/// Result of an OLS fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OlsFit {
    pub intercept: f64,
    pub slope: f64,
    /// Standard error of the slope (NaN with fewer than 3 observations)
    pub slope_std_err: f64,
    /// Residual variance with n-2 degrees of freedom
    pub residual_variance: f64,
    pub nobs: usize,
}

impl OlsFit {
    /// t-ratio of the slope
    pub fn slope_t_stat(&self) -> f64 {
        self.slope / self.slope_std_err
    }
}

/// Fit `y = a + b*x` by least squares
pub fn ols_fit(x: &[f64], y: &[f64]) -> Result<OlsFit, AnalysisError> {
    if x.len() != y.len() {
        return Err(AnalysisError::InvalidInput(format!(
            "regressor has {} values, regressand has {}",
            x.len(),
            y.len()
        )));
    }
    AnalysisError::require_len(2, x.len())?;
    AnalysisError::require_finite(x, "regressor")?;
    AnalysisError::require_finite(y, "regressand")?;

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        sxx += dx * dx;
        sxy += dx * (yi - mean_y);
    }

    if sxx < MIN_SXX {
        return Err(AnalysisError::NumericalDegeneracy(
            "regressor has zero variance".to_string(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let sse: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| {
            let e = yi - intercept - slope * xi;
            e * e
        })
        .sum();

    let (residual_variance, slope_std_err) = if x.len() > 2 {
        let s2 = sse / (n - 2.0);
        (s2, (s2 / sxx).sqrt())
    } else {
        (f64::NAN, f64::NAN)
    };

    Ok(OlsFit {
        intercept,
        slope,
        slope_std_err,
        residual_variance,
        nobs: x.len(),
    })
}
