//! Analysis error taxonomy
//!
//! Every estimator surfaces its failure immediately; nothing here is retried.
//! Undefined-but-valid outcomes (NaN Sharpe, missing half-life) are values, not errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Insufficient data: requires {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),
}

impl AnalysisError {
    /// Fail with `InsufficientData` unless `actual >= required`
    pub fn require_len(required: usize, actual: usize) -> Result<(), AnalysisError> {
        if actual < required {
            return Err(AnalysisError::InsufficientData { required, actual });
        }
        Ok(())
    }

    /// Fail with `InvalidInput` if any value is NaN or infinite
    pub fn require_finite(values: &[f64], label: &str) -> Result<(), AnalysisError> {
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(AnalysisError::InvalidInput(format!(
                "{} contains a non-finite value at index {}",
                label, pos
            )));
        }
        Ok(())
    }

    /// Fail with `Domain` unless every value is strictly positive
    pub fn require_positive(values: &[f64], label: &str) -> Result<(), AnalysisError> {
        if let Some(pos) = values.iter().position(|v| v.is_nan() || *v <= 0.0) {
            return Err(AnalysisError::Domain(format!(
                "{} must be strictly positive for log transform (index {} = {})",
                label, pos, values[pos]
            )));
        }
        Ok(())
    }

    /// Fail with `NumericalDegeneracy` when a variance is only rounding noise
    pub fn require_variance(variance: f64, mean: f64, label: &str) -> Result<(), AnalysisError> {
        if negligible_variance(variance, mean) {
            return Err(AnalysisError::NumericalDegeneracy(format!(
                "{} have zero variance",
                label
            )));
        }
        Ok(())
    }
}

/// True when `variance` is indistinguishable from zero at the scale of `mean`
pub fn negligible_variance(variance: f64, mean: f64) -> bool {
    variance.is_nan() || variance <= f64::EPSILON * mean.abs().max(1.0).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_len() {
        assert!(AnalysisError::require_len(3, 3).is_ok());
        assert_eq!(
            AnalysisError::require_len(3, 2),
            Err(AnalysisError::InsufficientData { required: 3, actual: 2 })
        );
    }

    #[test]
    fn test_require_finite() {
        assert!(AnalysisError::require_finite(&[1.0, 2.0], "x").is_ok());
        let err = AnalysisError::require_finite(&[1.0, f64::NAN], "x").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[test]
    fn test_require_positive() {
        assert!(AnalysisError::require_positive(&[0.1, 2.0], "prices").is_ok());
        assert!(matches!(
            AnalysisError::require_positive(&[1.0, 0.0], "prices"),
            Err(AnalysisError::Domain(_))
        ));
        assert!(matches!(
            AnalysisError::require_positive(&[f64::NAN], "prices"),
            Err(AnalysisError::Domain(_))
        ));
    }

    #[test]
    fn test_negligible_variance() {
        // rounding leftovers of a constant stream
        assert!(negligible_variance(1e-36, 0.01));
        assert!(negligible_variance(0.0, 0.0));
        assert!(negligible_variance(f64::NAN, 0.0));
        assert!(!negligible_variance(1e-6, 0.001));
        assert!(matches!(
            AnalysisError::require_variance(0.0, 5.0, "returns"),
            Err(AnalysisError::NumericalDegeneracy(_))
        ));
        assert!(AnalysisError::require_variance(1e-4, 0.0, "returns").is_ok());
    }
}
