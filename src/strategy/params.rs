//! Strategy Parameters
//!
//! Every tunable the engine reads. Nothing in the estimators has a hidden
//! default; the pipeline passes these values down explicitly.

use serde::{Deserialize, Serialize};

/// Main strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub stationarity: StationarityParams,
    /// How the relationship between the series is estimated
    pub hedge: HedgeMethod,
    /// Rolling window of the z-score
    pub z_window: ZWindow,
    pub signal: SignalMode,
    pub performance: PerformanceParams,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            stationarity: StationarityParams::default(),
            hedge: HedgeMethod::Johansen,
            z_window: ZWindow::HalfLife { min: 5, max: 120 },
            signal: SignalMode::Bands(SignalThresholds::default()),
            performance: PerformanceParams::default(),
        }
    }
}

impl StrategyConfig {
    /// Create a new config with a different hedge estimator
    pub fn with_hedge(mut self, hedge: HedgeMethod) -> Self {
        self.hedge = hedge;
        self
    }

    /// Create a new config with a different z-score window
    pub fn with_z_window(mut self, z_window: ZWindow) -> Self {
        self.z_window = z_window;
        self
    }

    pub fn with_signal(mut self, signal: SignalMode) -> Self {
        self.signal = signal;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stationarity.validate()?;
        self.hedge.validate()?;
        self.z_window.validate()?;
        if let SignalMode::Bands(thresholds) = &self.signal {
            thresholds.validate()?;
        }
        self.performance.validate()?;
        Ok(())
    }
}

/// Parameters of the stationarity diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityParams {
    /// Variance-ratio horizon used when the half-life is undefined
    pub variance_ratio_lag: usize,
    /// Exclusive upper lag of the Hurst regression
    pub hurst_max_lag: usize,
    /// p-value below which the unit root is rejected
    pub significance: f64,
}

impl Default for StationarityParams {
    fn default() -> Self {
        Self {
            variance_ratio_lag: 10,
            hurst_max_lag: 100,
            significance: 0.05,
        }
    }
}

impl StationarityParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.variance_ratio_lag < 2 {
            return Err(ConfigError::InvalidVarianceRatioLag(self.variance_ratio_lag));
        }
        if self.hurst_max_lag < 4 {
            return Err(ConfigError::InvalidHurstLag(self.hurst_max_lag));
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(ConfigError::InvalidSignificance(self.significance));
        }
        Ok(())
    }
}

/// Trailing window used when rolling OLS is selected without one
pub const DEFAULT_ROLLING_LOOKBACK: usize = 60;

/// Slope drift used when the Kalman filter is selected without one
pub const DEFAULT_KALMAN_DELTA: f64 = 1e-5;

/// Hedge estimator selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum HedgeMethod {
    /// Static OLS of the second series on the first
    Ols,
    /// Strongest Johansen eigenvector
    Johansen,
    /// Trailing-window OLS refitted at every step
    RollingOls { lookback: usize },
    /// Recursive filter with random-walk slope and intercept
    Kalman { delta: f64 },
}

impl HedgeMethod {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            HedgeMethod::RollingOls { lookback } if lookback < 2 => {
                Err(ConfigError::InvalidWindow(lookback))
            }
            HedgeMethod::Kalman { delta } if !(delta > 0.0 && delta < 1.0) => {
                Err(ConfigError::InvalidDelta(delta))
            }
            _ => Ok(()),
        }
    }

    /// Static methods accept any number of series; dynamic ones need a pair
    pub fn is_dynamic(&self) -> bool {
        matches!(self, HedgeMethod::RollingOls { .. } | HedgeMethod::Kalman { .. })
    }
}

/// Window of the rolling z-score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZWindow {
    Fixed { window: usize },
    /// Spread half-life clamped into `[min, max]`
    HalfLife { min: usize, max: usize },
}

impl ZWindow {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            ZWindow::Fixed { window } if window < 2 => Err(ConfigError::InvalidWindow(window)),
            ZWindow::HalfLife { min, .. } if min < 2 => Err(ConfigError::InvalidWindow(min)),
            ZWindow::HalfLife { min, max } if min > max => {
                Err(ConfigError::InvalidWindowRange { min, max })
            }
            _ => Ok(()),
        }
    }
}

/// How z-scores become positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SignalMode {
    /// Entry/exit thresholds driving the long and short leg machines
    Bands(SignalThresholds),
    /// Hold `-z` units
    Linear,
}

/// Entry/exit z-thresholds of both legs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub long_entry: f64,
    pub long_exit: f64,
    pub short_entry: f64,
    pub short_exit: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            long_entry: -0.5,
            long_exit: -0.1,
            short_entry: 0.5,
            short_exit: 0.1,
        }
    }
}

impl SignalThresholds {
    /// Symmetric bands: enter beyond `±entry`, exit inside `±exit`
    pub fn symmetric(entry: f64, exit: f64) -> Self {
        Self {
            long_entry: -entry,
            long_exit: -exit,
            short_entry: entry,
            short_exit: exit,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let all = [self.long_entry, self.long_exit, self.short_entry, self.short_exit];
        if all.iter().any(|t| !t.is_finite()) {
            return Err(ConfigError::NonFiniteThreshold);
        }
        if self.long_entry > self.long_exit {
            return Err(ConfigError::InvalidLongBand {
                entry: self.long_entry,
                exit: self.long_exit,
            });
        }
        if self.short_entry < self.short_exit {
            return Err(ConfigError::InvalidShortBand {
                entry: self.short_entry,
                exit: self.short_exit,
            });
        }
        Ok(())
    }
}

/// Annualization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceParams {
    pub periods_per_year: f64,
    /// Per-period risk-free rate subtracted in the Sharpe ratio
    pub risk_free_rate: f64,
}

impl Default for PerformanceParams {
    fn default() -> Self {
        Self {
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }
}

impl PerformanceParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.periods_per_year > 0.0 && self.periods_per_year.is_finite()) {
            return Err(ConfigError::InvalidPeriodsPerYear(self.periods_per_year));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(ConfigError::InvalidRiskFreeRate(self.risk_free_rate));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid window: {0} (minimum 2)")]
    InvalidWindow(usize),
    #[error("Invalid window range: min {min} > max {max}")]
    InvalidWindowRange { min: usize, max: usize },
    #[error("Invalid Kalman delta: {0} (must be 0 < delta < 1)")]
    InvalidDelta(f64),
    #[error("Invalid variance-ratio lag: {0} (minimum 2)")]
    InvalidVarianceRatioLag(usize),
    #[error("Invalid Hurst max lag: {0} (minimum 4)")]
    InvalidHurstLag(usize),
    #[error("Invalid significance level: {0} (must be 0 < p < 1)")]
    InvalidSignificance(f64),
    #[error("Signal thresholds must be finite")]
    NonFiniteThreshold,
    #[error("Invalid long band: entry {entry} above exit {exit}")]
    InvalidLongBand { entry: f64, exit: f64 },
    #[error("Invalid short band: entry {entry} below exit {exit}")]
    InvalidShortBand { entry: f64, exit: f64 },
    #[error("Invalid periods per year: {0}")]
    InvalidPeriodsPerYear(f64),
    #[error("Invalid risk-free rate: {0}")]
    InvalidRiskFreeRate(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StrategyConfig::default();
        assert_eq!(config.hedge, HedgeMethod::Johansen);
        assert_eq!(config.performance.periods_per_year, 252.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = StrategyConfig::default()
            .with_hedge(HedgeMethod::Kalman { delta: 1e-4 })
            .with_z_window(ZWindow::Fixed { window: 20 })
            .with_signal(SignalMode::Linear);
        assert!(config.hedge.is_dynamic());
        assert_eq!(config.z_window, ZWindow::Fixed { window: 20 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_delta() {
        for delta in [0.0, 1.0, -0.1, f64::NAN] {
            let config = StrategyConfig::default().with_hedge(HedgeMethod::Kalman { delta });
            assert!(matches!(config.validate(), Err(ConfigError::InvalidDelta(_))));
        }
    }

    #[test]
    fn test_invalid_windows() {
        let config = StrategyConfig::default().with_z_window(ZWindow::Fixed { window: 1 });
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow(1))));

        let config = StrategyConfig::default().with_z_window(ZWindow::HalfLife { min: 30, max: 10 });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindowRange { min: 30, max: 10 })
        ));

        let config = StrategyConfig::default().with_hedge(HedgeMethod::RollingOls { lookback: 0 });
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow(0))));
    }

    #[test]
    fn test_threshold_ordering() {
        let crossed = SignalThresholds {
            long_entry: 0.5,
            long_exit: 0.0,
            ..Default::default()
        };
        assert!(matches!(crossed.validate(), Err(ConfigError::InvalidLongBand { .. })));

        let crossed = SignalThresholds {
            short_entry: -0.5,
            short_exit: 0.0,
            ..Default::default()
        };
        assert!(matches!(crossed.validate(), Err(ConfigError::InvalidShortBand { .. })));

        let equal = SignalThresholds::symmetric(0.0, 0.0);
        assert!(equal.validate().is_ok());

        let nan = SignalThresholds {
            long_exit: f64::NAN,
            ..Default::default()
        };
        assert_eq!(nan.validate(), Err(ConfigError::NonFiniteThreshold));
    }

    #[test]
    fn test_linear_mode_skips_band_checks() {
        let config = StrategyConfig::default().with_signal(SignalMode::Linear);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stationarity_param_validation() {
        let mut params = StationarityParams::default();
        assert!(params.validate().is_ok());

        params.hurst_max_lag = 3;
        assert_eq!(params.validate(), Err(ConfigError::InvalidHurstLag(3)));

        params = StationarityParams {
            significance: 1.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_performance_param_validation() {
        let params = PerformanceParams {
            periods_per_year: 0.0,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(ConfigError::InvalidPeriodsPerYear(_))));
    }
}
