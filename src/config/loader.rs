//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/revert.toml.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::strategy::params::{
    HedgeMethod, PerformanceParams, SignalMode, SignalThresholds, StationarityParams,
    StrategyConfig, ZWindow, DEFAULT_KALMAN_DELTA, DEFAULT_ROLLING_LOOKBACK,
};

/// Main configuration structure matching config/revert.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataSection,
    #[serde(default)]
    pub stationarity: StationaritySection,
    pub hedge: HedgeSection,
    pub signal: SignalSection,
    #[serde(default)]
    pub performance: PerformanceSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Price data location
#[derive(Debug, Clone, Deserialize)]
pub struct DataSection {
    /// Directory of `<name>.json` series files
    pub dir: String,
}

/// Stationarity test settings
#[derive(Debug, Clone, Deserialize)]
pub struct StationaritySection {
    pub variance_ratio_lag: usize,
    pub hurst_max_lag: usize,
    pub significance: f64,
}

/// Hedge estimator settings
#[derive(Debug, Clone, Deserialize)]
pub struct HedgeSection {
    /// "ols", "johansen", "rolling_ols" or "kalman"
    pub method: String,
    /// Trailing window for rolling_ols
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    /// Slope drift for kalman
    #[serde(default = "default_delta")]
    pub delta: f64,
}

/// Z-score window and position rule
#[derive(Debug, Clone, Deserialize)]
pub struct SignalSection {
    /// "bands" or "linear"
    pub mode: String,
    /// Fixed z-score window; 0 derives it from the spread half-life
    #[serde(default)]
    pub z_window: usize,
    #[serde(default = "default_min_window")]
    pub min_window: usize,
    #[serde(default = "default_max_window")]
    pub max_window: usize,
    #[serde(default = "default_long_entry")]
    pub long_entry: f64,
    #[serde(default = "default_long_exit")]
    pub long_exit: f64,
    #[serde(default = "default_short_entry")]
    pub short_entry: f64,
    #[serde(default = "default_short_exit")]
    pub short_exit: f64,
}

/// Return annualization
#[derive(Debug, Clone, Deserialize)]
pub struct PerformanceSection {
    pub periods_per_year: f64,
    pub risk_free_rate: f64,
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

fn default_lookback() -> usize {
    DEFAULT_ROLLING_LOOKBACK
}

fn default_delta() -> f64 {
    DEFAULT_KALMAN_DELTA
}

fn default_min_window() -> usize {
    5
}

fn default_max_window() -> usize {
    120
}

fn default_long_entry() -> f64 {
    SignalThresholds::default().long_entry
}

fn default_long_exit() -> f64 {
    SignalThresholds::default().long_exit
}

fn default_short_entry() -> f64 {
    SignalThresholds::default().short_entry
}

fn default_short_exit() -> f64 {
    SignalThresholds::default().short_exit
}

impl Default for StationaritySection {
    fn default() -> Self {
        let params = StationarityParams::default();
        Self {
            variance_ratio_lag: params.variance_ratio_lag,
            hurst_max_lag: params.hurst_max_lag,
            significance: params.significance,
        }
    }
}

impl Default for PerformanceSection {
    fn default() -> Self {
        let params = PerformanceParams::default();
        Self {
            periods_per_year: params.periods_per_year,
            risk_free_rate: params.risk_free_rate,
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "data dir cannot be empty".to_string(),
            ));
        }

        if !matches!(
            self.logging.level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::ValidationError(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }

        self.strategy_config()?
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Assemble engine parameters, rejecting unknown method or mode names
    pub fn strategy_config(&self) -> Result<StrategyConfig, ConfigError> {
        Ok(StrategyConfig {
            stationarity: StationarityParams {
                variance_ratio_lag: self.stationarity.variance_ratio_lag,
                hurst_max_lag: self.stationarity.hurst_max_lag,
                significance: self.stationarity.significance,
            },
            hedge: self.hedge.method()?,
            z_window: self.signal.z_window(),
            signal: self.signal.mode()?,
            performance: PerformanceParams {
                periods_per_year: self.performance.periods_per_year,
                risk_free_rate: self.performance.risk_free_rate,
            },
        })
    }
}

impl DataSection {
    /// Data directory with `REVERT_DATA_DIR` taking precedence, `~` expanded
    pub fn get_dir(&self) -> String {
        let dir = std::env::var("REVERT_DATA_DIR")
            .ok()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.dir.clone());
        shellexpand::tilde(&dir).to_string()
    }
}

impl HedgeSection {
    pub fn method(&self) -> Result<HedgeMethod, ConfigError> {
        match self.method.as_str() {
            "ols" => Ok(HedgeMethod::Ols),
            "johansen" => Ok(HedgeMethod::Johansen),
            "rolling_ols" => Ok(HedgeMethod::RollingOls {
                lookback: self.lookback,
            }),
            "kalman" => Ok(HedgeMethod::Kalman { delta: self.delta }),
            other => Err(ConfigError::ValidationError(format!(
                "unknown hedge method '{}'",
                other
            ))),
        }
    }
}

impl SignalSection {
    pub fn z_window(&self) -> ZWindow {
        if self.z_window == 0 {
            ZWindow::HalfLife {
                min: self.min_window,
                max: self.max_window,
            }
        } else {
            ZWindow::Fixed {
                window: self.z_window,
            }
        }
    }

    pub fn mode(&self) -> Result<SignalMode, ConfigError> {
        match self.mode.as_str() {
            "bands" => Ok(SignalMode::Bands(SignalThresholds {
                long_entry: self.long_entry,
                long_exit: self.long_exit,
                short_entry: self.short_entry,
                short_exit: self.short_exit,
            })),
            "linear" => Ok(SignalMode::Linear),
            other => Err(ConfigError::ValidationError(format!(
                "unknown signal mode '{}'",
                other
            ))),
        }
    }
}

// Conversion from a validated Config to StrategyConfig
impl From<&Config> for StrategyConfig {
    fn from(config: &Config) -> Self {
        config.strategy_config().unwrap_or_else(|e| {
            tracing::warn!("Falling back to default strategy config: {}", e);
            StrategyConfig::default()
        })
    }
}
