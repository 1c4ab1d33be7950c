//! Revert - Mean-Reversion Research Engine
//!
//! Tests price series for mean reversion, estimates how a set of series
//! co-move, and backtests z-score trading of the resulting spread.
//!
//! # Modules
//!
//! - `domain`: Core types (TimeSeries, AlignedPanel, HedgeVector, performance statistics)
//! - `strategy`: Estimators (stationarity, Johansen, OLS, Kalman) and the signal state machine
//! - `ports`: Trait abstractions (SeriesStore)
//! - `adapters`: External implementations (JSON files, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Strategy pipeline, parallel pair runner and synthetic data

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod strategy;
