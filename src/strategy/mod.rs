//! Strategy Layer - Statistical estimators and signal generation
//!
//! - Stationarity diagnostics: unit-root regression, half-life, variance ratio, Hurst
//! - Static hedge ratios: OLS and the Johansen procedure
//! - Dynamic hedge ratios: rolling OLS and a Kalman filter
//! - Rolling z-scores and the long/short leg state machines

pub mod cointegration;
pub mod dynamic_hedge;
pub mod johansen;
pub mod params;
pub mod regression;
pub mod signal_machine;
pub mod stationarity;
pub mod zscore_gate;

pub use cointegration::{compare_candidate_spreads, ols_hedge_ratio, CandidateSource, CandidateSpread};
pub use dynamic_hedge::{kalman_filter, kalman_hedge, rolling_ols, KalmanEstimate};
pub use johansen::{johansen_vectors, ConfidenceLevel, JohansenResult};
pub use params::{
    HedgeMethod, PerformanceParams, SignalMode, SignalThresholds, StationarityParams,
    StrategyConfig, ZWindow,
};
pub use signal_machine::{
    linear_units, LegEvent, LegMachine, LegSide, LegState, SignalEvent, SignalRun,
    SignalStateMachine,
};
pub use stationarity::{
    half_life, hurst_exponent, stationarity_analysis, unit_root_test, variance_ratio_test,
    StationarityReport, UnitRootResult, VarianceRatioResult,
};
pub use zscore_gate::{rolling_zscore, zscore_points, ZScorePoint};
