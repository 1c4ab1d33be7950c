//! Domain Layer - Core types of the revert engine
//!
//! Date-indexed series, aligned panels, hedge vectors, position tallies and
//! performance statistics. No I/O and no estimation lives here.

pub mod error;
pub mod performance;
pub mod series;

pub use error::AnalysisError;
pub use performance::{
    annualized_return, kelly_leverage, max_drawdown, mean_return_t_test, sharpe_ratio, summarize,
    summarize_wealth_curve, MeanReturnTest, PerformanceSummary,
};
pub use series::{
    AlignedPanel, HedgeRatioSeries, HedgeVector, PositionSeries, ReturnSeries, TimeSeries,
};
