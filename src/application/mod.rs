//! Application Layer - End-to-end runs
//!
//! The strategy pipeline, the parallel pair runner and synthetic data.

pub mod batch;
pub mod pipeline;
pub mod synthetic;

pub use batch::{run_pairs, BatchError, PairResult, PairSpec};
pub use pipeline::{BacktestReport, HedgeEstimate, PipelineOutcome, StrategyPipeline};
pub use synthetic::{ar1_series, cointegrated_pair, random_walk, PairSimulation};
