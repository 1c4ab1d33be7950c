//! Batch Runner
//!
//! Runs independent pairs in parallel. Each pair gets its own pipeline on a
//! blocking worker; nothing mutable is shared between them.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::pipeline::{PipelineOutcome, StrategyPipeline};
use crate::domain::error::AnalysisError;
use crate::ports::series_store::{SeriesStore, StoreError};
use crate::strategy::params::StrategyConfig;

/// Two series names, `x` first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSpec {
    pub x: String,
    pub y: String,
}

impl fmt::Display for PairSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

impl FromStr for PairSpec {
    type Err = String;

    /// Parses `x:y`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((x, y)) if !x.is_empty() && !y.is_empty() && !y.contains(':') => Ok(Self {
                x: x.to_string(),
                y: y.to_string(),
            }),
            _ => Err(format!("expected a pair as 'x:y', got '{}'", s)),
        }
    }
}

/// Per-pair failure
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Worker failed: {0}")]
    Join(String),
}

/// Outcome of one pair
#[derive(Debug)]
pub struct PairResult {
    pub pair: PairSpec,
    pub outcome: Result<PipelineOutcome, BatchError>,
}

/// Run every pair through its own pipeline, results in input order
///
/// The configuration is checked once up front; after that a failing pair only
/// affects its own result.
pub async fn run_pairs(
    store: Arc<dyn SeriesStore>,
    pairs: Vec<PairSpec>,
    config: StrategyConfig,
) -> Result<Vec<PairResult>, AnalysisError> {
    let pipeline = StrategyPipeline::new(config)?;
    tracing::info!("Running {} pairs", pairs.len());

    let handles: Vec<_> = pairs
        .into_iter()
        .map(|pair| {
            let store = Arc::clone(&store);
            let pipeline = pipeline.clone();
            let task_pair = pair.clone();
            let handle = tokio::task::spawn_blocking(move || -> Result<PipelineOutcome, BatchError> {
                let panel = store.load_panel(&[task_pair.x.as_str(), task_pair.y.as_str()])?;
                Ok(pipeline.run(&panel)?)
            });
            (pair, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (pair, handle) in handles {
        let outcome = handle
            .await
            .map_err(|e| BatchError::Join(format!("Task join error: {}", e)))
            .and_then(|r| r);

        if let Err(e) = &outcome {
            tracing::warn!("Pair {} failed: {}", pair, e);
        }
        results.push(PairResult { pair, outcome });
    }

    Ok(results)
}
