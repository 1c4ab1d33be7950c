//! Strategy Pipeline
//!
//! One end-to-end pass over an aligned panel:
//!
//! estimate hedge -> build spread -> half-life -> z-score -> positions -> returns -> performance
//!
//! Each run is independent. Estimator failures are returned as-is; a spread
//! without mean reversion ends the run with [`PipelineOutcome::NonStationary`].
//! A one-column panel is traded outright: the series is its own spread.

use serde::Serialize;

use crate::domain::error::AnalysisError;
use crate::domain::performance::{mean_return_t_test, summarize, MeanReturnTest, PerformanceSummary};
use crate::domain::series::{AlignedPanel, HedgeRatioSeries, HedgeVector, ReturnSeries, TimeSeries};
use crate::strategy::cointegration::ols_hedge_ratio;
use crate::strategy::dynamic_hedge::{kalman_hedge, rolling_ols};
use crate::strategy::johansen::johansen_vectors;
use crate::strategy::params::{HedgeMethod, SignalMode, StrategyConfig, ZWindow};
use crate::strategy::signal_machine::{linear_units, LegEvent, SignalStateMachine};
use crate::strategy::stationarity::{unit_root_test, UnitRootResult};
use crate::strategy::zscore_gate::rolling_zscore;

/// Hedge produced by the configured estimator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeEstimate {
    /// Single series, no hedge
    Outright,
    Static(HedgeVector),
    Dynamic(HedgeRatioSeries),
}

impl HedgeEstimate {
    fn spread(&self, panel: &AlignedPanel) -> Result<TimeSeries, AnalysisError> {
        match self {
            HedgeEstimate::Outright => panel
                .series(0)
                .ok_or_else(|| AnalysisError::InvalidInput("panel has no series".to_string())),
            HedgeEstimate::Static(vector) => panel.spread(vector),
            HedgeEstimate::Dynamic(series) => panel.dynamic_spread(series),
        }
    }

    fn vector_at(&self, date: chrono::NaiveDate) -> Option<&HedgeVector> {
        match self {
            HedgeEstimate::Outright => None,
            HedgeEstimate::Static(vector) => Some(vector),
            HedgeEstimate::Dynamic(series) => series.get(date),
        }
    }
}

/// Everything a traded run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub names: Vec<String>,
    pub hedge: HedgeEstimate,
    pub spread_unit_root: UnitRootResult,
    pub half_life: usize,
    pub z_window: usize,
    /// Leg entries fired; `None` in linear mode
    pub entries: Option<usize>,
    /// Units held at each z-score timestamp
    pub exposure: TimeSeries,
    pub returns: ReturnSeries,
    pub performance: PerformanceSummary,
    /// `None` when the returns are too few or have no variance
    pub mean_return_test: Option<MeanReturnTest>,
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Traded(Box<BacktestReport>),
    /// The spread shows no mean reversion, so no signal is generated
    NonStationary { spread_unit_root: UnitRootResult },
}

impl PipelineOutcome {
    pub fn report(&self) -> Option<&BacktestReport> {
        match self {
            PipelineOutcome::Traded(report) => Some(report),
            PipelineOutcome::NonStationary { .. } => None,
        }
    }
}

/// Composes the estimators into one backtest
#[derive(Debug, Clone)]
pub struct StrategyPipeline {
    config: StrategyConfig,
}

impl StrategyPipeline {
    pub fn new(config: StrategyConfig) -> Result<Self, AnalysisError> {
        config
            .validate()
            .map_err(|e| AnalysisError::InvalidInput(e.to_string()))?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Trade one series directly against its own rolling z-score
    pub fn run_series(&self, name: &str, series: &TimeSeries) -> Result<PipelineOutcome, AnalysisError> {
        let panel = AlignedPanel::align(&[(name, series)])?;
        self.run(&panel)
    }

    pub fn run(&self, panel: &AlignedPanel) -> Result<PipelineOutcome, AnalysisError> {
        panel.validate_finite()?;
        tracing::info!(
            "Pipeline start: series={:?}, rows={}, hedge={:?}",
            panel.names(),
            panel.len(),
            self.config.hedge
        );

        let hedge = self.estimate_hedge(panel)?;
        let spread = hedge.spread(panel)?;

        let spread_unit_root = unit_root_test(spread.values())?;
        let Some(half_life) = spread_unit_root.half_life() else {
            tracing::warn!(
                "Spread is not mean reverting (rho={:.5}); no signal generated",
                spread_unit_root.rho
            );
            return Ok(PipelineOutcome::NonStationary { spread_unit_root });
        };

        let z_window = match self.config.z_window {
            ZWindow::Fixed { window } => window,
            ZWindow::HalfLife { min, max } => half_life.clamp(min, max),
        };
        tracing::info!(
            "Spread half-life={} (p={:.4}), z window={}",
            half_life,
            spread_unit_root.p_value,
            z_window
        );

        let z = rolling_zscore(&spread, z_window)?;

        let (exposure, entries) = match self.config.signal {
            SignalMode::Bands(thresholds) => {
                let run = SignalStateMachine::new(thresholds)?.run(&z);
                let entries = run.events.iter().filter(|e| e.event == LegEvent::Entry).count();
                (run.positions.exposure(), Some(entries))
            }
            SignalMode::Linear => (linear_units(&z), None),
        };

        let linear = matches!(self.config.signal, SignalMode::Linear);
        let returns = strategy_returns(panel, &hedge, &exposure, linear)?;

        let perf = &self.config.performance;
        let performance = summarize(returns.values(), perf.periods_per_year, perf.risk_free_rate)?;
        let mean_return_test = match mean_return_t_test(returns.values()) {
            Ok(test) => Some(test),
            Err(e) => {
                tracing::debug!("Mean return t-test skipped: {}", e);
                None
            }
        };

        tracing::info!(
            "Pipeline done: periods={}, APR={:.4}, Sharpe={:.3}, MaxDD={:.4}",
            performance.periods,
            performance.annualized_return,
            performance.sharpe_ratio,
            performance.max_drawdown
        );

        Ok(PipelineOutcome::Traded(Box::new(BacktestReport {
            names: panel.names().to_vec(),
            hedge,
            spread_unit_root,
            half_life,
            z_window,
            entries,
            exposure,
            returns,
            performance,
            mean_return_test,
        })))
    }

    fn estimate_hedge(&self, panel: &AlignedPanel) -> Result<HedgeEstimate, AnalysisError> {
        match panel.n_series() {
            0 => {
                return Err(AnalysisError::InvalidInput(
                    "pipeline needs at least 1 series".to_string(),
                ))
            }
            1 => {
                tracing::debug!("Single series: hedge method {:?} not used", self.config.hedge);
                return Ok(HedgeEstimate::Outright);
            }
            _ => {}
        }

        match self.config.hedge {
            HedgeMethod::Ols => {
                let (x, y) = match (panel.column(0), panel.column(1)) {
                    (Some(x), Some(y)) if panel.n_series() == 2 => (x, y),
                    _ => {
                        return Err(AnalysisError::InvalidInput(
                            "OLS hedge needs exactly 2 series".to_string(),
                        ))
                    }
                };
                let beta = ols_hedge_ratio(x, y)?;
                Ok(HedgeEstimate::Static(HedgeVector::new(vec![beta, -1.0]).normalized()?))
            }
            HedgeMethod::Johansen => {
                let johansen = johansen_vectors(panel)?;
                Ok(HedgeEstimate::Static(johansen.strongest_vector()?))
            }
            HedgeMethod::RollingOls { lookback } => {
                Ok(HedgeEstimate::Dynamic(rolling_ols(panel, lookback)?))
            }
            HedgeMethod::Kalman { delta } => Ok(HedgeEstimate::Dynamic(kalman_hedge(panel, delta)?)),
        }
    }
}

/// Per-period strategy returns of a hedged portfolio
///
/// An outright series earns `units * (p[t+1]/p[t] - 1)` whatever the signal
/// mode. For a hedged portfolio, leg capital is `price * weight`. The unit portfolio earns
/// `sum(capital * forward return) / sum(|capital|)`, zero when no capital is
/// deployed. Band positions scale that return by the units held; linear
/// positions are sized in capital, so only their sign matters. The last panel
/// row has no forward price and never earns a return.
pub fn strategy_returns(
    panel: &AlignedPanel,
    hedge: &HedgeEstimate,
    exposure: &TimeSeries,
    linear: bool,
) -> Result<ReturnSeries, AnalysisError> {
    if let HedgeEstimate::Outright = hedge {
        return outright_returns(panel, exposure);
    }

    let mut timestamps = Vec::with_capacity(exposure.len());
    let mut values = Vec::with_capacity(exposure.len());

    for (date, units) in exposure.iter() {
        let t = panel.timestamps().binary_search(&date).map_err(|_| {
            AnalysisError::InvalidInput(format!("position date {} is not in the panel index", date))
        })?;
        if t + 1 >= panel.len() {
            continue;
        }
        let vector = hedge.vector_at(date).ok_or_else(|| {
            AnalysisError::InvalidInput(format!("no hedge vector at {}", date))
        })?;

        let mut pnl = 0.0;
        let mut gross = 0.0;
        for (weight, column) in vector.weights().iter().zip(panel.columns()) {
            let capital = column[t] * weight;
            pnl += capital * (column[t + 1] / column[t] - 1.0);
            gross += capital.abs();
        }
        let unit_return = if gross > 0.0 { pnl / gross } else { 0.0 };

        let size = if linear { sign_or_zero(units) } else { units };
        timestamps.push(date);
        values.push(size * unit_return);
    }

    TimeSeries::new(timestamps, values)
}

fn outright_returns(panel: &AlignedPanel, exposure: &TimeSeries) -> Result<ReturnSeries, AnalysisError> {
    let series = panel
        .series(0)
        .ok_or_else(|| AnalysisError::InvalidInput("panel has no series".to_string()))?;
    // dated at the later row
    let changes = series.pct_change();

    let mut timestamps = Vec::with_capacity(exposure.len());
    let mut values = Vec::with_capacity(exposure.len());
    for (date, units) in exposure.iter() {
        let t = series.timestamps().binary_search(&date).map_err(|_| {
            AnalysisError::InvalidInput(format!("position date {} is not in the series index", date))
        })?;
        let Some(&next) = series.timestamps().get(t + 1) else {
            continue;
        };
        let forward = changes.get(next).ok_or_else(|| {
            AnalysisError::InvalidInput(format!("no forward return after {}", date))
        })?;
        timestamps.push(date);
        values.push(units * forward);
    }

    TimeSeries::new(timestamps, values)
}

fn sign_or_zero(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v.signum()
    }
}
