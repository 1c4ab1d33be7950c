//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the revert engine.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::json_store::JsonSeriesStore;
use crate::application::batch::{run_pairs, PairSpec};
use crate::application::pipeline::{BacktestReport, PipelineOutcome, StrategyPipeline};
use crate::application::synthetic::{cointegrated_pair, PairSimulation};
use crate::ports::series_store::SeriesStore;
use crate::strategy::cointegration::{
    compare_candidate_spreads, ols_hedge_ratio, CandidateSource, CandidateSpread,
};
use crate::strategy::johansen::{johansen_vectors, ConfidenceLevel, JohansenResult};
use crate::strategy::params::{
    HedgeMethod, SignalMode, SignalThresholds, StrategyConfig, ZWindow, DEFAULT_KALMAN_DELTA,
    DEFAULT_ROLLING_LOOKBACK,
};
use crate::strategy::stationarity::stationarity_analysis;

/// Revert - mean-reversion research engine
#[derive(Parser, Debug)]
#[command(
    name = "revert",
    version = env!("CARGO_PKG_VERSION"),
    about = "Stationarity, cointegration and mean-reversion backtests on price series",
    long_about = "Revert tests price series for mean reversion, estimates static and dynamic \
                  hedge ratios, and backtests z-score trading of the resulting spreads."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Override the price data directory
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Test one series for mean reversion
    Stationarity(StationarityCmd),

    /// Johansen test over two or more series
    Cointegration(CointegrationCmd),

    /// Backtest a pair, or a single series outright
    Backtest(BacktestCmd),

    /// Backtest many pairs in parallel
    Scan(ScanCmd),

    /// Write a synthetic cointegrated pair to the data directory
    Simulate(SimulateCmd),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HedgeArg {
    Ols,
    Johansen,
    RollingOls,
    Kalman,
}

/// Test a series for stationarity
#[derive(Parser, Debug)]
pub struct StationarityCmd {
    /// Series name in the data directory
    #[arg(value_name = "SERIES")]
    pub series: String,
}

/// Johansen test
#[derive(Parser, Debug)]
pub struct CointegrationCmd {
    /// Series names, at least two
    #[arg(value_name = "SERIES", num_args = 2.., required = true)]
    pub series: Vec<String>,
}

/// Strategy settings that override the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct StrategyOverrides {
    /// Hedge estimator
    #[arg(long, value_enum)]
    pub hedge: Option<HedgeArg>,

    /// Rolling OLS lookback
    #[arg(long, value_name = "PERIODS")]
    pub lookback: Option<usize>,

    /// Kalman slope drift
    #[arg(long, value_name = "DELTA")]
    pub delta: Option<f64>,

    /// Fixed z-score window (default: spread half-life)
    #[arg(long, value_name = "PERIODS")]
    pub z_window: Option<usize>,

    /// Hold -z units instead of trading bands
    #[arg(long, conflicts_with_all = ["entry", "exit"])]
    pub linear: bool,

    /// Symmetric entry band |z|
    #[arg(long, value_name = "Z", requires = "exit")]
    pub entry: Option<f64>,

    /// Symmetric exit band |z|
    #[arg(long, value_name = "Z", requires = "entry")]
    pub exit: Option<f64>,
}

impl StrategyOverrides {
    /// Layer the command-line settings over a base configuration
    pub fn apply(&self, mut config: StrategyConfig) -> StrategyConfig {
        let hedge = match self.hedge {
            Some(HedgeArg::Ols) => HedgeMethod::Ols,
            Some(HedgeArg::Johansen) => HedgeMethod::Johansen,
            Some(HedgeArg::RollingOls) => HedgeMethod::RollingOls {
                lookback: DEFAULT_ROLLING_LOOKBACK,
            },
            Some(HedgeArg::Kalman) => HedgeMethod::Kalman {
                delta: DEFAULT_KALMAN_DELTA,
            },
            None => config.hedge,
        };
        config.hedge = match hedge {
            HedgeMethod::RollingOls { lookback } => HedgeMethod::RollingOls {
                lookback: self.lookback.unwrap_or(lookback),
            },
            HedgeMethod::Kalman { delta } => HedgeMethod::Kalman {
                delta: self.delta.unwrap_or(delta),
            },
            other => other,
        };

        if let Some(window) = self.z_window {
            config.z_window = ZWindow::Fixed { window };
        }

        if self.linear {
            config.signal = SignalMode::Linear;
        } else if let (Some(entry), Some(exit)) = (self.entry, self.exit) {
            config.signal = SignalMode::Bands(SignalThresholds::symmetric(entry, exit));
        }

        config
    }
}

/// Backtest one pair or one series
#[derive(Parser, Debug)]
pub struct BacktestCmd {
    /// First series (x)
    #[arg(value_name = "X")]
    pub x: String,

    /// Second series (y); omit to trade x on its own
    #[arg(value_name = "Y")]
    pub y: Option<String>,

    #[command(flatten)]
    pub overrides: StrategyOverrides,

    /// Export the full report to JSON
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,
}

/// Backtest many pairs
#[derive(Parser, Debug)]
pub struct ScanCmd {
    /// Pairs as x:y
    #[arg(value_name = "PAIR", required = true)]
    pub pairs: Vec<PairSpec>,

    #[command(flatten)]
    pub overrides: StrategyOverrides,
}

/// Generate a synthetic pair
#[derive(Parser, Debug)]
pub struct SimulateCmd {
    /// Name prefix; writes <prefix>_x and <prefix>_y
    #[arg(long, default_value = "sim")]
    pub prefix: String,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 750)]
    pub len: usize,

    /// AR(1) coefficient of the spread
    #[arg(long, default_value_t = 0.9)]
    pub phi: f64,
}

/// Resolved settings shared by every command
#[derive(Debug, Clone)]
pub struct Session {
    pub strategy: StrategyConfig,
    pub store: Arc<JsonSeriesStore>,
    pub format: OutputFormat,
}

/// Execute the CLI command
pub async fn execute(command: Command, session: Session) -> Result<()> {
    match command {
        Command::Stationarity(cmd) => stationarity_command(cmd, &session),
        Command::Cointegration(cmd) => cointegration_command(cmd, &session),
        Command::Backtest(cmd) => backtest_command(cmd, &session),
        Command::Scan(cmd) => scan_command(cmd, &session).await,
        Command::Simulate(cmd) => simulate_command(cmd, &session),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handle stationarity command
fn stationarity_command(cmd: StationarityCmd, session: &Session) -> Result<()> {
    tracing::info!("Testing {} for stationarity", cmd.series);

    let series = session
        .store
        .load(&cmd.series)
        .with_context(|| format!("Failed to load series {}", cmd.series))?;
    let report = stationarity_analysis(series.values(), &session.strategy.stationarity)
        .context("Stationarity analysis failed")?;

    if session.format == OutputFormat::Json {
        return print_json(&report);
    }

    let ur = &report.unit_root;
    println!("Stationarity: {} ({} observations)", cmd.series, series.len());
    println!("  rho:            {:.6}", ur.rho);
    println!("  ADF statistic:  {:.4}", ur.adf_statistic);
    println!("  p-value:        {:.4}", ur.p_value);
    println!(
        "  Critical (1/5/10%): {:.3} / {:.3} / {:.3}",
        ur.critical_values.one_pct, ur.critical_values.five_pct, ur.critical_values.ten_pct
    );
    match report.half_life {
        Some(h) => println!("  Half-life:      {} periods", h),
        None => println!("  Half-life:      undefined (no mean reversion)"),
    }
    if let Some(vr) = &report.variance_ratio {
        println!(
            "  Variance ratio: {:.4} at k={} (p={:.4})",
            vr.ratio, vr.k, vr.p_heteroskedastic
        );
    }
    if let Some(h) = report.hurst {
        println!("  Hurst exponent: {:.4}", h);
    }
    println!(
        "  Verdict:        {}",
        if report.is_stationary { "stationary" } else { "not stationary" }
    );

    Ok(())
}

#[derive(Serialize)]
struct CointegrationOutput<'a> {
    johansen: &'a JohansenResult,
    rank_95: usize,
    ols_beta: Option<f64>,
    candidates: Vec<CandidateSpread>,
}

/// Handle cointegration command
fn cointegration_command(cmd: CointegrationCmd, session: &Session) -> Result<()> {
    let names: Vec<&str> = cmd.series.iter().map(|s| s.as_str()).collect();
    let panel = session
        .store
        .load_panel(&names)
        .context("Failed to load series")?;
    let johansen = johansen_vectors(&panel).context("Johansen test failed")?;

    let (ols_beta, candidates) = if panel.n_series() == 2 {
        let x = panel.column(0).unwrap_or_default();
        let y = panel.column(1).unwrap_or_default();
        let beta = ols_hedge_ratio(x, y).context("OLS hedge ratio failed")?;
        let candidates = compare_candidate_spreads(&panel, beta, &johansen)
            .context("Candidate spread comparison failed")?;
        (Some(beta), candidates)
    } else {
        (None, Vec::new())
    };

    let output = CointegrationOutput {
        johansen: &johansen,
        rank_95: johansen.rank_at(ConfidenceLevel::NinetyFive),
        ols_beta,
        candidates,
    };

    if session.format == OutputFormat::Json {
        return print_json(&output);
    }

    println!("Johansen: {} ({} observations)", johansen.series.join(", "), johansen.nobs);
    println!("  r   eigenvalue   trace    crit95   max-eig  crit95");
    for r in 0..johansen.eigenvalues.len() {
        println!(
            "  {:<3} {:>10.5} {:>8.3} {:>8.3} {:>8.3} {:>8.3}",
            r,
            johansen.eigenvalues[r],
            johansen.trace_stats[r],
            johansen.trace_crit_vals[r][1],
            johansen.max_eig_stats[r],
            johansen.max_eig_crit_vals[r][1],
        );
    }
    println!("  Rank at 95%: {}", output.rank_95);

    if let Some(beta) = output.ols_beta {
        println!("\nOLS hedge ratio: {:.6}", beta);
        println!("Candidate spreads (most mean-reverting first):");
        for c in &output.candidates {
            let source = match c.source {
                CandidateSource::Johansen(i) => format!("johansen[{}]", i),
                CandidateSource::Ols => "ols".to_string(),
            };
            println!(
                "  {:<12} {:?}  rho={:.6}  p={:.4}",
                source,
                c.vector.weights(),
                c.unit_root.rho,
                c.unit_root.p_value
            );
        }
    }

    Ok(())
}

/// Handle backtest command
fn backtest_command(cmd: BacktestCmd, session: &Session) -> Result<()> {
    let config = cmd.overrides.apply(session.strategy.clone());
    let mut names = vec![cmd.x.as_str()];
    names.extend(cmd.y.as_deref());
    let label = names.join(":");
    tracing::info!("Backtesting {} with {:?}", label, config.hedge);

    let pipeline = StrategyPipeline::new(config).context("Invalid strategy configuration")?;
    let panel = session
        .store
        .load_panel(&names)
        .with_context(|| format!("Failed to load {}", label))?;
    let outcome = pipeline.run(&panel).context("Backtest failed")?;

    if let Some(path) = &cmd.export_json {
        let content = serde_json::to_string_pretty(&outcome)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Report exported to {}", path.display());
    }

    if session.format == OutputFormat::Json {
        return print_json(&outcome);
    }

    println!("Backtest: {}", label);
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::Traded(report) => print_report(report),
        PipelineOutcome::NonStationary { spread_unit_root } => {
            println!(
                "  Spread not mean-reverting (rho={:.6}, p={:.4}); no trades",
                spread_unit_root.rho, spread_unit_root.p_value
            );
        }
    }
}

fn print_report(report: &BacktestReport) {
    let perf = &report.performance;
    println!("  Spread rho:        {:.6}", report.spread_unit_root.rho);
    println!("  Half-life:         {} periods", report.half_life);
    println!("  Z-score window:    {} periods", report.z_window);
    if let Some(entries) = report.entries {
        println!("  Leg entries:       {}", entries);
    }
    println!("  Periods:           {}", perf.periods);
    println!("  Annualized return: {:.2}%", perf.annualized_return * 100.0);
    if perf.sharpe_ratio.is_nan() {
        println!("  Sharpe ratio:      undefined");
    } else {
        println!("  Sharpe ratio:      {:.3}", perf.sharpe_ratio);
    }
    println!("  Max drawdown:      {:.2}%", perf.max_drawdown * 100.0);
    if let Some(test) = &report.mean_return_test {
        println!(
            "  Mean return t:     {:.3} (p={:.4}, df={})",
            test.t_statistic, test.p_value, test.degrees_of_freedom
        );
    }
}

#[derive(Serialize)]
struct ScanRow {
    pair: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<PipelineOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Handle scan command
async fn scan_command(cmd: ScanCmd, session: &Session) -> Result<()> {
    let config = cmd.overrides.apply(session.strategy.clone());
    let store: Arc<dyn SeriesStore> = session.store.clone();

    let results = run_pairs(store, cmd.pairs, config)
        .await
        .context("Invalid strategy configuration")?;

    let rows: Vec<ScanRow> = results
        .into_iter()
        .map(|r| match r.outcome {
            Ok(outcome) => ScanRow {
                pair: r.pair.to_string(),
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => ScanRow {
                pair: r.pair.to_string(),
                outcome: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    if session.format == OutputFormat::Json {
        return print_json(&rows);
    }

    println!("{:<24} {:>10} {:>8} {:>8} {:>6}", "pair", "apr", "sharpe", "maxdd", "hl");
    for row in &rows {
        match (&row.outcome, &row.error) {
            (Some(PipelineOutcome::Traded(report)), _) => {
                let perf = &report.performance;
                println!(
                    "{:<24} {:>9.2}% {:>8.3} {:>7.2}% {:>6}",
                    row.pair,
                    perf.annualized_return * 100.0,
                    perf.sharpe_ratio,
                    perf.max_drawdown * 100.0,
                    report.half_life
                );
            }
            (Some(PipelineOutcome::NonStationary { .. }), _) => {
                println!("{:<24} not mean-reverting", row.pair);
            }
            (None, Some(error)) => println!("{:<24} error: {}", row.pair, error),
            (None, None) => {}
        }
    }

    Ok(())
}

/// Handle simulate command
fn simulate_command(cmd: SimulateCmd, session: &Session) -> Result<()> {
    if cmd.prefix.is_empty() {
        bail!("Prefix cannot be empty");
    }

    let sim = PairSimulation {
        len: cmd.len,
        phi: cmd.phi,
        seed: cmd.seed,
        ..Default::default()
    };
    let panel = cointegrated_pair(&sim).context("Simulation failed")?;

    let mut written = Vec::with_capacity(panel.n_series());
    for (i, column) in panel.names().iter().enumerate() {
        let name = format!("{}_{}", cmd.prefix, column);
        if let Some(series) = panel.series(i) {
            let path = session
                .store
                .save(&name, &series)
                .with_context(|| format!("Failed to save {}", name))?;
            written.push(path);
        }
    }

    if session.format == OutputFormat::Json {
        return print_json(&written);
    }

    println!("Simulated {} periods (phi={}, seed={})", sim.len, sim.phi, sim.seed);
    for path in &written {
        println!("  {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backtest_with_overrides() {
        let app = CliApp::try_parse_from([
            "revert", "backtest", "spy", "qqq", "--hedge", "kalman", "--delta", "0.0001",
            "--z-window", "20", "--entry", "1.0", "--exit", "0.2",
        ])
        .unwrap();

        let Command::Backtest(cmd) = app.command else {
            panic!("expected backtest");
        };
        assert_eq!(cmd.x, "spy");
        assert_eq!(cmd.y.as_deref(), Some("qqq"));

        let config = cmd.overrides.apply(StrategyConfig::default());
        assert_eq!(config.hedge, HedgeMethod::Kalman { delta: 0.0001 });
        assert_eq!(config.z_window, ZWindow::Fixed { window: 20 });
        assert_eq!(
            config.signal,
            SignalMode::Bands(SignalThresholds::symmetric(1.0, 0.2))
        );
    }

    #[test]
    fn test_overrides_keep_config_values() {
        let base = StrategyConfig::default().with_hedge(HedgeMethod::RollingOls { lookback: 30 });

        let untouched = StrategyOverrides::default().apply(base.clone());
        assert_eq!(untouched, base);

        let lookback_only = StrategyOverrides {
            lookback: Some(90),
            ..Default::default()
        };
        assert_eq!(
            lookback_only.apply(base).hedge,
            HedgeMethod::RollingOls { lookback: 90 }
        );
    }

    #[test]
    fn test_hedge_flag_uses_defaults() {
        let overrides = StrategyOverrides {
            hedge: Some(HedgeArg::RollingOls),
            linear: true,
            ..Default::default()
        };
        let config = overrides.apply(StrategyConfig::default());
        assert_eq!(
            config.hedge,
            HedgeMethod::RollingOls {
                lookback: DEFAULT_ROLLING_LOOKBACK
            }
        );
        assert_eq!(config.signal, SignalMode::Linear);
    }

    #[test]
    fn test_parse_single_series_backtest() {
        let app = CliApp::try_parse_from(["revert", "backtest", "eurjpy", "--linear"]).unwrap();
        let Command::Backtest(cmd) = app.command else {
            panic!("expected backtest");
        };
        assert_eq!(cmd.x, "eurjpy");
        assert!(cmd.y.is_none());
        assert_eq!(
            cmd.overrides.apply(StrategyConfig::default()).signal,
            SignalMode::Linear
        );
    }

    #[test]
    fn test_parse_scan_pairs() {
        let app = CliApp::try_parse_from(["revert", "--format", "json", "scan", "a:b", "c:d"])
            .unwrap();
        assert_eq!(app.format, OutputFormat::Json);
        let Command::Scan(cmd) = app.command else {
            panic!("expected scan");
        };
        assert_eq!(cmd.pairs.len(), 2);
        assert_eq!(cmd.pairs[1].y, "d");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(CliApp::try_parse_from(["revert", "scan", "nopair"]).is_err());
        assert!(CliApp::try_parse_from(["revert", "cointegration", "only_one"]).is_err());
        assert!(
            CliApp::try_parse_from(["revert", "backtest", "a", "b", "--linear", "--entry", "1", "--exit", "0"])
                .is_err()
        );
        assert!(CliApp::try_parse_from(["revert", "backtest", "a", "b", "--entry", "1"]).is_err());
    }
}
