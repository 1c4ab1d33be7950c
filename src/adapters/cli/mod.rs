//! CLI Adapter
//!
//! Command-line interface for the revert engine.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    execute, BacktestCmd, CliApp, CointegrationCmd, Command, HedgeArg, OutputFormat, ScanCmd,
    Session, SimulateCmd, StationarityCmd, StrategyOverrides,
};
