//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - JSON store: date-indexed price files on disk
//! - CLI: Command-line interface handlers

pub mod cli;
pub mod json_store;

pub use cli::CliApp;
pub use json_store::{JsonSeriesStore, SeriesRecord};
