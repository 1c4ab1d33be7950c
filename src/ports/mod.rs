//! Ports Layer - Trait definitions for external dependencies
//!
//! The engine only reads price history; [`SeriesStore`] is the one seam
//! adapters implement.

pub mod series_store;

pub use series_store::{InMemorySeriesStore, SeriesStore, StoreError};
