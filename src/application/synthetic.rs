//! Seeded Synthetic Series
//!
//! Deterministic generators for random walks, AR(1) noise and cointegrated
//! pairs. The same seed always produces the same path.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::domain::error::AnalysisError;
use crate::domain::series::{AlignedPanel, TimeSeries};

/// Parameters for a synthetic cointegrated pair `y = x + u`, `u ~ AR(1)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSimulation {
    pub len: usize,
    pub start_price: f64,
    /// Step size of the common random walk
    pub walk_sigma: f64,
    /// AR(1) coefficient of the spread noise
    pub phi: f64,
    pub noise_sigma: f64,
    pub seed: u64,
}

impl Default for PairSimulation {
    fn default() -> Self {
        Self {
            len: 750,
            start_price: 100.0,
            walk_sigma: 1.0,
            phi: 0.9,
            noise_sigma: 1.0,
            seed: 42,
        }
    }
}

/// `x(t) = x(t-1) + sigma * e(t)` starting from `start`
pub fn random_walk(len: usize, start: f64, sigma: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut level = start;
    (0..len)
        .map(|_| {
            let e: f64 = rng.sample(StandardNormal);
            level += sigma * e;
            level
        })
        .collect()
}

/// `x(t) = phi * x(t-1) + sigma * e(t)` starting from zero
pub fn ar1_series(len: usize, phi: f64, sigma: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    ar1_from(&mut rng, len, phi, sigma)
}

/// Two-column panel named `x` and `y` whose spread `x - y` is AR(1)
pub fn cointegrated_pair(sim: &PairSimulation) -> Result<AlignedPanel, AnalysisError> {
    AnalysisError::require_len(2, sim.len)?;
    if !(sim.phi.abs() < 1.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "spread AR coefficient must lie inside (-1, 1), got {}",
            sim.phi
        )));
    }

    let mut rng = StdRng::seed_from_u64(sim.seed);
    let mut level = sim.start_price;
    let x: Vec<f64> = (0..sim.len)
        .map(|_| {
            let e: f64 = rng.sample(StandardNormal);
            level += sim.walk_sigma * e;
            level
        })
        .collect();
    let noise = ar1_from(&mut rng, sim.len, sim.phi, sim.noise_sigma);
    let y: Vec<f64> = x.iter().zip(&noise).map(|(xi, ui)| xi + ui).collect();

    let start = NaiveDate::from_ymd_opt(2000, 1, 3)
        .ok_or_else(|| AnalysisError::InvalidInput("invalid start date".to_string()))?;
    let xs = TimeSeries::daily(start, x);
    let ys = TimeSeries::daily(start, y);

    tracing::debug!(
        "Simulated cointegrated pair: len={}, phi={}, seed={}",
        sim.len,
        sim.phi,
        sim.seed
    );

    AlignedPanel::align(&[("x", &xs), ("y", &ys)])
}

fn ar1_from(rng: &mut StdRng, len: usize, phi: f64, sigma: f64) -> Vec<f64> {
    let mut value = 0.0;
    (0..len)
        .map(|_| {
            let e: f64 = rng.sample(StandardNormal);
            value = phi * value + sigma * e;
            value
        })
        .collect()
}
