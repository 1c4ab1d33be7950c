//! Static Cointegration Estimators
//!
//! OLS hedge ratio for a pair and a side-by-side comparison of the candidate
//! spreads produced by OLS and by each Johansen eigenvector.

use serde::Serialize;

use crate::domain::error::AnalysisError;
use crate::domain::series::{AlignedPanel, HedgeVector};
use crate::strategy::johansen::JohansenResult;
use crate::strategy::regression::ols_fit;
use crate::strategy::stationarity::{unit_root_test, UnitRootResult};

/// Slope of `y` regressed on `x` with an intercept; the intercept is discarded
pub fn ols_hedge_ratio(x: &[f64], y: &[f64]) -> Result<f64, AnalysisError> {
    let fit = ols_fit(x, y)?;
    tracing::debug!("OLS hedge ratio: beta={:.6}, intercept={:.6}", fit.slope, fit.intercept);
    Ok(fit.slope)
}

/// Where a candidate hedge vector came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CandidateSource {
    Johansen(usize),
    Ols,
}

/// A hedge vector together with the unit-root test of its spread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSpread {
    pub source: CandidateSource,
    pub vector: HedgeVector,
    pub unit_root: UnitRootResult,
}

/// Unit-root test every candidate spread of a pair, most negative `rho` first
///
/// Candidates are each Johansen eigenvector and the OLS vector `(beta, -1)`, all
/// normalized to a leading 1.
pub fn compare_candidate_spreads(
    panel: &AlignedPanel,
    beta: f64,
    johansen: &JohansenResult,
) -> Result<Vec<CandidateSpread>, AnalysisError> {
    if panel.n_series() != 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "candidate comparison needs a pair, got {} series",
            panel.n_series()
        )));
    }

    let mut candidates = Vec::with_capacity(johansen.eigenvectors.len() + 1);
    for i in 0..johansen.eigenvectors.len() {
        candidates.push((CandidateSource::Johansen(i), johansen.normalized_vector(i)?));
    }
    candidates.push((
        CandidateSource::Ols,
        HedgeVector::new(vec![beta, -1.0]).normalized()?,
    ));

    let mut results = candidates
        .into_iter()
        .map(|(source, vector)| {
            let spread = panel.spread(&vector)?;
            let unit_root = unit_root_test(spread.values())?;
            Ok(CandidateSpread {
                source,
                vector,
                unit_root,
            })
        })
        .collect::<Result<Vec<_>, AnalysisError>>()?;

    results.sort_by(|a, b| a.unit_root.rho.total_cmp(&b.unit_root.rho));
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::synthetic::{cointegrated_pair, random_walk, PairSimulation};
    use crate::strategy::johansen::johansen_vectors;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::StandardNormal;

    fn noisy_line(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>) {
        let x = random_walk(n, 50.0, 1.0, seed);
        let mut rng = StdRng::seed_from_u64(seed + 1000);
        let y = x
            .iter()
            .map(|xi| {
                let e: f64 = rng.sample(StandardNormal);
                2.0 * xi + e
            })
            .collect();
        (x, y)
    }

    #[test]
    fn test_recovers_slope_two() {
        let (x, y) = noisy_line(100, 1);
        let small = ols_hedge_ratio(&x, &y).unwrap();
        assert!((small - 2.0).abs() < 0.1, "beta {}", small);

        let (x, y) = noisy_line(5000, 1);
        let large = ols_hedge_ratio(&x, &y).unwrap();
        assert!((large - 2.0).abs() < 0.02, "beta {}", large);
    }

    #[test]
    fn test_hedge_ratio_propagates_errors() {
        assert!(matches!(
            ols_hedge_ratio(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]),
            Err(AnalysisError::NumericalDegeneracy(_))
        ));
        assert!(matches!(
            ols_hedge_ratio(&[1.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_candidate_ordering() {
        let panel = cointegrated_pair(&PairSimulation::default()).unwrap();
        let johansen = johansen_vectors(&panel).unwrap();
        let beta = ols_hedge_ratio(panel.column(0).unwrap(), panel.column(1).unwrap()).unwrap();

        let candidates = compare_candidate_spreads(&panel, beta, &johansen).unwrap();
        assert_eq!(candidates.len(), 3);
        assert!(candidates
            .windows(2)
            .all(|w| w[0].unit_root.rho <= w[1].unit_root.rho));
        assert!(candidates.iter().all(|c| c.vector.weights()[0] == 1.0));
        assert!(candidates.iter().any(|c| c.source == CandidateSource::Ols));
        // the weak eigenvector is never the best spread
        assert_ne!(candidates[0].source, CandidateSource::Johansen(1));
    }
}
