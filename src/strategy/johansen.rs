//! Johansen Cointegration Test
//!
//! Reduced-rank regression of differences on lagged levels with a constant
//! (no trend) and no lagged differences:
//!
//!   dX(t) = Pi * X(t-1) + c + e(t)
//!
//! Solves |lambda * S11 - S10 * S00^-1 * S01| = 0 through the Cholesky factor of
//! S11, so the symmetric eigen-solver can be used. Eigenvectors come back ordered
//! by descending eigenvalue; the first is the strongest cointegrating relation.

use nalgebra::{Cholesky, DMatrix, SymmetricEigen};
use serde::Serialize;

use crate::domain::error::AnalysisError;
use crate::domain::series::{AlignedPanel, HedgeVector};

/// Largest system the critical-value tables cover
pub const MAX_SERIES: usize = 12;

// Osterwald-Lenum critical values (90%, 95%, 99%), constant term, indexed by
// number of series minus the hypothesised rank, minus one
const TRACE_CRIT: [[f64; 3]; MAX_SERIES] = [
    [2.7055, 3.8415, 6.6349],
    [13.4294, 15.4943, 19.9349],
    [27.0669, 29.7961, 35.4628],
    [44.4929, 47.8545, 54.6815],
    [65.8202, 69.8189, 77.8202],
    [91.1090, 95.7542, 104.9637],
    [120.3673, 125.6185, 135.9825],
    [153.6341, 159.5290, 171.0905],
    [190.8714, 197.3772, 210.0366],
    [232.1030, 239.2468, 253.2526],
    [277.3740, 285.1402, 300.2821],
    [326.5354, 334.9795, 351.2150],
];

const MAX_EIG_CRIT: [[f64; 3]; MAX_SERIES] = [
    [2.7055, 3.8415, 6.6349],
    [12.2971, 14.2639, 18.5200],
    [18.8928, 21.1314, 25.8650],
    [25.1236, 27.5858, 32.7172],
    [31.2379, 33.8777, 39.3693],
    [37.2786, 40.0763, 45.8662],
    [43.2947, 46.2299, 52.3069],
    [49.2855, 52.3622, 58.6634],
    [55.2412, 58.4332, 64.9960],
    [61.2041, 64.5040, 71.2525],
    [67.1307, 70.5392, 77.4877],
    [73.0563, 76.5734, 83.9349],
];

/// Confidence level for reading the critical-value tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceLevel {
    Ninety,
    NinetyFive,
    NinetyNine,
}

impl ConfidenceLevel {
    fn column(self) -> usize {
        match self {
            ConfidenceLevel::Ninety => 0,
            ConfidenceLevel::NinetyFive => 1,
            ConfidenceLevel::NinetyNine => 2,
        }
    }
}

/// Eigen-decomposition and test statistics of the Johansen procedure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JohansenResult {
    pub series: Vec<String>,
    /// Descending
    pub eigenvalues: Vec<f64>,
    /// `eigenvectors[i]` belongs to `eigenvalues[i]`
    pub eigenvectors: Vec<HedgeVector>,
    /// Trace statistic for the null `rank <= i`
    pub trace_stats: Vec<f64>,
    /// (90%, 95%, 99%)
    pub trace_crit_vals: Vec<[f64; 3]>,
    /// Maximum-eigenvalue statistic for the null `rank = i`
    pub max_eig_stats: Vec<f64>,
    /// (90%, 95%, 99%)
    pub max_eig_crit_vals: Vec<[f64; 3]>,
    pub nobs: usize,
}

impl JohansenResult {
    /// Eigenvector `i` scaled so its first component is 1
    pub fn normalized_vector(&self, index: usize) -> Result<HedgeVector, AnalysisError> {
        self.eigenvectors
            .get(index)
            .ok_or_else(|| {
                AnalysisError::InvalidInput(format!(
                    "eigenvector {} requested, {} available",
                    index,
                    self.eigenvectors.len()
                ))
            })?
            .normalized()
    }

    /// Strongest cointegrating relation, normalized
    pub fn strongest_vector(&self) -> Result<HedgeVector, AnalysisError> {
        self.normalized_vector(0)
    }

    /// Number of consecutive `rank <= i` nulls rejected by the trace statistic
    pub fn rank_at(&self, level: ConfidenceLevel) -> usize {
        let col = level.column();
        self.trace_stats
            .iter()
            .zip(&self.trace_crit_vals)
            .take_while(|(stat, crit)| **stat > crit[col])
            .count()
    }
}

/// Run the Johansen procedure on two or more aligned series
pub fn johansen_vectors(panel: &AlignedPanel) -> Result<JohansenResult, AnalysisError> {
    let k = panel.n_series();
    if k < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "cointegration needs at least 2 series, got {}",
            k
        )));
    }
    if k > MAX_SERIES {
        return Err(AnalysisError::InvalidInput(format!(
            "critical values are tabulated for at most {} series, got {}",
            MAX_SERIES, k
        )));
    }
    panel.validate_finite()?;
    AnalysisError::require_len(k + 3, panel.len())?;

    let nobs = panel.len() - 1;
    let columns = panel.columns();

    let levels = demeaned(DMatrix::from_fn(nobs, k, |t, j| columns[j][t]));
    let diffs = demeaned(DMatrix::from_fn(nobs, k, |t, j| {
        columns[j][t + 1] - columns[j][t]
    }));

    let scale = 1.0 / nobs as f64;
    let s00 = diffs.transpose() * &diffs * scale;
    let s11 = levels.transpose() * &levels * scale;
    let s01 = diffs.transpose() * &levels * scale;

    let s00_inv = s00.try_inverse().ok_or_else(|| {
        AnalysisError::NumericalDegeneracy("covariance of differences is singular".to_string())
    })?;
    let chol = Cholesky::new(s11).ok_or_else(|| {
        AnalysisError::NumericalDegeneracy("covariance of levels is not positive definite".to_string())
    })?;
    let l_inv = chol.l().try_inverse().ok_or_else(|| {
        AnalysisError::NumericalDegeneracy("Cholesky factor is singular".to_string())
    })?;

    let sig = s01.transpose() * &s00_inv * &s01;
    let c = &l_inv * sig * l_inv.transpose();
    let c = (&c + c.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(c);
    let vectors = l_inv.transpose() * &eigen.eigenvectors;

    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let eigenvalues: Vec<f64> = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    if let Some(bad) = eigenvalues.iter().find(|l| !(**l < 1.0 - 1e-12)) {
        return Err(AnalysisError::NumericalDegeneracy(format!(
            "eigenvalue {} is not below 1; series are collinear",
            bad
        )));
    }
    let eigenvalues: Vec<f64> = eigenvalues.into_iter().map(|l| l.max(0.0)).collect();

    let eigenvectors: Vec<HedgeVector> = order
        .iter()
        .map(|&i| HedgeVector::new(vectors.column(i).iter().copied().collect()))
        .collect();

    let n = nobs as f64;
    let log_terms: Vec<f64> = eigenvalues.iter().map(|l| (1.0 - l).ln()).collect();
    let max_eig_stats: Vec<f64> = log_terms.iter().map(|t| -n * t).collect();
    let trace_stats: Vec<f64> = (0..k)
        .map(|i| -n * log_terms[i..].iter().sum::<f64>())
        .collect();

    let trace_crit_vals = (0..k).map(|i| TRACE_CRIT[k - i - 1]).collect();
    let max_eig_crit_vals = (0..k).map(|i| MAX_EIG_CRIT[k - i - 1]).collect();

    tracing::debug!(
        "Johansen: eigenvalues={:?}, trace={:?}",
        eigenvalues,
        trace_stats
    );

    Ok(JohansenResult {
        series: panel.names().to_vec(),
        eigenvalues,
        eigenvectors,
        trace_stats,
        trace_crit_vals,
        max_eig_stats,
        max_eig_crit_vals,
        nobs,
    })
}

fn demeaned(mut m: DMatrix<f64>) -> DMatrix<f64> {
    let rows = m.nrows() as f64;
    for mut col in m.column_iter_mut() {
        let mean = col.sum() / rows;
        col.add_scalar_mut(-mean);
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::synthetic::{cointegrated_pair, random_walk, PairSimulation};
    use crate::domain::series::TimeSeries;
    use crate::strategy::stationarity::unit_root_test;
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    #[test]
    fn test_recovers_unit_vector() {
        let panel = cointegrated_pair(&PairSimulation {
            len: 600,
            seed: 17,
            ..Default::default()
        })
        .unwrap();
        let result = johansen_vectors(&panel).unwrap();

        assert_eq!(result.eigenvalues.len(), 2);
        assert!(result.eigenvalues[0] >= result.eigenvalues[1]);

        let v = result.strongest_vector().unwrap();
        assert_eq!(v.weights()[0], 1.0);
        assert!((v.weights()[1] + 1.0).abs() < 0.1, "vector {:?}", v.weights());
    }

    #[test]
    fn test_trace_detects_rank_one() {
        let panel = cointegrated_pair(&PairSimulation {
            len: 1000,
            seed: 5,
            ..Default::default()
        })
        .unwrap();
        let result = johansen_vectors(&panel).unwrap();

        assert!(result.trace_stats[0] > result.trace_crit_vals[0][2]);
        assert_eq!(result.trace_crit_vals[0], TRACE_CRIT[1]);
        assert_eq!(result.trace_crit_vals[1], TRACE_CRIT[0]);
        assert!(result.rank_at(ConfidenceLevel::NinetyFive) >= 1);
        // trace for r<=last equals the last max-eig statistic
        assert!((result.trace_stats[1] - result.max_eig_stats[1]).abs() < 1e-9);
    }

    #[test]
    fn test_spread_more_stationary_than_inputs() {
        let panel = cointegrated_pair(&PairSimulation {
            len: 800,
            seed: 99,
            ..Default::default()
        })
        .unwrap();
        let result = johansen_vectors(&panel).unwrap();
        let spread = panel.spread(&result.strongest_vector().unwrap()).unwrap();

        let rho_spread = unit_root_test(spread.values()).unwrap().rho;
        for i in 0..2 {
            let rho_input = unit_root_test(panel.column(i).unwrap()).unwrap().rho;
            assert!(rho_spread < rho_input, "spread rho {} vs input {}", rho_spread, rho_input);
        }
    }

    #[test]
    fn test_independent_walks_have_low_rank() {
        let a = TimeSeries::daily(start(), random_walk(800, 100.0, 1.0, 1));
        let b = TimeSeries::daily(start(), random_walk(800, 100.0, 1.0, 2));
        let panel = AlignedPanel::align(&[("a", &a), ("b", &b)]).unwrap();
        let result = johansen_vectors(&panel).unwrap();
        assert!(result.eigenvalues[0] < 0.05);
    }

    #[test]
    fn test_three_series() {
        let panel = cointegrated_pair(&PairSimulation::default()).unwrap();
        let z = TimeSeries::daily(start(), random_walk(panel.len(), 50.0, 1.0, 8));
        let x = panel.series(0).unwrap();
        let y = panel.series(1).unwrap();
        let z = TimeSeries::new(x.timestamps().to_vec(), z.values().to_vec()).unwrap();
        let panel = AlignedPanel::align(&[("x", &x), ("y", &y), ("z", &z)]).unwrap();

        let result = johansen_vectors(&panel).unwrap();
        assert_eq!(result.eigenvectors.len(), 3);
        assert_eq!(result.trace_crit_vals[0], TRACE_CRIT[2]);
        assert_eq!(result.eigenvectors[0].len(), 3);
    }

    #[test]
    fn test_rejects_single_series() {
        let a = TimeSeries::daily(start(), random_walk(100, 100.0, 1.0, 1));
        let panel = AlignedPanel::align(&[("a", &a)]).unwrap();
        assert!(matches!(johansen_vectors(&panel), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_non_finite() {
        let panel = AlignedPanel::from_columns(
            vec!["a".into(), "b".into()],
            (0..10).map(|i| start() + chrono::Duration::days(i)).collect(),
            vec![
                random_walk(10, 100.0, 1.0, 1),
                {
                    let mut c = random_walk(10, 100.0, 1.0, 2);
                    c[4] = f64::NAN;
                    c
                },
            ],
        )
        .unwrap();
        assert!(matches!(johansen_vectors(&panel), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_collinear_series_are_degenerate() {
        let a = random_walk(200, 100.0, 1.0, 4);
        let b: Vec<f64> = a.iter().map(|v| 2.0 * v).collect();
        let panel = AlignedPanel::from_columns(
            vec!["a".into(), "b".into()],
            (0..200).map(|i| start() + chrono::Duration::days(i)).collect(),
            vec![a, b],
        )
        .unwrap();
        assert!(matches!(
            johansen_vectors(&panel),
            Err(AnalysisError::NumericalDegeneracy(_))
        ));
    }
}
