//! Weight matrix mapping original periods onto representative periods.
//!
//! Every row of the matrix is a convex combination: non-negative weights that
//! sum to one. The default [`WeightPolicy::Dirac`] puts all weight on the
//! assigned representative; [`WeightPolicy::Convex`] fits fractional weights
//! that best reconstruct each period from all representatives.

mod convex;

use crate::clustering::ClusteringResult;
use crate::error::{PeriodError, Result};
use crate::segment::PeriodMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tolerance for the row-sum invariant.
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Weights below this are treated as zero.
pub const WEIGHT_EPSILON: f64 = 1e-12;

/// How original periods are mapped to representatives.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    /// Weight 1 on the assigned representative.
    #[default]
    Dirac,
    /// Fractional weights on the probability simplex, fitted by projected
    /// gradient descent starting from the hard assignment.
    Convex {
        max_iterations: usize,
        learning_rate: f64,
        tolerance: f64,
    },
}

impl WeightPolicy {
    /// Convex policy with default fitting parameters.
    pub fn convex() -> Self {
        WeightPolicy::Convex {
            max_iterations: 1000,
            learning_rate: 1.0,
            tolerance: 1e-10,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            WeightPolicy::Dirac => Ok(()),
            WeightPolicy::Convex {
                max_iterations,
                learning_rate,
                tolerance,
            } => {
                if max_iterations == 0 {
                    return Err(PeriodError::config(
                        "convex weight fitting needs at least one iteration",
                    ));
                }
                if !(learning_rate > 0.0 && learning_rate <= 1.0) {
                    return Err(PeriodError::config(format!(
                        "convex learning_rate must be in (0, 1], got {}",
                        learning_rate
                    )));
                }
                if !(tolerance >= 0.0) {
                    return Err(PeriodError::config(format!(
                        "convex tolerance must be non-negative, got {}",
                        tolerance
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Dense `num_periods × k` weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    k: usize,
    rows: Vec<Vec<f64>>,
}

impl WeightMatrix {
    /// Build from rows, checking the row-sum invariant.
    ///
    /// # Panics
    /// If any row has a negative weight or does not sum to one. Such a matrix
    /// can only come from an engine defect.
    fn from_rows(k: usize, rows: Vec<Vec<f64>>) -> Self {
        for (p, row) in rows.iter().enumerate() {
            assert_eq!(
                row.len(),
                k,
                "weight row {} has {} columns, expected {}",
                p + 1,
                row.len(),
                k
            );
            let sum: f64 = row.iter().sum();
            assert!(
                (sum - 1.0).abs() <= ROW_SUM_TOLERANCE,
                "weights of period {} sum to {}, not 1",
                p + 1,
                sum
            );
            assert!(
                row.iter().all(|&w| w >= 0.0),
                "period {} has a negative weight",
                p + 1
            );
        }
        Self { k, rows }
    }

    pub fn num_periods(&self) -> usize {
        self.rows.len()
    }

    /// Number of representative periods.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Weight of a 1-based period on a 1-based representative period.
    pub fn weight(&self, period: usize, rep_period: usize) -> Option<f64> {
        self.row(period)?.get(rep_period.checked_sub(1)?).copied()
    }

    /// Weights of a 1-based period.
    pub fn row(&self, period: usize) -> Option<&[f64]> {
        self.rows
            .get(period.checked_sub(1)?)
            .map(|r| r.as_slice())
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Nonzero entries as `(period, rep_period, weight)`, ordered by period
    /// then representative.
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows.iter().enumerate().flat_map(|(p, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, &w)| w > 0.0)
                .map(move |(r, &w)| (p + 1, r + 1, w))
        })
    }

    /// Whether every row has a single weight of one.
    pub fn is_hard(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().filter(|&&w| w > 0.0).count() == 1)
    }

    /// Approximate a 1-based period as the weighted sum of representatives.
    pub fn reconstruct(&self, period: usize, result: &ClusteringResult) -> Option<Vec<f64>> {
        let row = self.row(period)?;
        let reps = result.representatives();
        let dim = reps.first()?.vector.len();
        let mut out = vec![0.0; dim];
        for (w, rep) in row.iter().zip(reps) {
            if *w > 0.0 {
                for (o, v) in out.iter_mut().zip(&rep.vector) {
                    *o += w * v;
                }
            }
        }
        Some(out)
    }
}

/// Per-representative metadata derived from the weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct RepPeriodSummary {
    pub rep_period: usize,
    /// Original periods with nonzero weight on this representative
    pub num_periods: usize,
    /// Sum of weights, i.e. how many periods' worth of time it stands for
    pub total_weight: f64,
}

/// Weight matrix plus representative summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    pub matrix: WeightMatrix,
    pub summaries: Vec<RepPeriodSummary>,
}

/// Build the weight matrix for a clustering result.
///
/// `periods` must be the matrix the result was computed from; it is only read
/// by the convex policy.
pub fn build_weight_matrix(
    result: &ClusteringResult,
    periods: &PeriodMatrix,
    policy: &WeightPolicy,
) -> Result<Weights> {
    policy.validate()?;
    if periods.num_periods() != result.num_periods() {
        return Err(PeriodError::DimensionMismatch {
            expected: result.num_periods(),
            got: periods.num_periods(),
        });
    }
    let k = result.k();

    let rows: Vec<Vec<f64>> = match *policy {
        WeightPolicy::Dirac => result
            .assignments()
            .iter()
            .map(|&rep| {
                let mut row = vec![0.0; k];
                row[rep - 1] = 1.0;
                row
            })
            .collect(),
        WeightPolicy::Convex {
            max_iterations,
            learning_rate,
            tolerance,
        } => {
            let reps: Vec<&[f64]> = result
                .representatives()
                .iter()
                .map(|r| r.vector.as_slice())
                .collect();
            let fitter = convex::SimplexFit::new(&reps, max_iterations, learning_rate, tolerance);
            periods
                .vectors()
                .par_iter()
                .zip(result.assignments().par_iter())
                .map(|(x, &rep)| fitter.fit(x, rep - 1))
                .collect()
        }
    };

    let matrix = WeightMatrix::from_rows(k, rows);
    let summaries = summarize(&matrix);
    debug!(
        num_periods = matrix.num_periods(),
        k,
        hard = matrix.is_hard(),
        "built weight matrix"
    );

    Ok(Weights { matrix, summaries })
}

fn summarize(matrix: &WeightMatrix) -> Vec<RepPeriodSummary> {
    (0..matrix.k())
        .map(|r| {
            let column = matrix.rows().iter().map(|row| row[r]);
            RepPeriodSummary {
                rep_period: r + 1,
                num_periods: column.clone().filter(|&w| w > 0.0).count(),
                total_weight: column.sum(),
            }
        })
        .collect()
}

/// Root mean squared error between every original period and its weighted
/// reconstruction, in original units.
pub fn reconstruction_error(
    result: &ClusteringResult,
    periods: &PeriodMatrix,
    weights: &WeightMatrix,
) -> Result<f64> {
    if periods.num_periods() != weights.num_periods() {
        return Err(PeriodError::DimensionMismatch {
            expected: weights.num_periods(),
            got: periods.num_periods(),
        });
    }

    let mut sq_sum = 0.0;
    let mut count = 0usize;
    for (p, x) in periods.vectors().iter().enumerate() {
        let approx = weights
            .reconstruct(p + 1, result)
            .ok_or(PeriodError::EmptyData)?;
        if approx.len() != x.len() {
            return Err(PeriodError::DimensionMismatch {
                expected: x.len(),
                got: approx.len(),
            });
        }
        sq_sum += x
            .iter()
            .zip(&approx)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>();
        count += x.len();
    }

    if count == 0 {
        return Err(PeriodError::EmptyData);
    }
    Ok((sq_sum / count as f64).sqrt())
}
