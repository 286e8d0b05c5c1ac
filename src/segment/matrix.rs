//! Joint period vectors across all series.

use super::split_into_periods;
use crate::core::{ProfileName, Series};
use crate::error::{PeriodError, Result};
use tracing::debug;

/// Period vectors for a set of series sharing the same horizon.
///
/// Row `p` (0-based) is period `p + 1`; it concatenates that period's values
/// for every series in ascending [`ProfileName`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodMatrix {
    series_names: Vec<ProfileName>,
    period_duration: usize,
    vectors: Vec<Vec<f64>>,
}

impl PeriodMatrix {
    /// Build a matrix directly from period vectors.
    ///
    /// Every vector must have length `series_names.len() * period_duration`
    /// and contain only finite values.
    pub fn from_vectors(
        series_names: Vec<ProfileName>,
        period_duration: usize,
        vectors: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if period_duration == 0 {
            return Err(PeriodError::config("period_duration must be positive"));
        }
        if series_names.is_empty() || vectors.is_empty() {
            return Err(PeriodError::EmptyData);
        }
        let dim = series_names.len() * period_duration;
        for (p, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(PeriodError::DimensionMismatch {
                    expected: dim,
                    got: v.len(),
                });
            }
            if let Some(pos) = v.iter().position(|x| !x.is_finite()) {
                return Err(non_finite(&series_names[pos / period_duration], p + 1));
            }
        }
        Ok(Self {
            series_names,
            period_duration,
            vectors,
        })
    }

    pub fn series_names(&self) -> &[ProfileName] {
        &self.series_names
    }

    pub fn num_series(&self) -> usize {
        self.series_names.len()
    }

    pub fn period_duration(&self) -> usize {
        self.period_duration
    }

    pub fn num_periods(&self) -> usize {
        self.vectors.len()
    }

    /// Length of each period vector.
    pub fn dimension(&self) -> usize {
        self.series_names.len() * self.period_duration
    }

    /// All period vectors; index 0 is period 1.
    pub fn vectors(&self) -> &[Vec<f64>] {
        &self.vectors
    }

    /// Period vector for a 1-based period index.
    pub fn period(&self, period: usize) -> Option<&[f64]> {
        period
            .checked_sub(1)
            .and_then(|p| self.vectors.get(p))
            .map(|v| v.as_slice())
    }

    /// The slice of a period vector belonging to one series.
    pub fn series_slice<'v>(&self, vector: &'v [f64], series_idx: usize) -> &'v [f64] {
        let start = series_idx * self.period_duration;
        &vector[start..start + self.period_duration]
    }

    /// Copy of the period vectors with each series min-max scaled to `[0, 1]`
    /// over the full horizon. Constant series map to zero.
    pub fn min_max_scaled(&self) -> Vec<Vec<f64>> {
        let d = self.period_duration;
        let bounds: Vec<(f64, f64)> = (0..self.num_series())
            .map(|s| {
                self.vectors
                    .iter()
                    .flat_map(|v| v[s * d..(s + 1) * d].iter().copied())
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                        (lo.min(x), hi.max(x))
                    })
            })
            .collect();

        self.vectors
            .iter()
            .map(|v| {
                v.iter()
                    .enumerate()
                    .map(|(i, &x)| {
                        let (lo, hi) = bounds[i / d];
                        let range = hi - lo;
                        if range > 0.0 {
                            (x - lo) / range
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

fn non_finite(series: &ProfileName, period: usize) -> PeriodError {
    PeriodError::data(format!(
        "non-finite value in series '{}' period {}",
        series, period
    ))
}

/// Segment every series and join them into period vectors.
///
/// Series are ordered by name regardless of input order. All series must
/// share one horizon that `period_duration` divides.
pub fn build_period_matrix(series: &[Series], period_duration: usize) -> Result<PeriodMatrix> {
    if series.is_empty() {
        return Err(PeriodError::EmptyData);
    }

    let mut ordered: Vec<&Series> = series.iter().collect();
    ordered.sort_by(|a, b| a.name().cmp(b.name()));

    for pair in ordered.windows(2) {
        if pair[0].name() == pair[1].name() {
            return Err(PeriodError::data(format!(
                "duplicate series '{}'",
                pair[0].name()
            )));
        }
    }

    let horizon = ordered[0].len();
    if let Some(other) = ordered.iter().find(|s| s.len() != horizon) {
        return Err(PeriodError::data(format!(
            "series '{}' has horizon {} but series '{}' has horizon {}",
            other.name(),
            other.len(),
            ordered[0].name(),
            horizon
        )));
    }

    let mut per_series = Vec::with_capacity(ordered.len());
    for s in &ordered {
        per_series.push(split_into_periods(s, period_duration)?);
    }
    let num_periods = horizon / period_duration;

    let mut vectors = vec![Vec::with_capacity(ordered.len() * period_duration); num_periods];
    for periods in per_series {
        for period in periods {
            if period.values.iter().any(|v| !v.is_finite()) {
                return Err(non_finite(period.series, period.index));
            }
            vectors[period.index - 1].extend_from_slice(period.values);
        }
    }

    debug!(
        num_series = ordered.len(),
        num_periods, period_duration, "built period matrix"
    );

    Ok(PeriodMatrix {
        series_names: ordered.iter().map(|s| s.name().clone()).collect(),
        period_duration,
        vectors,
    })
}
