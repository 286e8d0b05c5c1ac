//! Splitting series into fixed-length periods.
//!
//! A [`Period`] is a contiguous slice of one series. A [`PeriodMatrix`] joins
//! the same period index across every series into one period vector, which is
//! the unit the clustering engine measures distance over.
//!
//! # Example
//!
//! ```
//! use anofox_periods::core::{ProfileName, Series};
//! use anofox_periods::segment::split_into_periods;
//!
//! let series = Series::new(ProfileName::new("demand", "a"), vec![1.0; 48]).unwrap();
//! let periods = split_into_periods(&series, 24).unwrap();
//! assert_eq!(periods.len(), 2);
//! assert_eq!(periods.clone().map(|p| p.index).collect::<Vec<_>>(), vec![1, 2]);
//! ```

mod matrix;

pub use matrix::{build_period_matrix, PeriodMatrix};

use crate::core::{ProfileName, Series};
use crate::error::{PeriodError, Result};

/// One period of one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Period<'a> {
    pub series: &'a ProfileName,
    /// 1-based period index.
    pub index: usize,
    pub values: &'a [f64],
}

impl Period<'_> {
    /// First time step (1-based) of this period in the original series.
    pub fn first_time_step(&self) -> usize {
        (self.index - 1) * self.values.len() + 1
    }
}

/// Lazy iterator over the periods of a series.
///
/// Cloning restarts from the current position; a fresh call to
/// [`split_into_periods`] restarts from the first period.
#[derive(Debug, Clone)]
pub struct Periods<'a> {
    series: &'a ProfileName,
    chunks: std::slice::ChunksExact<'a, f64>,
    next_index: usize,
}

impl<'a> Iterator for Periods<'a> {
    type Item = Period<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let values = self.chunks.next()?;
        let index = self.next_index;
        self.next_index += 1;
        Some(Period {
            series: self.series,
            index,
            values,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for Periods<'_> {}

/// Check that a horizon can be split into whole periods.
///
/// Returns the number of periods.
pub fn num_periods(series: &ProfileName, horizon: usize, period_duration: usize) -> Result<usize> {
    if period_duration == 0 {
        return Err(PeriodError::config("period_duration must be positive"));
    }
    if horizon % period_duration != 0 {
        return Err(PeriodError::config(format!(
            "series '{}' has length {} which is not divisible by period_duration {}",
            series, horizon, period_duration
        )));
    }
    Ok(horizon / period_duration)
}

/// Split a series into consecutive, non-overlapping periods.
///
/// Fails with a configuration error when `period_duration` is zero or does
/// not divide the series length. Partial periods are never dropped or padded.
pub fn split_into_periods(series: &Series, period_duration: usize) -> Result<Periods<'_>> {
    num_periods(series.name(), series.len(), period_duration)?;
    Ok(Periods {
        series: series.name(),
        chunks: series.values().chunks_exact(period_duration),
        next_index: 1,
    })
}
