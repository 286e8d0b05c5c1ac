//! The `profiles` input table and its conversion into validated series.

use super::profile::{ProfileName, Series};
use crate::error::{PeriodError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    /// Profile identifier in `<profile_type>-<entity_name>` form.
    pub asset: String,
    /// 1-based hourly time step.
    pub time_step: i64,
    pub value: f64,
}

impl ProfileRow {
    pub fn new(asset: impl Into<String>, time_step: i64, value: f64) -> Self {
        Self {
            asset: asset.into(),
            time_step,
            value,
        }
    }
}

/// Long-format `profiles` table, one row per series per hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileTable {
    rows: Vec<ProfileRow>,
}

impl ProfileTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<ProfileRow>) -> Self {
        Self { rows }
    }

    /// Append all time steps of a series, starting at 1.
    pub fn push_series(&mut self, asset: &str, values: &[f64]) {
        self.rows.extend(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| ProfileRow::new(asset, i as i64 + 1, v)),
        );
    }

    pub fn push(&mut self, row: ProfileRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ProfileRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Group rows into series, ordered by profile name.
    ///
    /// Every asset must parse into a [`ProfileName`], its time steps must be
    /// exactly `1..=H` (any row order, no gaps, no duplicates), and all series
    /// must share the same horizon `H`. Non-finite values are reported by
    /// period when the period matrix is built.
    pub fn to_series(&self) -> Result<Vec<Series>> {
        if self.rows.is_empty() {
            return Err(PeriodError::EmptyData);
        }

        let mut grouped: BTreeMap<ProfileName, Vec<(i64, f64)>> = BTreeMap::new();
        for row in &self.rows {
            let name = ProfileName::parse(&row.asset)?;
            grouped
                .entry(name)
                .or_default()
                .push((row.time_step, row.value));
        }

        let mut series = Vec::with_capacity(grouped.len());
        let mut horizon: Option<(usize, ProfileName)> = None;

        for (name, mut steps) in grouped {
            steps.sort_by_key(|&(t, _)| t);

            for (expected, &(t, _)) in (1_i64..).zip(steps.iter()) {
                if t == expected {
                    continue;
                }
                let problem = if t < 1 {
                    format!("time step {} is below 1", t)
                } else if t < expected {
                    format!("duplicate time step {}", t)
                } else {
                    format!("missing time step {}", expected)
                };
                return Err(PeriodError::data(format!("series '{}': {}", name, problem)));
            }

            let (len, first) = horizon.get_or_insert_with(|| (steps.len(), name.clone()));
            if *len != steps.len() {
                return Err(PeriodError::data(format!(
                    "series '{}' has horizon {} but series '{}' has horizon {}",
                    name,
                    steps.len(),
                    first,
                    len
                )));
            }

            let values = steps.into_iter().map(|(_, v)| v).collect();
            series.push(Series::new_unchecked(name, values));
        }

        Ok(series)
    }
}
