//! Structured profile identifiers and hourly series.

use crate::error::{PeriodError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between profile type and entity name at the storage boundary.
pub const PROFILE_SEPARATOR: char = '-';

/// Identifier of a profile: the kind of profile and the entity it belongs to.
///
/// Serialized as `<profile_type>-<entity_name>` only when crossing the table
/// boundary. Ordered by profile type, then entity name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProfileName {
    pub profile_type: String,
    pub entity_name: String,
}

impl ProfileName {
    pub fn new(profile_type: impl Into<String>, entity_name: impl Into<String>) -> Self {
        Self {
            profile_type: profile_type.into(),
            entity_name: entity_name.into(),
        }
    }

    /// Parse a `type-name` identifier, splitting at the first separator.
    ///
    /// Entity names may themselves contain the separator; the profile type may not.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split_once(PROFILE_SEPARATOR) {
            Some((profile_type, entity_name))
                if !profile_type.is_empty() && !entity_name.is_empty() =>
            {
                Ok(Self::new(profile_type, entity_name))
            }
            _ => Err(PeriodError::data(format!(
                "profile name '{}' is not of the form <profile_type>{}<entity_name>",
                raw, PROFILE_SEPARATOR
            ))),
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.profile_type, PROFILE_SEPARATOR, self.entity_name
        )
    }
}

impl FromStr for ProfileName {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A named hourly series covering the full horizon.
///
/// `values[i]` is the value at time step `i + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: ProfileName,
    values: Vec<f64>,
}

impl Series {
    /// Create a series, rejecting empty or non-finite data.
    pub fn new(name: ProfileName, values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(PeriodError::data(format!("series '{}' is empty", name)));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(PeriodError::data(format!(
                "series '{}' has non-finite value {} at time step {}",
                name,
                values[pos],
                pos + 1
            )));
        }
        Ok(Self { name, values })
    }

    /// Create a series without validating values.
    ///
    /// Non-finite values are still caught when the period matrix is built.
    pub fn new_unchecked(name: ProfileName, values: Vec<f64>) -> Self {
        Self { name, values }
    }

    pub fn name(&self) -> &ProfileName {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Horizon length `H`.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a 1-based time step.
    pub fn value_at(&self, time_step: usize) -> Option<f64> {
        time_step
            .checked_sub(1)
            .and_then(|i| self.values.get(i).copied())
    }
}
