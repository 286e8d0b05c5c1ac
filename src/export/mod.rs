//! Reshaping clustering results into long-format tables.
//!
//! Produces the three tables a downstream model consumes:
//! `rep_periods_data`, `rep_periods_mapping` and `profiles_rep_periods`.

use crate::clustering::ClusteringResult;
use crate::core::ProfileName;
use crate::error::{PeriodError, Result};
use crate::weights::Weights;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Duration of one time step, in hours
    pub resolution: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { resolution: 1.0 }
    }
}

impl ExportConfig {
    /// Set time step resolution.
    pub fn resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(PeriodError::config(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        Ok(())
    }
}

/// Row of `rep_periods_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepPeriodData {
    pub rep_period: usize,
    pub num_timesteps: usize,
    pub resolution: f64,
}

/// Row of `rep_periods_mapping`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepPeriodMapping {
    pub period: usize,
    pub rep_period: usize,
    pub weight: f64,
}

/// Row of `profiles_rep_periods`.
///
/// The profile name is serialized in its hyphenated `type-name` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRepPeriod {
    #[serde(with = "hyphenated")]
    pub profile_name: ProfileName,
    pub rep_period: usize,
    pub timestep: usize,
    pub value: f64,
}

/// The three output tables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportTables {
    pub rep_periods_data: Vec<RepPeriodData>,
    pub rep_periods_mapping: Vec<RepPeriodMapping>,
    pub profiles_rep_periods: Vec<ProfileRepPeriod>,
}

/// Shape a clustering result and its weights into output tables.
///
/// Profile rows are ordered by hyphenated profile name, then representative
/// period, then time step. Mapping rows are ordered by period, then
/// representative period, and only carry nonzero weights.
pub fn export_tables(
    result: &ClusteringResult,
    weights: &Weights,
    config: &ExportConfig,
) -> Result<ExportTables> {
    config.validate()?;
    if weights.matrix.num_periods() != result.num_periods() {
        return Err(PeriodError::DimensionMismatch {
            expected: result.num_periods(),
            got: weights.matrix.num_periods(),
        });
    }
    if weights.matrix.k() != result.k() {
        return Err(PeriodError::DimensionMismatch {
            expected: result.k(),
            got: weights.matrix.k(),
        });
    }

    let duration = result.period_duration();

    let rep_periods_data = result
        .representatives()
        .iter()
        .map(|rep| RepPeriodData {
            rep_period: rep.id,
            num_timesteps: duration,
            resolution: config.resolution,
        })
        .collect();

    let rep_periods_mapping = weights
        .matrix
        .nonzero()
        .map(|(period, rep_period, weight)| RepPeriodMapping {
            period,
            rep_period,
            weight,
        })
        .collect();

    let mut order: Vec<(String, usize)> = result
        .series_names()
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect();
    order.sort();

    let per_profile: Vec<Vec<ProfileRepPeriod>> = order
        .par_iter()
        .map(|&(_, series_idx)| profile_rows(result, series_idx))
        .collect();
    let profiles_rep_periods: Vec<ProfileRepPeriod> = per_profile.into_iter().flatten().collect();

    debug!(
        rep_periods = result.k(),
        profile_rows = profiles_rep_periods.len(),
        "exported representative periods"
    );

    Ok(ExportTables {
        rep_periods_data,
        rep_periods_mapping,
        profiles_rep_periods,
    })
}

fn profile_rows(result: &ClusteringResult, series_idx: usize) -> Vec<ProfileRepPeriod> {
    let name = &result.series_names()[series_idx];
    let duration = result.period_duration();
    let mut rows = Vec::with_capacity(result.k() * duration);

    for rep in result.representatives() {
        let values = &rep.vector[series_idx * duration..(series_idx + 1) * duration];
        rows.extend(
            values
                .iter()
                .enumerate()
                .map(|(t, &value)| ProfileRepPeriod {
                    profile_name: name.clone(),
                    rep_period: rep.id,
                    timestep: t + 1,
                    value,
                }),
        );
    }
    rows
}

/// Serde adapter writing a [`ProfileName`] as `type-name`.
mod hyphenated {
    use crate::core::ProfileName;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(name: &ProfileName, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(name)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ProfileName, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ProfileName::parse(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::{find_representatives, ClusteringConfig};
    use crate::segment::PeriodMatrix;
    use crate::weights::{build_weight_matrix, WeightPolicy};

    fn fixture() -> (ClusteringResult, Weights) {
        let names = vec![ProfileName::new("demand", "b"), ProfileName::new("availability", "a")];
        let mut names_sorted = names.clone();
        names_sorted.sort();
        let m = PeriodMatrix::from_vectors(
            names_sorted,
            2,
            vec![
                vec![0.1, 0.2, 10.0, 11.0],
                vec![0.9, 0.8, 50.0, 51.0],
                vec![0.1, 0.3, 10.0, 12.0],
            ],
        )
        .unwrap();
        let result = find_representatives(&m, &ClusteringConfig::default().k(2)).unwrap();
        let weights = build_weight_matrix(&result, &m, &WeightPolicy::Dirac).unwrap();
        (result, weights)
    }

    #[test]
    fn rep_periods_data_rows() {
        let (result, weights) = fixture();
        let tables = export_tables(&result, &weights, &ExportConfig::default()).unwrap();

        assert_eq!(
            tables.rep_periods_data,
            vec![
                RepPeriodData {
                    rep_period: 1,
                    num_timesteps: 2,
                    resolution: 1.0
                },
                RepPeriodData {
                    rep_period: 2,
                    num_timesteps: 2,
                    resolution: 1.0
                },
            ]
        );
    }

    #[test]
    fn mapping_rows_cover_every_period() {
        let (result, weights) = fixture();
        let tables = export_tables(&result, &weights, &ExportConfig::default()).unwrap();

        let periods: Vec<usize> = tables.rep_periods_mapping.iter().map(|r| r.period).collect();
        assert_eq!(periods, vec![1, 2, 3]);
        assert_eq!(tables.rep_periods_mapping[0].rep_period, 1);
        assert_eq!(tables.rep_periods_mapping[1].rep_period, 2);
        assert_eq!(tables.rep_periods_mapping[2].rep_period, 1);
        assert!(tables.rep_periods_mapping.iter().all(|r| r.weight == 1.0));
    }

    #[test]
    fn profile_rows_are_sorted() {
        let (result, weights) = fixture();
        let tables = export_tables(&result, &weights, &ExportConfig::default()).unwrap();
        let rows = &tables.profiles_rep_periods;

        assert_eq!(rows.len(), 2 * 2 * 2);
        let keys: Vec<(String, usize, usize)> = rows
            .iter()
            .map(|r| (r.profile_name.to_string(), r.rep_period, r.timestep))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(rows[0].profile_name.to_string(), "availability-a");
        assert_eq!(rows[4].profile_name.to_string(), "demand-b");
    }

    #[test]
    fn export_is_idempotent() {
        let (result, weights) = fixture();
        let config = ExportConfig::default().resolution(0.5);
        let first = export_tables(&result, &weights, &config).unwrap();
        let second = export_tables(&result, &weights, &config).unwrap();
        assert_eq!(first, second);
        assert!(first.rep_periods_data.iter().all(|r| r.resolution == 0.5));
    }

    #[test]
    fn rejects_bad_resolution() {
        let (result, weights) = fixture();
        let err = export_tables(&result, &weights, &ExportConfig::default().resolution(0.0));
        assert!(matches!(err, Err(PeriodError::Configuration(_))));
    }

    #[test]
    fn profile_name_serializes_hyphenated() {
        let row = ProfileRepPeriod {
            profile_name: ProfileName::new("demand", "ccgt"),
            rep_period: 1,
            timestep: 3,
            value: 2.5,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(
            json,
            r#"{"profile_name":"demand-ccgt","rep_period":1,"timestep":3,"value":2.5}"#
        );
        let back: ProfileRepPeriod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);

        let bad = r#"{"profile_name":"demand","rep_period":1,"timestep":3,"value":2.5}"#;
        assert!(serde_json::from_str::<ProfileRepPeriod>(bad).is_err());
    }
}
