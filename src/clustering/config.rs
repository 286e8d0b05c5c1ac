//! Clustering configuration.

use super::distance::DistanceMetric;
use crate::error::{PeriodError, Result};
use serde::{Deserialize, Serialize};

/// How a cluster's representative is derived from its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentativeMethod {
    /// The member period minimizing total distance to the other members.
    #[default]
    Medoid,
    /// Element-wise mean of the member periods.
    Mean,
}

/// Scaling applied to period vectors before distances are measured.
///
/// Representatives are always reported in original units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    #[default]
    None,
    /// Scale each series to `[0, 1]` over the full horizon.
    MinMax,
}

/// Representative period clustering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Number of representative periods
    #[serde(alias = "num_representative_periods")]
    pub k: usize,
    /// Maximum assignment/update iterations
    pub max_iterations: usize,
    /// Distance metric
    #[serde(alias = "distance_metric")]
    pub metric: DistanceMetric,
    /// Medoid or mean representatives
    pub method: RepresentativeMethod,
    /// Random seed for initialization
    #[serde(alias = "random_seed")]
    pub seed: u64,
    /// Scaling for distance computation
    pub scaling: Scaling,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            k: 10,
            max_iterations: 100,
            metric: DistanceMetric::Euclidean,
            method: RepresentativeMethod::Medoid,
            seed: 42,
            scaling: Scaling::None,
        }
    }
}

impl ClusteringConfig {
    /// Set number of representative periods.
    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set maximum iterations.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set distance metric.
    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Set representative method.
    pub fn method(mut self, method: RepresentativeMethod) -> Self {
        self.method = method;
        self
    }

    /// Set random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set scaling for distance computation.
    pub fn scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    /// Check parameters that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(PeriodError::config(
                "num_representative_periods must be positive",
            ));
        }
        if self.max_iterations == 0 {
            return Err(PeriodError::config("max_iterations must be positive"));
        }
        Ok(())
    }

    /// Check parameters against the number of available periods.
    pub fn validate_for(&self, num_periods: usize) -> Result<()> {
        self.validate()?;
        if self.k > num_periods {
            return Err(PeriodError::config(format!(
                "num_representative_periods {} exceeds the number of periods {}",
                self.k, num_periods
            )));
        }
        Ok(())
    }
}
