//! Explicit pipeline composing segmentation, clustering, weighting and export.
//!
//! Each step is a [`Stage`] with typed input and output, so stages can be run
//! and tested on their own. A [`RunContext`] carries the configuration and
//! collected warnings for exactly one run.
//!
//! # Example
//!
//! ```
//! use anofox_periods::core::ProfileTable;
//! use anofox_periods::pipeline::{Pipeline, PipelineConfig, RunContext};
//!
//! let mut table = ProfileTable::new();
//! table.push_series("demand-a", &vec![1.0; 48]);
//! table.push_series("availability-b", &vec![0.5; 48]);
//!
//! let config = PipelineConfig::default().num_representative_periods(1);
//! let mut ctx = RunContext::new(config).unwrap();
//! let output = Pipeline::new().run(table, &mut ctx).unwrap();
//!
//! assert_eq!(output.tables.rep_periods_data.len(), 1);
//! assert_eq!(output.tables.rep_periods_mapping.len(), 2);
//! assert_eq!(output.tables.profiles_rep_periods.len(), 48);
//! ```

use crate::clustering::{find_representatives, ClusteringConfig, ClusteringResult, DistanceMetric};
use crate::core::ProfileTable;
use crate::error::{ConvergenceWarning, PeriodError, Result};
use crate::export::{export_tables, ExportConfig, ExportTables};
use crate::segment::{build_period_matrix, PeriodMatrix};
use crate::store::TableStore;
use crate::weights::{build_weight_matrix, WeightPolicy, Weights};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

/// Configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Time steps per period
    pub period_duration: usize,
    #[serde(flatten)]
    pub clustering: ClusteringConfig,
    pub weights: WeightPolicy,
    pub export: ExportConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            period_duration: 24,
            clustering: ClusteringConfig::default(),
            weights: WeightPolicy::Dirac,
            export: ExportConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Set period duration.
    pub fn period_duration(mut self, period_duration: usize) -> Self {
        self.period_duration = period_duration;
        self
    }

    /// Set number of representative periods.
    pub fn num_representative_periods(mut self, k: usize) -> Self {
        self.clustering.k = k;
        self
    }

    /// Set distance metric.
    pub fn distance_metric(mut self, metric: DistanceMetric) -> Self {
        self.clustering.metric = metric;
        self
    }

    /// Set random seed.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.clustering.seed = seed;
        self
    }

    /// Set clustering iteration bound.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.clustering.max_iterations = max_iterations;
        self
    }

    /// Replace the clustering configuration.
    pub fn clustering(mut self, clustering: ClusteringConfig) -> Self {
        self.clustering = clustering;
        self
    }

    /// Set weight policy.
    pub fn weights(mut self, weights: WeightPolicy) -> Self {
        self.weights = weights;
        self
    }

    /// Set export configuration.
    pub fn export(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }

    /// Check every parameter that does not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if self.period_duration == 0 {
            return Err(PeriodError::config("period_duration must be positive"));
        }
        self.clustering.validate()?;
        self.weights.validate()?;
        self.export.validate()
    }
}

/// State for exactly one pipeline run.
///
/// Created by the caller, lent to each stage, and dropped with the run.
#[derive(Debug, Clone)]
pub struct RunContext {
    config: PipelineConfig,
    warnings: Vec<ConvergenceWarning>,
}

impl RunContext {
    /// Create a context, validating the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            warnings: Vec::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Non-fatal warnings raised so far.
    pub fn warnings(&self) -> &[ConvergenceWarning] {
        &self.warnings
    }

    fn warn(&mut self, warning: ConvergenceWarning) {
        self.warnings.push(warning);
    }
}

/// One step of the pipeline.
pub trait Stage {
    type Input;
    type Output;

    /// Stage name used in logs.
    fn name(&self) -> &'static str;

    fn run(&self, input: Self::Input, ctx: &mut RunContext) -> Result<Self::Output>;
}

/// Validates the `profiles` table and builds period vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentStage;

impl Stage for SegmentStage {
    type Input = ProfileTable;
    type Output = PeriodMatrix;

    fn name(&self) -> &'static str {
        "segment"
    }

    fn run(&self, input: ProfileTable, ctx: &mut RunContext) -> Result<PeriodMatrix> {
        let series = input.to_series()?;
        build_period_matrix(&series, ctx.config.period_duration)
    }
}

/// Period vectors with their clustering.
#[derive(Debug, Clone)]
pub struct Clustered {
    pub periods: PeriodMatrix,
    pub result: ClusteringResult,
}

/// Clusters period vectors into representative periods.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterStage;

impl Stage for ClusterStage {
    type Input = PeriodMatrix;
    type Output = Clustered;

    fn name(&self) -> &'static str {
        "cluster"
    }

    fn run(&self, input: PeriodMatrix, ctx: &mut RunContext) -> Result<Clustered> {
        let result = find_representatives(&input, &ctx.config.clustering)?;
        if let Some(warning) = &result.warning {
            ctx.warn(warning.clone());
        }
        Ok(Clustered {
            periods: input,
            result,
        })
    }
}

/// Clustering plus its weight matrix.
#[derive(Debug, Clone)]
pub struct Weighted {
    pub periods: PeriodMatrix,
    pub result: ClusteringResult,
    pub weights: Weights,
}

/// Builds the weight matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightStage;

impl Stage for WeightStage {
    type Input = Clustered;
    type Output = Weighted;

    fn name(&self) -> &'static str {
        "weights"
    }

    fn run(&self, input: Clustered, ctx: &mut RunContext) -> Result<Weighted> {
        let weights = build_weight_matrix(&input.result, &input.periods, &ctx.config.weights)?;
        Ok(Weighted {
            periods: input.periods,
            result: input.result,
            weights,
        })
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub periods: PeriodMatrix,
    pub result: ClusteringResult,
    pub weights: Weights,
    pub tables: ExportTables,
}

/// Shapes the output tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportStage;

impl Stage for ExportStage {
    type Input = Weighted;
    type Output = PipelineOutput;

    fn name(&self) -> &'static str {
        "export"
    }

    fn run(&self, input: Weighted, ctx: &mut RunContext) -> Result<PipelineOutput> {
        let tables = export_tables(&input.result, &input.weights, &ctx.config.export)?;
        Ok(PipelineOutput {
            periods: input.periods,
            result: input.result,
            weights: input.weights,
            tables,
        })
    }
}

fn run_stage<S: Stage>(stage: &S, input: S::Input, ctx: &mut RunContext) -> Result<S::Output> {
    let _span = info_span!("stage", name = stage.name()).entered();
    stage.run(input, ctx)
}

/// The four stages in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipeline {
    pub segment: SegmentStage,
    pub cluster: ClusterStage,
    pub weight: WeightStage,
    pub export: ExportStage,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every stage on a `profiles` table.
    pub fn run(&self, profiles: ProfileTable, ctx: &mut RunContext) -> Result<PipelineOutput> {
        let periods = run_stage(&self.segment, profiles, ctx)?;
        let clustered = run_stage(&self.cluster, periods, ctx)?;
        let weighted = run_stage(&self.weight, clustered, ctx)?;
        let output = run_stage(&self.export, weighted, ctx)?;

        info!(
            rep_periods = output.result.k(),
            periods = output.result.num_periods(),
            warnings = ctx.warnings().len(),
            "pipeline finished"
        );
        Ok(output)
    }

    /// Read `profiles` from a store, run, and write the output tables back.
    pub fn run_with_store<T: TableStore + ?Sized>(
        &self,
        store: &mut T,
        ctx: &mut RunContext,
    ) -> Result<PipelineOutput> {
        let profiles = store.read_profiles()?;
        let output = self.run(profiles, ctx)?;
        store.write_tables(&output.tables)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::RepresentativeMethod;
    use crate::store::InMemoryStore;

    fn two_series(horizon: usize) -> ProfileTable {
        let mut table = ProfileTable::new();
        let demand: Vec<f64> = (0..horizon).map(|t| 10.0 + (t % 24) as f64).collect();
        let solar: Vec<f64> = (0..horizon)
            .map(|t| if (6..18).contains(&(t % 24)) { 0.8 } else { 0.0 })
            .collect();
        table.push_series("demand-town", &demand);
        table.push_series("availability-solar", &solar);
        table
    }

    #[test]
    fn config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.period_duration, 24);
        assert_eq!(config.weights, WeightPolicy::Dirac);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_zero_duration() {
        let config = PipelineConfig::default().period_duration(0);
        assert!(matches!(
            RunContext::new(config),
            Err(PeriodError::Configuration(_))
        ));
    }

    #[test]
    fn config_deserializes_flat_options() {
        let json = r#"{
            "period_duration": 12,
            "num_representative_periods": 3,
            "distance_metric": "manhattan",
            "random_seed": 5,
            "max_iterations": 20,
            "method": "mean",
            "weights": "dirac",
            "export": {"resolution": 0.25}
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.period_duration, 12);
        assert_eq!(config.clustering.k, 3);
        assert_eq!(config.clustering.metric, DistanceMetric::Manhattan);
        assert_eq!(config.clustering.seed, 5);
        assert_eq!(config.clustering.max_iterations, 20);
        assert_eq!(config.clustering.method, RepresentativeMethod::Mean);
        assert_eq!(config.export.resolution, 0.25);
    }

    #[test]
    fn stages_run_independently() {
        let config = PipelineConfig::default().num_representative_periods(2);
        let mut ctx = RunContext::new(config).unwrap();

        let periods = SegmentStage.run(two_series(24 * 5), &mut ctx).unwrap();
        assert_eq!(periods.num_periods(), 5);
        assert_eq!(periods.num_series(), 2);

        let clustered = ClusterStage.run(periods, &mut ctx).unwrap();
        assert_eq!(clustered.result.k(), 2);

        let weighted = WeightStage.run(clustered, &mut ctx).unwrap();
        assert_eq!(weighted.weights.matrix.num_periods(), 5);

        let output = ExportStage.run(weighted, &mut ctx).unwrap();
        assert_eq!(output.tables.rep_periods_data.len(), 2);
    }

    #[test]
    fn k_larger_than_periods_fails() {
        let config = PipelineConfig::default().num_representative_periods(4);
        let mut ctx = RunContext::new(config).unwrap();
        let err = Pipeline::new().run(two_series(72), &mut ctx).unwrap_err();
        assert!(matches!(err, PeriodError::Configuration(_)));
    }

    #[test]
    fn non_divisible_horizon_fails() {
        let config = PipelineConfig::default().num_representative_periods(1);
        let mut ctx = RunContext::new(config).unwrap();
        let err = Pipeline::new().run(two_series(30), &mut ctx).unwrap_err();
        assert!(matches!(err, PeriodError::Configuration(_)));
    }

    #[test]
    fn non_finite_value_names_series_and_period() {
        let mut values = vec![1.0; 72];
        values[30] = f64::NAN;
        let mut table = ProfileTable::new();
        table.push_series("demand-town", &values);

        let config = PipelineConfig::default().num_representative_periods(1);
        let mut ctx = RunContext::new(config).unwrap();
        let err = Pipeline::new().run(table, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            PeriodError::Data("non-finite value in series 'demand-town' period 2".into())
        );
    }

    #[test]
    fn run_with_store_writes_tables() {
        let mut store = InMemoryStore::new(two_series(96));
        let config = PipelineConfig::default().num_representative_periods(2);
        let mut ctx = RunContext::new(config).unwrap();

        let output = Pipeline::new().run_with_store(&mut store, &mut ctx).unwrap();
        assert_eq!(store.outputs, output.tables);
        assert_eq!(store.outputs.rep_periods_mapping.len(), 4);
        assert_eq!(store.outputs.profiles_rep_periods.len(), 2 * 2 * 24);
    }

    #[test]
    fn convergence_warning_is_collected() {
        let mut table = ProfileTable::new();
        let values: Vec<f64> = (0..24 * 30)
            .map(|t| ((t as f64) * 0.37).sin() * 10.0 + ((t / 24) as f64 * 1.7).cos() * 5.0)
            .collect();
        table.push_series("demand-noisy", &values);

        let config = PipelineConfig::default()
            .num_representative_periods(6)
            .max_iterations(1)
            .clustering(
                ClusteringConfig::default()
                    .k(6)
                    .max_iterations(1)
                    .method(RepresentativeMethod::Mean),
            );
        let mut ctx = RunContext::new(config).unwrap();
        let output = Pipeline::new().run(table, &mut ctx).unwrap();

        assert!(!output.result.converged);
        assert_eq!(ctx.warnings().len(), 1);
        assert_eq!(ctx.warnings()[0].iterations, 1);
        assert_eq!(Some(&ctx.warnings()[0]), output.result.warning.as_ref());
        assert_eq!(output.result.k(), 6);
    }
}
