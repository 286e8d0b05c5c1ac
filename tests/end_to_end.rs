//! End-to-end scenarios from the `profiles` table to the output tables.

use anofox_periods::clustering::{ClusteringConfig, RepresentativeMethod};
use anofox_periods::core::ProfileTable;
use anofox_periods::export::{export_tables, RepPeriodData, RepPeriodMapping};
use anofox_periods::pipeline::{Pipeline, PipelineConfig, RunContext};
use anofox_periods::store::{InMemoryStore, TableStore};
use anofox_periods::weights::{reconstruction_error, WeightPolicy};
use anofox_periods::PeriodError;
use approx::assert_relative_eq;

fn run(table: ProfileTable, config: PipelineConfig) -> anofox_periods::pipeline::PipelineOutput {
    let mut ctx = RunContext::new(config).unwrap();
    Pipeline::new().run(table, &mut ctx).unwrap()
}

/// Hourly demand with a daily shape and a weekday/weekend level.
fn synthetic_year(days: usize) -> ProfileTable {
    let mut table = ProfileTable::new();
    let demand: Vec<f64> = (0..days * 24)
        .map(|t| {
            let hour = (t % 24) as f64;
            let day = t / 24;
            let level = if day % 7 >= 5 { 60.0 } else { 100.0 };
            level + 20.0 * (std::f64::consts::PI * hour / 12.0).sin()
        })
        .collect();
    let wind: Vec<f64> = (0..days * 24)
        .map(|t| 0.5 + 0.4 * ((t / 24) as f64 * 0.9).sin())
        .collect();
    table.push_series("demand-city", &demand);
    table.push_series("availability-wind", &wind);
    table
}

// =============================================================================
// Two series, two periods, one representative
// =============================================================================

#[test]
fn two_series_single_representative() {
    let mut table = ProfileTable::new();
    let a: Vec<f64> = (0..48).map(|t| t as f64).collect();
    let b: Vec<f64> = (0..48).map(|t| 100.0 - t as f64).collect();
    table.push_series("demand-a", &a);
    table.push_series("availability-b", &b);

    let config = PipelineConfig::default()
        .period_duration(24)
        .num_representative_periods(1);
    let output = run(table, config);
    let tables = &output.tables;

    assert_eq!(
        tables.rep_periods_data,
        vec![RepPeriodData {
            rep_period: 1,
            num_timesteps: 24,
            resolution: 1.0
        }]
    );
    assert_eq!(
        tables.rep_periods_mapping,
        vec![
            RepPeriodMapping {
                period: 1,
                rep_period: 1,
                weight: 1.0
            },
            RepPeriodMapping {
                period: 2,
                rep_period: 1,
                weight: 1.0
            },
        ]
    );
    assert_eq!(tables.profiles_rep_periods.len(), 48);
    assert!(tables.profiles_rep_periods.iter().all(|r| r.rep_period == 1));
    assert_eq!(
        tables.profiles_rep_periods[0].profile_name.to_string(),
        "availability-b"
    );
    assert_eq!(
        tables.profiles_rep_periods[24].profile_name.to_string(),
        "demand-a"
    );
}

// =============================================================================
// Constant series stay constant
// =============================================================================

#[test]
fn constant_series_representatives_are_constant() {
    for (days, k) in [(4, 1), (4, 2), (6, 3), (6, 6)] {
        let mut table = synthetic_year(days);
        table.push_series("demand-flat", &vec![5.0; days * 24]);

        for method in [RepresentativeMethod::Medoid, RepresentativeMethod::Mean] {
            let config = PipelineConfig::default().clustering(
                ClusteringConfig::default().k(k).method(method),
            );
            let output = run(table.clone(), config);

            let flat: Vec<_> = output
                .tables
                .profiles_rep_periods
                .iter()
                .filter(|r| r.profile_name.to_string() == "demand-flat")
                .collect();
            assert_eq!(flat.len(), k * 24);
            for row in flat {
                assert_relative_eq!(row.value, 5.0, epsilon = 1e-12);
            }
        }
    }
}

// =============================================================================
// Identity at k = number of periods
// =============================================================================

#[test]
fn every_period_is_its_own_representative() {
    let output = run(
        synthetic_year(7),
        PipelineConfig::default().num_representative_periods(7),
    );

    let mapping = &output.tables.rep_periods_mapping;
    assert_eq!(mapping.len(), 7);
    for (i, row) in mapping.iter().enumerate() {
        assert_eq!(row.period, i + 1);
        assert_eq!(row.rep_period, i + 1);
        assert_eq!(row.weight, 1.0);
    }

    let err = reconstruction_error(&output.result, &output.periods, &output.weights.matrix).unwrap();
    assert_relative_eq!(err, 0.0, epsilon = 1e-12);
}

// =============================================================================
// Weekday / weekend structure is recovered
// =============================================================================

#[test]
fn weekday_and_weekend_separate() {
    let mut table = ProfileTable::new();
    let demand: Vec<f64> = (0..28 * 24)
        .map(|t| if (t / 24) % 7 >= 5 { 50.0 } else { 100.0 })
        .collect();
    table.push_series("demand-office", &demand);

    let output = run(table, PipelineConfig::default().num_representative_periods(2));
    let result = &output.result;

    // Day 1 is a weekday, so representative 1 is the weekday profile.
    for day in 1..=28 {
        let expected = if (day - 1) % 7 >= 5 { 2 } else { 1 };
        assert_eq!(result.rep_period_of(day), Some(expected));
    }
    assert_eq!(output.weights.summaries[0].num_periods, 20);
    assert_eq!(output.weights.summaries[1].num_periods, 8);
    assert!(result.converged);
}

// =============================================================================
// Re-running export is idempotent
// =============================================================================

#[test]
fn export_rerun_is_identical() {
    let config = PipelineConfig::default().num_representative_periods(3);
    let output = run(synthetic_year(14), config.clone());

    let again = export_tables(&output.result, &output.weights, &config.export).unwrap();
    let third = export_tables(&output.result, &output.weights, &config.export).unwrap();
    assert_eq!(again, output.tables);
    assert_eq!(again, third);
}

// =============================================================================
// Convex weights
// =============================================================================

#[test]
fn convex_weights_reduce_reconstruction_error() {
    let hard = run(
        synthetic_year(21),
        PipelineConfig::default().num_representative_periods(3),
    );
    let soft = run(
        synthetic_year(21),
        PipelineConfig::default()
            .num_representative_periods(3)
            .weights(WeightPolicy::convex()),
    );

    assert_eq!(hard.result, soft.result);
    let hard_err = reconstruction_error(&hard.result, &hard.periods, &hard.weights.matrix).unwrap();
    let soft_err = reconstruction_error(&soft.result, &soft.periods, &soft.weights.matrix).unwrap();
    assert!(soft_err <= hard_err + 1e-9);

    for period in 1..=21 {
        let total: f64 = soft
            .tables
            .rep_periods_mapping
            .iter()
            .filter(|r| r.period == period)
            .map(|r| r.weight)
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }
}

// =============================================================================
// Error paths
// =============================================================================

#[test]
fn malformed_inputs_are_rejected() {
    let mut table = ProfileTable::new();
    table.push_series("demand", &[1.0; 24]);
    let mut ctx = RunContext::new(PipelineConfig::default().num_representative_periods(1)).unwrap();
    assert!(matches!(
        Pipeline::new().run(table, &mut ctx),
        Err(PeriodError::Data(_))
    ));

    let mut table = ProfileTable::new();
    table.push_series("demand-a", &[1.0; 25]);
    let mut ctx = RunContext::new(PipelineConfig::default().num_representative_periods(1)).unwrap();
    assert!(matches!(
        Pipeline::new().run(table, &mut ctx),
        Err(PeriodError::Configuration(_))
    ));

    let mut table = ProfileTable::new();
    table.push_series("demand-a", &[1.0; 48]);
    let mut ctx = RunContext::new(PipelineConfig::default().num_representative_periods(3)).unwrap();
    assert!(matches!(
        Pipeline::new().run(table, &mut ctx),
        Err(PeriodError::Configuration(_))
    ));
}

#[test]
fn store_receives_outputs() {
    let mut store = InMemoryStore::new(synthetic_year(10));
    let mut ctx = RunContext::new(PipelineConfig::default().num_representative_periods(2)).unwrap();
    let output = Pipeline::new().run_with_store(&mut store, &mut ctx).unwrap();

    assert_eq!(store.outputs, output.tables);
    assert_eq!(store.read_profiles().unwrap().len(), 2 * 10 * 24);
}
