//! Representative Periods Example
//!
//! Builds a synthetic year of hourly profiles, clusters the days into a few
//! representative periods, and prints the resulting tables.
//!
//! Run with: cargo run --example representative_periods

use anofox_periods::clustering::elbow_inertias;
use anofox_periods::core::ProfileTable;
use anofox_periods::pipeline::{Pipeline, PipelineConfig, RunContext, SegmentStage, Stage};
use anofox_periods::weights::{reconstruction_error, WeightPolicy};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Representative Periods Example ===\n");

    let mut table = ProfileTable::new();
    let demand: Vec<f64> = (0..8760)
        .map(|t| {
            let hour = (t % 24) as f64;
            let day = t / 24;
            let weekend = if day % 7 >= 5 { -25.0 } else { 0.0 };
            let season = 15.0 * (2.0 * std::f64::consts::PI * day as f64 / 365.0).cos();
            100.0 + weekend + season + 20.0 * (std::f64::consts::PI * hour / 12.0).sin()
        })
        .collect();
    let solar: Vec<f64> = (0..8760)
        .map(|t| {
            let hour = (t % 24) as f64;
            (std::f64::consts::PI * (hour - 6.0) / 12.0).sin().max(0.0)
        })
        .collect();
    table.push_series("demand-city", &demand);
    table.push_series("availability-solar", &solar);

    // =========================================================================
    // Choosing k
    // =========================================================================
    println!("--- Elbow curve ---\n");

    let mut ctx = RunContext::new(PipelineConfig::default()).expect("valid config");
    let periods = SegmentStage
        .run(table.clone(), &mut ctx)
        .expect("valid profiles");
    let inertias =
        elbow_inertias(&periods, 8, &ctx.config().clustering).expect("clustering succeeds");
    for (k, inertia) in inertias.iter().enumerate() {
        println!("  k = {}: inertia = {:.2}", k + 1, inertia);
    }

    // =========================================================================
    // Full pipeline
    // =========================================================================
    println!("\n--- Pipeline with k = 4 ---\n");

    for policy in [WeightPolicy::Dirac, WeightPolicy::convex()] {
        let config = PipelineConfig::default()
            .num_representative_periods(4)
            .random_seed(42)
            .weights(policy.clone());
        let mut ctx = RunContext::new(config).expect("valid config");
        let output = Pipeline::new().run(table.clone(), &mut ctx).expect("pipeline succeeds");

        println!("Weight policy: {:?}", policy);
        for summary in &output.weights.summaries {
            println!(
                "  rep period {}: {} periods, total weight {:.2}",
                summary.rep_period, summary.num_periods, summary.total_weight
            );
        }
        let rmse = reconstruction_error(&output.result, &output.periods, &output.weights.matrix)
            .expect("matching dimensions");
        println!("  reconstruction RMSE: {:.4}", rmse);
        println!(
            "  rows: {} rep_periods_data, {} rep_periods_mapping, {} profiles_rep_periods",
            output.tables.rep_periods_data.len(),
            output.tables.rep_periods_mapping.len(),
            output.tables.profiles_rep_periods.len()
        );
        for warning in ctx.warnings() {
            println!("  warning: {}", warning);
        }
        println!();
    }
}
