//! # anofox-periods
//!
//! Representative period clustering for hourly time series profiles.
//!
//! Splits long profiles (one per asset and profile type) into fixed-length
//! periods, clusters the periods jointly across all profiles into a small set
//! of representative periods, maps every original period onto those
//! representatives with a weight matrix, and shapes the result into the
//! long-format tables a downstream optimization model consumes.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::neg_cmp_op_on_partial_ord)]

pub mod clustering;
pub mod core;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod segment;
pub mod store;
pub mod weights;

pub use error::{ConvergenceWarning, PeriodError, Result};

pub mod prelude {
    pub use crate::clustering::{
        find_representatives, ClusteringConfig, ClusteringResult, DistanceMetric,
        RepresentativeMethod, Scaling,
    };
    pub use crate::core::{ProfileName, ProfileRow, ProfileTable, Series};
    pub use crate::error::{ConvergenceWarning, PeriodError, Result};
    pub use crate::export::{export_tables, ExportConfig, ExportTables};
    pub use crate::pipeline::{Pipeline, PipelineConfig, RunContext, Stage};
    pub use crate::segment::{build_period_matrix, split_into_periods, PeriodMatrix};
    pub use crate::store::{InMemoryStore, TableStore};
    pub use crate::weights::{build_weight_matrix, WeightMatrix, WeightPolicy, Weights};
}
