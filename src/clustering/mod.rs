//! Representative period clustering.
//!
//! Groups period vectors into `k` clusters with a k-medoids style procedure
//! and derives one representative period per cluster.
//!
//! # Example
//!
//! ```
//! use anofox_periods::clustering::{find_representatives, ClusteringConfig};
//! use anofox_periods::core::ProfileName;
//! use anofox_periods::segment::PeriodMatrix;
//!
//! let vectors = vec![
//!     vec![1.0, 2.0, 1.0],
//!     vec![1.1, 2.1, 1.1],
//!     vec![10.0, 11.0, 10.0],
//!     vec![10.1, 11.1, 10.1],
//! ];
//! let names = vec![ProfileName::new("demand", "a")];
//! let matrix = PeriodMatrix::from_vectors(names, 3, vectors).unwrap();
//! let config = ClusteringConfig::default().k(2).seed(42);
//! let result = find_representatives(&matrix, &config).unwrap();
//! assert_eq!(result.assignments(), &[1, 1, 2, 2]);
//! ```

mod config;
pub mod distance;
mod kmedoids;

pub use config::{ClusteringConfig, RepresentativeMethod, Scaling};
pub use distance::{
    cosine_distance, euclidean_distance, manhattan_distance, squared_euclidean_distance,
    DistanceMetric,
};
pub use kmedoids::{elbow_inertias, find_representatives, ClusteringResult, RepresentativePeriod};
