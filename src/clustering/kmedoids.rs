//! Partition-based clustering of period vectors.
//!
//! Alternates nearest-center assignment with medoid (or mean) updates until
//! the assignment is stable, keeping every cluster non-empty.

use super::config::{ClusteringConfig, RepresentativeMethod, Scaling};
use super::distance::DistanceMetric;
use crate::core::ProfileName;
use crate::error::{ConvergenceWarning, Result};
use crate::segment::PeriodMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// One representative period.
#[derive(Debug, Clone, PartialEq)]
pub struct RepresentativePeriod {
    /// 1-based representative period id
    pub id: usize,
    /// Representative values in original units, laid out like a period vector
    pub vector: Vec<f64>,
    /// Original period (1-based) chosen as medoid, if the method picks one
    pub medoid_period: Option<usize>,
    /// Member periods (1-based, ascending)
    pub members: Vec<usize>,
}

/// Outcome of a clustering run. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringResult {
    series_names: Vec<ProfileName>,
    period_duration: usize,
    /// Representative id (1-based) for each original period, index 0 is period 1
    assignments: Vec<usize>,
    representatives: Vec<RepresentativePeriod>,
    /// Sum of member-to-center distances, measured in the (possibly scaled)
    /// space the clustering ran in
    pub inertia: f64,
    /// Number of assignment steps performed
    pub iterations: usize,
    /// Whether the assignment stabilized before the iteration bound
    pub converged: bool,
    /// Set when the iteration bound was hit
    pub warning: Option<ConvergenceWarning>,
}

impl ClusteringResult {
    /// Number of representative periods.
    pub fn k(&self) -> usize {
        self.representatives.len()
    }

    pub fn num_periods(&self) -> usize {
        self.assignments.len()
    }

    pub fn period_duration(&self) -> usize {
        self.period_duration
    }

    pub fn series_names(&self) -> &[ProfileName] {
        &self.series_names
    }

    pub fn representatives(&self) -> &[RepresentativePeriod] {
        &self.representatives
    }

    /// Representative id per original period.
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    /// Representative id for a 1-based original period.
    pub fn rep_period_of(&self, period: usize) -> Option<usize> {
        period
            .checked_sub(1)
            .and_then(|p| self.assignments.get(p).copied())
    }

    /// Number of periods in each cluster, indexed by `id - 1`.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.representatives
            .iter()
            .map(|r| r.members.len())
            .collect()
    }

    /// Representative value for one series at a 1-based step within the period.
    pub fn value(&self, rep_period: usize, series_idx: usize, timestep: usize) -> Option<f64> {
        if series_idx >= self.series_names.len() || timestep == 0 || timestep > self.period_duration
        {
            return None;
        }
        let rep = self.representatives.get(rep_period.checked_sub(1)?)?;
        rep.vector
            .get(series_idx * self.period_duration + timestep - 1)
            .copied()
    }
}

/// Cluster the period vectors into `config.k` representative periods.
///
/// # Errors
/// Configuration error when `k` is zero or exceeds the number of periods, or
/// when `max_iterations` is zero.
pub fn find_representatives(
    matrix: &PeriodMatrix,
    config: &ClusteringConfig,
) -> Result<ClusteringResult> {
    let n = matrix.num_periods();
    config.validate_for(n)?;
    let k = config.k;

    let scaled: Cow<'_, [Vec<f64>]> = match config.scaling {
        Scaling::None => Cow::Borrowed(matrix.vectors()),
        Scaling::MinMax => Cow::Owned(matrix.min_max_scaled()),
    };
    let space: &[Vec<f64>] = &scaled;

    let initial = initialize_centers(space, k, config.metric, config.seed);
    debug!(?initial, seed = config.seed, "initial centers");
    let mut centers: Vec<Vec<f64>> = initial.iter().map(|&i| space[i].clone()).collect();

    let mut labels: Option<Vec<usize>> = None;
    let mut best: Option<(Vec<usize>, Vec<Vec<f64>>, f64)> = None;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..config.max_iterations {
        iterations = iter + 1;

        let (mut new_labels, mut dists) = assign(space, &centers, config.metric);
        let moved = reseed_empty_clusters(&mut new_labels, &mut dists, k);
        if moved > 0 {
            debug!(iteration = iterations, moved, "re-seeded empty clusters");
        }

        if labels.as_ref() == Some(&new_labels) {
            converged = true;
            break;
        }

        let new_centers = update_centers(space, &new_labels, k, config.metric, config.method);
        let inertia = compute_inertia(space, &new_labels, &new_centers, config.metric);
        debug!(iteration = iterations, inertia, "clustering iteration");

        let stable = new_centers == centers;
        if best.as_ref().map_or(true, |(_, _, b)| inertia < *b) {
            best = Some((new_labels.clone(), new_centers.clone(), inertia));
        }
        centers = new_centers;
        labels = Some(new_labels);

        if stable {
            converged = true;
            break;
        }
    }

    let (final_labels, final_centers, inertia) = if converged {
        let final_labels = labels.unwrap_or_default();
        let inertia = compute_inertia(space, &final_labels, &centers, config.metric);
        (final_labels, centers, inertia)
    } else {
        best.unwrap_or_default()
    };

    let warning = if converged {
        None
    } else {
        let warning = ConvergenceWarning {
            iterations,
            max_iterations: config.max_iterations,
            inertia,
        };
        warn!(%warning, "returning best assignment found");
        Some(warning)
    };

    let representatives = build_representatives(
        matrix,
        space,
        &final_labels,
        &final_centers,
        k,
        config.method,
        config.metric,
    );

    let mut assignments = vec![0; n];
    for rep in &representatives {
        for &p in &rep.members {
            assignments[p - 1] = rep.id;
        }
    }

    info!(
        k,
        num_periods = n,
        iterations,
        converged,
        inertia,
        "found representative periods"
    );

    Ok(ClusteringResult {
        series_names: matrix.series_names().to_vec(),
        period_duration: matrix.period_duration(),
        assignments,
        representatives,
        inertia,
        iterations,
        converged,
        warning,
    })
}

/// Pick `k` distinct starting periods with k-means++ seeding.
///
/// Candidates are drawn proportional to the squared distance to the nearest
/// chosen center. When every remaining candidate coincides with a chosen
/// center, the lowest unchosen index is used.
fn initialize_centers(
    space: &[Vec<f64>],
    k: usize,
    metric: DistanceMetric,
    seed: u64,
) -> Vec<usize> {
    let n = space.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut chosen = vec![false; n];
    let mut centers = Vec::with_capacity(k);

    let first = rng.gen_range(0..n);
    chosen[first] = true;
    centers.push(first);

    let mut weights: Vec<f64> = space
        .iter()
        .map(|v| metric.distance(v, &space[first]).powi(2))
        .collect();

    while centers.len() < k {
        let total: f64 = (0..n).filter(|&i| !chosen[i]).map(|i| weights[i]).sum();

        let fallback = (0..n).find(|&i| !chosen[i]).unwrap_or(0);
        let next = if total > 0.0 && total.is_finite() {
            let threshold = rng.gen::<f64>() * total;
            let mut cumsum = 0.0;
            let mut selected = None;
            let mut last_positive = fallback;
            for i in (0..n).filter(|&i| !chosen[i]) {
                if weights[i] <= 0.0 {
                    continue;
                }
                last_positive = i;
                cumsum += weights[i];
                if cumsum >= threshold {
                    selected = Some(i);
                    break;
                }
            }
            selected.unwrap_or(last_positive)
        } else {
            fallback
        };

        chosen[next] = true;
        centers.push(next);
        for (i, w) in weights.iter_mut().enumerate() {
            let d = metric.distance(&space[i], &space[next]).powi(2);
            if d < *w {
                *w = d;
            }
        }
    }

    centers
}

/// Find the nearest center. Ties go to the lowest center index.
fn find_nearest_center(
    vector: &[f64],
    centers: &[Vec<f64>],
    metric: DistanceMetric,
) -> (usize, f64) {
    let mut min_dist = f64::INFINITY;
    let mut nearest = 0;

    for (i, center) in centers.iter().enumerate() {
        let dist = metric.distance(vector, center);
        if dist < min_dist {
            min_dist = dist;
            nearest = i;
        }
    }

    (nearest, min_dist)
}

/// Assign every period to its nearest center.
fn assign(
    space: &[Vec<f64>],
    centers: &[Vec<f64>],
    metric: DistanceMetric,
) -> (Vec<usize>, Vec<f64>) {
    space
        .par_iter()
        .map(|v| find_nearest_center(v, centers, metric))
        .collect::<Vec<_>>()
        .into_iter()
        .unzip()
}

/// Give every empty cluster the farthest period taken from a cluster with at
/// least two members (highest distance, then lowest index).
///
/// Returns the number of periods moved.
fn reseed_empty_clusters(labels: &mut [usize], dists: &mut [f64], k: usize) -> usize {
    let mut sizes = vec![0usize; k];
    for &l in labels.iter() {
        sizes[l] += 1;
    }

    let mut moved = 0;
    for cluster in 0..k {
        if sizes[cluster] > 0 {
            continue;
        }
        let candidate = (0..labels.len())
            .filter(|&p| sizes[labels[p]] > 1)
            .fold(None, |best: Option<usize>, p| match best {
                Some(b) if dists[b] >= dists[p] => Some(b),
                _ => Some(p),
            });
        let Some(p) = candidate else {
            break;
        };
        sizes[labels[p]] -= 1;
        sizes[cluster] = 1;
        labels[p] = cluster;
        dists[p] = 0.0;
        moved += 1;
    }
    moved
}

/// Recompute centers from the current assignment.
fn update_centers(
    space: &[Vec<f64>],
    labels: &[usize],
    k: usize,
    metric: DistanceMetric,
    method: RepresentativeMethod,
) -> Vec<Vec<f64>> {
    (0..k)
        .into_par_iter()
        .map(|cluster| {
            let members = members_of(labels, cluster);
            match method {
                RepresentativeMethod::Mean => compute_mean_vector(space, &members),
                RepresentativeMethod::Medoid => {
                    space[compute_medoid(space, &members, metric)].clone()
                }
            }
        })
        .collect()
}

fn members_of(labels: &[usize], cluster: usize) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l == cluster)
        .map(|(i, _)| i)
        .collect()
}

/// Element-wise mean of the member vectors.
fn compute_mean_vector(space: &[Vec<f64>], members: &[usize]) -> Vec<f64> {
    let Some(&first) = members.first() else {
        return Vec::new();
    };

    // Scale before summing so values near f64::MAX stay finite.
    let count = members.len() as f64;
    (0..space[first].len())
        .map(|i| members.iter().map(|&m| space[m][i] / count).sum::<f64>())
        .collect()
}

/// Index of the member minimizing total distance to the other members.
/// Ties go to the lowest period index.
fn compute_medoid(space: &[Vec<f64>], members: &[usize], metric: DistanceMetric) -> usize {
    if members.len() == 1 {
        return members[0];
    }

    let mut min_total_dist = f64::INFINITY;
    let mut medoid = members.first().copied().unwrap_or(0);

    for &i in members {
        let total_dist: f64 = members
            .iter()
            .filter(|&&j| j != i)
            .map(|&j| metric.distance(&space[i], &space[j]))
            .sum();

        if total_dist < min_total_dist {
            min_total_dist = total_dist;
            medoid = i;
        }
    }

    medoid
}

/// Total within-cluster distance.
fn compute_inertia(
    space: &[Vec<f64>],
    labels: &[usize],
    centers: &[Vec<f64>],
    metric: DistanceMetric,
) -> f64 {
    space
        .iter()
        .zip(labels.iter())
        .map(|(v, &l)| metric.distance(v, &centers[l]))
        .sum()
}

/// Turn the final assignment into representatives with stable ids.
///
/// Ids follow ascending order of each cluster's lowest member period.
fn build_representatives(
    matrix: &PeriodMatrix,
    space: &[Vec<f64>],
    labels: &[usize],
    centers: &[Vec<f64>],
    k: usize,
    method: RepresentativeMethod,
    metric: DistanceMetric,
) -> Vec<RepresentativePeriod> {
    let mut clusters: Vec<Vec<usize>> = (0..k).map(|c| members_of(labels, c)).collect();
    clusters.sort_by_key(|members| members.first().copied().unwrap_or(usize::MAX));

    clusters
        .into_iter()
        .enumerate()
        .map(|(i, members)| {
            let (vector, medoid_period) = match method {
                RepresentativeMethod::Mean => {
                    (compute_mean_vector(matrix.vectors(), &members), None)
                }
                RepresentativeMethod::Medoid => {
                    let medoid = medoid_matching_center(space, &members, labels, centers, metric);
                    (matrix.vectors()[medoid].clone(), Some(medoid + 1))
                }
            };
            RepresentativePeriod {
                id: i + 1,
                vector,
                medoid_period,
                members: members.into_iter().map(|p| p + 1).collect(),
            }
        })
        .collect()
}

/// The member whose vector is the cluster's current center, so the reported
/// medoid is the one the assignment was measured against.
fn medoid_matching_center(
    space: &[Vec<f64>],
    members: &[usize],
    labels: &[usize],
    centers: &[Vec<f64>],
    metric: DistanceMetric,
) -> usize {
    members
        .first()
        .and_then(|&m| {
            let center = &centers[labels[m]];
            members.iter().copied().find(|&p| &space[p] == center)
        })
        .unwrap_or_else(|| compute_medoid(space, members, metric))
}

/// Inertia for each `k` in `1..=max_k`, for choosing the number of
/// representative periods.
pub fn elbow_inertias(
    matrix: &PeriodMatrix,
    max_k: usize,
    config: &ClusteringConfig,
) -> Result<Vec<f64>> {
    (1..=max_k.min(matrix.num_periods()))
        .map(|k| {
            let config = config.clone().k(k);
            find_representatives(matrix, &config).map(|r| r.inertia)
        })
        .collect()
}
