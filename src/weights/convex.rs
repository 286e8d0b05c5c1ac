//! Projected gradient descent onto the probability simplex.

use super::WEIGHT_EPSILON;

/// Fits `w` minimizing `||x - Σ_r w_r c_r||²` subject to `w ≥ 0`, `Σ w = 1`.
pub(super) struct SimplexFit<'a> {
    reps: &'a [&'a [f64]],
    max_iterations: usize,
    step: f64,
    tolerance: f64,
}

impl<'a> SimplexFit<'a> {
    pub(super) fn new(
        reps: &'a [&'a [f64]],
        max_iterations: usize,
        learning_rate: f64,
        tolerance: f64,
    ) -> Self {
        // 2 Σ ||c_r||² bounds the Lipschitz constant of the gradient.
        let lipschitz: f64 = 2.0
            * reps
                .iter()
                .map(|c| c.iter().map(|v| v * v).sum::<f64>())
                .sum::<f64>();
        let step = if lipschitz > 0.0 {
            learning_rate / lipschitz
        } else {
            0.0
        };
        Self {
            reps,
            max_iterations,
            step,
            tolerance,
        }
    }

    /// Fit one period, warm-started with all weight on `start`.
    pub(super) fn fit(&self, x: &[f64], start: usize) -> Vec<f64> {
        let k = self.reps.len();
        let mut w = vec![0.0; k];
        w[start] = 1.0;
        if k == 1 || self.step == 0.0 {
            return w;
        }

        let mut residual = vec![0.0; x.len()];
        for _ in 0..self.max_iterations {
            // residual = Σ w_r c_r - x
            for (i, r) in residual.iter_mut().enumerate() {
                *r = -x[i];
            }
            for (wr, c) in w.iter().zip(self.reps) {
                if *wr != 0.0 {
                    for (r, v) in residual.iter_mut().zip(c.iter()) {
                        *r += wr * v;
                    }
                }
            }

            let stepped: Vec<f64> = w
                .iter()
                .zip(self.reps)
                .map(|(wr, c)| {
                    let grad = 2.0 * c.iter().zip(&residual).map(|(a, b)| a * b).sum::<f64>();
                    wr - self.step * grad
                })
                .collect();
            let next = project_onto_simplex(&stepped);

            let change = next
                .iter()
                .zip(&w)
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();
            w = next;
            if change <= self.tolerance {
                break;
            }
        }

        clean(w, start)
    }
}

/// Zero negligible weights and renormalize so the row sums to exactly one
/// within floating point error.
fn clean(mut w: Vec<f64>, fallback: usize) -> Vec<f64> {
    for v in w.iter_mut() {
        if *v < WEIGHT_EPSILON {
            *v = 0.0;
        }
    }
    let sum: f64 = w.iter().sum();
    if sum > 0.0 {
        for v in w.iter_mut() {
            *v /= sum;
        }
    } else {
        w.iter_mut().for_each(|v| *v = 0.0);
        w[fallback] = 1.0;
    }
    w
}

/// Euclidean projection onto `{w : w ≥ 0, Σ w = 1}`.
pub(super) fn project_onto_simplex(v: &[f64]) -> Vec<f64> {
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut cumsum = 0.0;
    let mut theta = 0.0;
    for (j, &u) in sorted.iter().enumerate() {
        cumsum += u;
        let candidate = (cumsum - 1.0) / (j + 1) as f64;
        if u - candidate > 0.0 {
            theta = candidate;
        }
    }

    v.iter().map(|&x| (x - theta).max(0.0)).collect()
}
