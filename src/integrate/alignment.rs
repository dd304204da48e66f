use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis};
use ndarray_linalg::Inverse;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64;
use tracing::debug;

use crate::config::AlignmentParams;
use crate::expr::scale::{DEFAULT_SCALE_CLIP, scale_columns};
use crate::integrate::{
    IntegrateError, IntegrationInput, IntegrationStrategy, StrategyKind, relative_change, require,
};
use crate::linalg::svd::pca;
use crate::linalg::{LinalgError, l2_normalize_rows, vstack};
use crate::model::embedding::IntegratedRepresentation;

/// Harmony-style alignment of a joint PCA embedding: soft k-means with an
/// origin-diversity penalty, followed by a mixture-of-experts ridge
/// correction, repeated until the objective settles.
#[derive(Debug, Clone)]
pub struct EmbeddingAlignment {
    pub params: AlignmentParams,
    pub seed: u64,
}

impl IntegrationStrategy for EmbeddingAlignment {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Alignment
    }

    fn integrate(
        &self,
        input: &IntegrationInput,
        dims: usize,
    ) -> Result<IntegratedRepresentation, IntegrateError> {
        require("datasets", 2, input.datasets.len())?;
        require("integration features", dims, input.features.len())?;
        require("cells", dims, input.n_cells())?;

        let parts: Vec<Array2<f64>> = (0..input.datasets.len())
            .map(|i| input.normalized(i))
            .collect();
        let mut merged = vstack(&parts)?;
        drop(parts);
        scale_columns(&mut merged, Some(DEFAULT_SCALE_CLIP));
        let embedding = pca(&merged, dims, self.seed)?.scores;
        drop(merged);

        let origin = input.origin();
        let (corrected, rounds, objective) =
            self.align(&embedding, &origin, input.datasets.len())?;

        let mut diagnostics = BTreeMap::new();
        diagnostics.insert("rounds".to_string(), rounds as f64);
        diagnostics.insert("objective".to_string(), objective);
        Ok(input.represent(StrategyKind::Alignment, &corrected, diagnostics))
    }
}

struct SoftClusters {
    /// n_cells × k responsibilities, rows sum to one.
    r: Array2<f64>,
    /// k × dims unit-length centroids.
    y: Array2<f64>,
    /// Observed responsibility mass per cluster and origin, k × b.
    observed: Array2<f64>,
    /// Expected mass under the global origin proportions, k × b.
    expected: Array2<f64>,
}

impl EmbeddingAlignment {
    pub fn n_clusters(&self, n_cells: usize) -> usize {
        self.params
            .n_clusters
            .unwrap_or((n_cells / 30).min(100))
            .max(2)
            .min(n_cells)
    }

    /// Returns the corrected embedding, the number of rounds and the final
    /// objective. Fails if the objective has not settled after `max_iter`
    /// rounds.
    pub fn align(
        &self,
        z: &Array2<f64>,
        origin: &[usize],
        n_origins: usize,
    ) -> Result<(Array2<f64>, usize, f64), IntegrateError> {
        let p = &self.params;
        let n = z.nrows();
        let k = self.n_clusters(n);
        let mut phi_counts = vec![0f64; n_origins];
        for &b in origin {
            phi_counts[b] += 1.0;
        }
        let proportions: Vec<f64> = phi_counts.iter().map(|c| c / n as f64).collect();

        let mut z_cos = z.clone();
        l2_normalize_rows(&mut z_cos);

        let mut rng = Pcg64::seed_from_u64(self.seed);
        let mut state = self.init_clusters(&z_cos, origin, &proportions, k, &mut rng);
        let mut previous = self.objective(&z_cos, origin, &state);

        let mut delta = f64::INFINITY;
        for round in 1..=p.max_iter {
            self.cluster(&z_cos, origin, &proportions, &mut state);
            let z_corr = self.correct(z, origin, n_origins, &state.r)?;
            z_cos = z_corr.clone();
            l2_normalize_rows(&mut z_cos);

            let current = self.objective(&z_cos, origin, &state);
            delta = relative_change(previous, current);
            debug!(round, objective = current, delta, "alignment round");
            if delta < p.epsilon {
                return Ok((z_corr, round, current));
            }
            previous = current;
        }

        Err(IntegrateError::Convergence {
            strategy: StrategyKind::Alignment,
            iterations: p.max_iter,
            delta,
        })
    }

    fn init_clusters(
        &self,
        z_cos: &Array2<f64>,
        origin: &[usize],
        proportions: &[f64],
        k: usize,
        rng: &mut Pcg64,
    ) -> SoftClusters {
        let n = z_cos.nrows();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        let mut y = z_cos.select(Axis(0), &order[..k]);

        // a few rounds of spherical k-means
        for _ in 0..10 {
            let mut sums = Array2::<f64>::zeros((k, z_cos.ncols()));
            for cell in z_cos.rows() {
                let similarity = y.dot(&cell);
                let best = (0..k)
                    .max_by(|&a, &b| similarity[a].total_cmp(&similarity[b]).then(b.cmp(&a)))
                    .unwrap_or(0);
                let mut sum = sums.row_mut(best);
                sum += &cell;
            }
            for (mut centroid, sum) in y.rows_mut().into_iter().zip(sums.rows()) {
                if sum.iter().any(|v| *v != 0.0) {
                    centroid.assign(&sum);
                }
            }
            l2_normalize_rows(&mut y);
        }

        let mut r = Array2::<f64>::zeros((n, k));
        for (cell, out) in z_cos.rows().into_iter().zip(r.rows_mut()) {
            let logits: Vec<f64> = y
                .rows()
                .into_iter()
                .map(|centroid| -distance(cell, centroid) / self.params.sigma)
                .collect();
            softmax_into(&logits, out);
        }
        let (observed, expected) = mass(&r, origin, proportions);
        SoftClusters {
            r,
            y,
            observed,
            expected,
        }
    }

    fn cluster(
        &self,
        z_cos: &Array2<f64>,
        origin: &[usize],
        proportions: &[f64],
        state: &mut SoftClusters,
    ) {
        let p = &self.params;
        let k = state.y.nrows();
        let mut previous = self.objective(z_cos, origin, state);
        for _ in 0..p.max_iter_cluster {
            // centroids
            let mut y = state.r.t().dot(z_cos);
            l2_normalize_rows(&mut y);
            state.y = y;

            // responsibilities with the diversity penalty
            for (i, (cell, out)) in z_cos.rows().into_iter().zip(state.r.rows_mut()).enumerate() {
                let b = origin[i];
                let logits: Vec<f64> = (0..k)
                    .map(|c| {
                        let penalty = ((state.expected[[c, b]] + 1.0)
                            / (state.observed[[c, b]] + 1.0))
                            .ln();
                        -distance(cell, state.y.row(c)) / p.sigma + p.theta * penalty
                    })
                    .collect();
                softmax_into(&logits, out);
            }
            let (observed, expected) = mass(&state.r, origin, proportions);
            state.observed = observed;
            state.expected = expected;

            let current = self.objective(z_cos, origin, state);
            if relative_change(previous, current) < p.epsilon_cluster {
                break;
            }
            previous = current;
        }
    }

    /// Mixture-of-experts ridge regression. For every cluster, fits the
    /// embedding on an intercept plus origin indicators weighted by the
    /// cluster responsibilities, then subtracts the origin terms.
    fn correct(
        &self,
        z: &Array2<f64>,
        origin: &[usize],
        n_origins: usize,
        r: &Array2<f64>,
    ) -> Result<Array2<f64>, IntegrateError> {
        let m = n_origins + 1;
        let mut out = z.clone();
        for weights in r.columns() {
            let mut a = Array2::<f64>::zeros((m, m));
            let mut rhs = Array2::<f64>::zeros((m, z.ncols()));
            for ((&w, cell), &o) in weights.iter().zip(z.rows()).zip(origin) {
                if w == 0.0 {
                    continue;
                }
                let b = o + 1;
                a[[0, 0]] += w;
                a[[0, b]] += w;
                a[[b, 0]] += w;
                a[[b, b]] += w;
                rhs.row_mut(0).scaled_add(w, &cell);
                rhs.row_mut(b).scaled_add(w, &cell);
            }
            for j in 1..m {
                a[[j, j]] += self.params.lambda;
            }
            if a[[0, 0]] < 1e-12 {
                continue;
            }
            let beta = a.inv().map_err(LinalgError::from)?.dot(&rhs);
            for ((&w, mut row), &o) in weights.iter().zip(out.rows_mut()).zip(origin) {
                if w != 0.0 {
                    row.scaled_add(-w, &beta.row(o + 1));
                }
            }
        }
        Ok(out)
    }

    /// k-means error + entropy regularization + diversity penalty.
    fn objective(&self, z_cos: &Array2<f64>, origin: &[usize], state: &SoftClusters) -> f64 {
        let p = &self.params;
        let mut kmeans = 0.0;
        let mut entropy = 0.0;
        let mut diversity = 0.0;
        for (i, cell) in z_cos.rows().into_iter().enumerate() {
            let b = origin[i];
            for (c, centroid) in state.y.rows().into_iter().enumerate() {
                let r = state.r[[i, c]];
                if r <= 0.0 {
                    continue;
                }
                kmeans += r * distance(cell, centroid);
                entropy += r * r.ln();
                diversity +=
                    r * ((state.observed[[c, b]] + 1.0) / (state.expected[[c, b]] + 1.0)).ln();
            }
        }
        kmeans + p.sigma * entropy + p.sigma * p.theta * diversity
    }
}

/// Cosine distance scaled to `[0, 4]` for unit vectors.
fn distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    2.0 * (1.0 - a.dot(&b))
}

fn softmax_into(logits: &[f64], mut out: ArrayViewMut1<'_, f64>) {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for (o, l) in out.iter_mut().zip(logits) {
        *o = (l - max).exp();
        sum += *o;
    }
    if sum > 0.0 {
        out /= sum;
    }
}

fn mass(r: &Array2<f64>, origin: &[usize], proportions: &[f64]) -> (Array2<f64>, Array2<f64>) {
    let k = r.ncols();
    let b = proportions.len();
    let mut observed = Array2::<f64>::zeros((k, b));
    for (row, &o) in r.rows().into_iter().zip(origin) {
        let mut column = observed.column_mut(o);
        column += &row;
    }
    let totals = observed.sum_axis(Axis(1));
    let expected = Array2::from_shape_fn((k, b), |(c, j)| totals[c] * proportions[j]);
    (observed, expected)
}

#[cfg(test)]
#[path = "../../tests/src_inline/integrate/alignment.rs"]
mod tests;
