use std::collections::BTreeMap;

use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand::distributions::Uniform;
use rand_pcg::Pcg64;
use tracing::{debug, info, warn};

use crate::config::FactorizationParams;
use crate::expr::normalize::Normalization;
use crate::expr::scale::{densify_cells, rms_scale_columns};
use crate::graph::knn::knn_within;
use crate::integrate::{
    IntegrateError, IntegrationInput, IntegrationStrategy, StrategyKind, quantile,
    relative_change, require,
};
use crate::linalg::{to_f32, vstack};
use crate::model::embedding::IntegratedRepresentation;

const EPS: f64 = 1e-12;
/// Coordinate sweeps per block solve.
const NNLS_SWEEPS: usize = 10;

/// Integrative NMF: `E_i ≈ H_i (W + V_i)` with shared gene loadings `W`,
/// dataset-specific loadings `V_i` and cell factors `H_i`, followed by
/// quantile alignment of the cell factors.
#[derive(Debug, Clone)]
pub struct JointFactorization {
    pub params: FactorizationParams,
    pub seed: u64,
}

/// Fitted factors. `h[i]` is cells × k, `w` and `v[i]` are k × genes.
#[derive(Debug, Clone)]
pub struct Factors {
    pub h: Vec<Array2<f64>>,
    pub w: Array2<f64>,
    pub v: Vec<Array2<f64>>,
    pub iterations: usize,
    pub objective: f64,
}

impl IntegrationStrategy for JointFactorization {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Factorization
    }

    fn integrate(
        &self,
        input: &IntegrationInput,
        dims: usize,
    ) -> Result<IntegratedRepresentation, IntegrateError> {
        require("datasets", 2, input.datasets.len())?;
        require("integration features", dims, input.features.len())?;

        let fraction = Normalization::library_fraction();
        let scaled: Vec<Array2<f64>> = input
            .datasets
            .iter()
            .map(|d| {
                let mut e = densify_cells(&d.dataset.counts, &d.stats, &fraction, &input.features);
                rms_scale_columns(&mut e);
                e
            })
            .collect();

        let factors = self.factorize(&scaled, dims)?;
        drop(scaled);
        info!(
            iterations = factors.iterations,
            objective = factors.objective,
            "factorization converged"
        );

        let (aligned, skipped) = self.quantile_align(&factors.h);
        let coords = vstack(&aligned)?;

        let mut diagnostics = BTreeMap::new();
        diagnostics.insert("iterations".to_string(), factors.iterations as f64);
        diagnostics.insert("objective".to_string(), factors.objective);
        diagnostics.insert("skipped_groups".to_string(), skipped as f64);
        Ok(input.represent(StrategyKind::Factorization, &coords, diagnostics))
    }
}

impl JointFactorization {
    /// Alternating non-negative least squares over the blocks `H_i`, `V_i`
    /// and `W` until the relative objective change drops below the
    /// tolerance.
    pub fn factorize(&self, e: &[Array2<f64>], k: usize) -> Result<Factors, IntegrateError> {
        let p = &self.params;
        let genes = e.first().map_or(0, |m| m.ncols());
        let mut rng = Pcg64::seed_from_u64(self.seed);
        let init = Uniform::new(0.0, 2.0);
        let mut w = Array2::random_using((k, genes), init, &mut rng);
        let mut v: Vec<Array2<f64>> = e
            .iter()
            .map(|_| Array2::random_using((k, genes), init, &mut rng))
            .collect();
        let mut h: Vec<Array2<f64>> = e
            .iter()
            .map(|m| Array2::random_using((m.nrows(), k), init, &mut rng))
            .collect();
        let norms: Vec<f64> = e.iter().map(|m| m.iter().map(|x| x * x).sum()).collect();

        let mut previous = objective(e, &norms, &h, &w, &v, p.lambda);
        let mut delta = f64::INFINITY;
        for iteration in 1..=p.max_iter {
            for i in 0..e.len() {
                let loadings = &w + &v[i];
                let gram = loadings.dot(&loadings.t()) + p.lambda * v[i].dot(&v[i].t());
                let rhs = loadings.dot(&e[i].t());
                let mut ht = h[i].t().to_owned();
                nnls_rows(&mut ht, &gram, &rhs);
                h[i] = ht.reversed_axes();
            }

            let hth: Vec<Array2<f64>> = h.iter().map(|h| h.t().dot(h)).collect();
            let hte: Vec<Array2<f64>> = h.iter().zip(e).map(|(h, e)| h.t().dot(e)).collect();
            for i in 0..e.len() {
                let gram = &hth[i] * (1.0 + p.lambda);
                let rhs = &hte[i] - &hth[i].dot(&w);
                nnls_rows(&mut v[i], &gram, &rhs);
            }

            let mut gram = Array2::<f64>::zeros((k, k));
            let mut rhs = Array2::<f64>::zeros((k, genes));
            for i in 0..e.len() {
                gram += &hth[i];
                rhs += &hte[i];
                rhs -= &hth[i].dot(&v[i]);
            }
            nnls_rows(&mut w, &gram, &rhs);

            let current = objective(e, &norms, &h, &w, &v, p.lambda);
            delta = relative_change(previous, current);
            debug!(iteration, objective = current, delta, "factorization iteration");
            if delta < p.tolerance {
                return Ok(Factors {
                    h,
                    w,
                    v,
                    iterations: iteration,
                    objective: current,
                });
            }
            previous = current;
        }

        Err(IntegrateError::Convergence {
            strategy: StrategyKind::Factorization,
            iterations: p.max_iter,
            delta,
        })
    }

    /// Scales every factor by its root mean square, assigns cells to their
    /// dominant factor and maps each factor's distribution within a factor
    /// cluster onto the largest dataset's. Returns the aligned factors and
    /// the number of skipped (dataset, cluster) groups.
    pub fn quantile_align(&self, h: &[Array2<f64>]) -> (Vec<Array2<f64>>, usize) {
        let p = &self.params;
        let mut hs: Vec<Array2<f64>> = h.to_vec();
        hs.iter_mut().for_each(rms_scale_columns);
        let k = hs.first().map_or(0, |m| m.ncols());

        let clusters: Vec<Vec<usize>> = hs.iter().map(|m| self.assign(m)).collect();
        let reference = (0..hs.len())
            .max_by(|&a, &b| hs[a].nrows().cmp(&hs[b].nrows()).then(b.cmp(&a)))
            .unwrap_or(0);
        let levels: Vec<f64> = (0..p.quantiles)
            .map(|q| q as f64 / (p.quantiles - 1) as f64)
            .collect();

        let mut skipped = 0usize;
        for i in 0..hs.len() {
            if i == reference {
                continue;
            }
            for c in 0..k {
                let cells: Vec<usize> = members(&clusters[i], c);
                let ref_cells: Vec<usize> = members(&clusters[reference], c);
                if cells.is_empty() && ref_cells.is_empty() {
                    continue;
                }
                if cells.len() < p.min_cells || ref_cells.len() < p.min_cells {
                    skipped += 1;
                    continue;
                }
                for j in 0..k {
                    let source = quantiles_of(&hs[i], &cells, j, &levels);
                    let target = quantiles_of(&hs[reference], &ref_cells, j, &levels);
                    let map = Interpolation::new(&source, &target);
                    for &cell in &cells {
                        let x = &mut hs[i][[cell, j]];
                        *x = map.at(*x);
                    }
                }
            }
        }
        if skipped > 0 {
            warn!(
                skipped,
                min_cells = p.min_cells,
                "factor clusters too small for quantile alignment"
            );
        }
        (hs, skipped)
    }

    fn assign(&self, hs: &Array2<f64>) -> Vec<usize> {
        let dominant: Vec<usize> = hs
            .rows()
            .into_iter()
            .map(|row| {
                (0..row.len())
                    .max_by(|&a, &b| row[a].total_cmp(&row[b]).then(b.cmp(&a)))
                    .unwrap_or(0)
            })
            .collect();
        if self.params.knn_k == 0 || hs.nrows() < 2 {
            return dominant;
        }

        let nn = knn_within(&to_f32(hs), hs.ncols(), self.params.knn_k);
        (0..hs.nrows())
            .map(|i| {
                let mut votes: BTreeMap<usize, usize> = BTreeMap::new();
                *votes.entry(dominant[i]).or_insert(0) += 1;
                for &j in nn.of(i) {
                    *votes.entry(dominant[j as usize]).or_insert(0) += 1;
                }
                votes
                    .into_iter()
                    .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                    .map_or(dominant[i], |(c, _)| c)
            })
            .collect()
    }
}

fn members(assignment: &[usize], cluster: usize) -> Vec<usize> {
    assignment
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == cluster)
        .map(|(i, _)| i)
        .collect()
}

fn quantiles_of(m: &Array2<f64>, cells: &[usize], factor: usize, levels: &[f64]) -> Vec<f64> {
    let mut values: Vec<f64> = cells.iter().map(|&c| m[[c, factor]]).collect();
    values.sort_by(f64::total_cmp);
    levels.iter().map(|&q| quantile(&values, q)).collect()
}

/// Piecewise-linear map through `(x, y)` knots, constant beyond the ends.
/// Knots sharing an `x` are merged to the mean of their `y`.
struct Interpolation {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Interpolation {
    fn new(x: &[f64], y: &[f64]) -> Self {
        let mut xs: Vec<f64> = Vec::with_capacity(x.len());
        let mut ys: Vec<f64> = Vec::with_capacity(x.len());
        let mut run = 0usize;
        for (&xi, &yi) in x.iter().zip(y) {
            if xs.last() == Some(&xi) {
                let last = ys.len() - 1;
                run += 1;
                ys[last] += (yi - ys[last]) / run as f64;
            } else {
                xs.push(xi);
                ys.push(yi);
                run = 1;
            }
        }
        Self { xs, ys }
    }

    fn at(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 0 {
            return x;
        }
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        let hi = self.xs.partition_point(|&v| v <= x);
        let lo = hi - 1;
        let t = (x - self.xs[lo]) / (self.xs[hi] - self.xs[lo]);
        self.ys[lo] + t * (self.ys[hi] - self.ys[lo])
    }
}

/// Projected coordinate descent on `gram · x = rhs` subject to `x ≥ 0`,
/// one row of `x` at a time. `gram` is k × k, `x` and `rhs` are k × n.
fn nnls_rows(x: &mut Array2<f64>, gram: &Array2<f64>, rhs: &Array2<f64>) {
    for _ in 0..NNLS_SWEEPS {
        for j in 0..x.nrows() {
            let diag = gram[[j, j]];
            if diag <= EPS {
                continue;
            }
            let step = (&rhs.row(j) - &gram.row(j).dot(&x.view())) / diag;
            x.row_mut(j)
                .zip_mut_with(&step, |value, s| *value = (*value + s).max(0.0));
        }
    }
}

fn objective(
    e: &[Array2<f64>],
    norms: &[f64],
    h: &[Array2<f64>],
    w: &Array2<f64>,
    v: &[Array2<f64>],
    lambda: f64,
) -> f64 {
    let mut total = 0.0;
    for i in 0..e.len() {
        let loadings = w + &v[i];
        let hte = h[i].t().dot(&e[i]);
        let hth = h[i].t().dot(&h[i]);
        let cross = (&hte * &loadings).sum();
        let fit = (&hth.dot(&loadings) * &loadings).sum();
        let penalty = (&hth.dot(&v[i]) * &v[i]).sum();
        total += norms[i] - 2.0 * cross + fit + lambda * penalty;
    }
    total
}

#[cfg(test)]
#[path = "../../tests/src_inline/integrate/factorization.rs"]
mod tests;
