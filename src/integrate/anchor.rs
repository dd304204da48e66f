use std::collections::{BTreeMap, HashSet};

use ndarray::{Array1, Array2};
use tracing::{debug, info};

use crate::config::AnchorParams;
use crate::expr::scale::{DEFAULT_SCALE_CLIP, scale_columns};
use crate::graph::knn::{Neighbors, knn_between, knn_within};
use crate::integrate::{
    IntegrateError, IntegrationInput, IntegrationStrategy, StrategyKind, quantile, require,
};
use crate::linalg::svd::{SvdOptions, pca, randomized_svd};
use crate::linalg::{CrossProduct, l2_normalize_rows, to_f32, vstack};
use crate::model::embedding::IntegratedRepresentation;

/// Sequential anchor integration: the first dataset is the initial
/// reference and every further dataset is corrected onto the growing
/// reference.
#[derive(Debug, Clone)]
pub struct AnchorIntegration {
    pub params: AnchorParams,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub reference: usize,
    pub query: usize,
    pub score: f64,
}

/// Anchors between one reference and one query, with the query cells'
/// positions in the shared canonical space.
#[derive(Debug, Clone)]
pub struct AnchorSet {
    pub anchors: Vec<Anchor>,
    pub mutual: usize,
    pub query_space: Array2<f64>,
}

impl IntegrationStrategy for AnchorIntegration {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Anchor
    }

    fn integrate(
        &self,
        input: &IntegrationInput,
        dims: usize,
    ) -> Result<IntegratedRepresentation, IntegrateError> {
        require("datasets", 2, input.datasets.len())?;
        require("integration features", dims, input.features.len())?;
        require("cells", dims, input.n_cells())?;

        let mut reference = input.normalized(0);
        let mut reference_label = input.datasets[0].dataset.label().to_string();
        let mut total_anchors = 0usize;
        for q in 1..input.datasets.len() {
            let query = input.normalized(q);
            let query_label = input.datasets[q].dataset.label();
            let set = self.find_anchors(&reference, &query, dims)?;
            if set.anchors.is_empty() {
                return Err(IntegrateError::NoAnchors {
                    reference: reference_label,
                    query: query_label.to_string(),
                });
            }
            info!(
                reference = %reference_label,
                query = query_label,
                mutual = set.mutual,
                anchors = set.anchors.len(),
                "anchors found"
            );
            total_anchors += set.anchors.len();
            let corrected = self.correct(&reference, &query, &set);
            reference = vstack(&[reference, corrected])?;
            reference_label = format!("{reference_label}+{query_label}");
        }

        scale_columns(&mut reference, Some(DEFAULT_SCALE_CLIP));
        let reduced = pca(&reference, dims, self.seed)?;

        let mut diagnostics = BTreeMap::new();
        diagnostics.insert("anchors".to_string(), total_anchors as f64);
        Ok(input.represent(StrategyKind::Anchor, &reduced.scores, diagnostics))
    }
}

impl AnchorIntegration {
    /// Mutual nearest neighbours in a canonical correlation space, filtered
    /// in the reference's PCA space and scored by neighbourhood overlap.
    pub fn find_anchors(
        &self,
        reference: &Array2<f64>,
        query: &Array2<f64>,
        dims: usize,
    ) -> Result<AnchorSet, IntegrateError> {
        let p = &self.params;
        let mut rs = reference.clone();
        scale_columns(&mut rs, Some(DEFAULT_SCALE_CLIP));
        let mut qs = query.clone();
        scale_columns(&mut qs, Some(DEFAULT_SCALE_CLIP));

        let d = dims.min(rs.nrows()).min(qs.nrows());
        let svd = randomized_svd(
            &CrossProduct {
                left: rs.view(),
                right: qs.view(),
            },
            d,
            SvdOptions {
                seed: self.seed,
                ..SvdOptions::default()
            },
        )?;
        let mut cc_ref = svd.u;
        l2_normalize_rows(&mut cc_ref);
        let mut cc_query = svd.v;
        l2_normalize_rows(&mut cc_query);
        if svd.s.get(0).is_none_or(|&top| top <= f64::EPSILON) {
            // no shared variation, the canonical vectors are arbitrary
            debug!("canonical correlations vanish");
            return Ok(AnchorSet {
                anchors: Vec::new(),
                mutual: 0,
                query_space: cc_query,
            });
        }
        let ref32 = to_f32(&cc_ref);
        let query32 = to_f32(&cc_query);

        let ref_to_query = knn_between(&ref32, &query32, d, p.k_anchor);
        let query_to_ref = knn_between(&query32, &ref32, d, p.k_anchor);
        let mut pairs = Vec::new();
        for r in 0..cc_ref.nrows() {
            for &q in ref_to_query.of(r) {
                if query_to_ref.of(q as usize).contains(&(r as u32)) {
                    pairs.push((r, q as usize));
                }
            }
        }
        let mutual = pairs.len();

        let pairs = self.filter_pairs(&rs, &qs, dims, pairs)?;
        debug!(mutual, filtered = pairs.len(), "anchor filtering");

        let anchors = self.score_pairs(&ref32, &query32, d, &pairs);
        Ok(AnchorSet {
            anchors,
            mutual,
            query_space: cc_query,
        })
    }

    fn filter_pairs(
        &self,
        rs: &Array2<f64>,
        qs: &Array2<f64>,
        dims: usize,
        pairs: Vec<(usize, usize)>,
    ) -> Result<Vec<(usize, usize)>, IntegrateError> {
        if pairs.is_empty() {
            return Ok(pairs);
        }
        let d = dims.min(rs.nrows()).min(rs.ncols());
        let reduced = pca(rs, d, self.seed)?;
        let ref_space = to_f32(&reduced.scores);
        let query_space = to_f32(&qs.dot(&reduced.loadings));
        let nn = knn_between(&ref_space, &query_space, d, self.params.k_filter);
        Ok(pairs
            .into_iter()
            .filter(|&(r, q)| nn.of(r).contains(&(q as u32)))
            .collect())
    }

    fn score_pairs(
        &self,
        ref32: &[f32],
        query32: &[f32],
        d: usize,
        pairs: &[(usize, usize)],
    ) -> Vec<Anchor> {
        if pairs.is_empty() {
            return Vec::new();
        }
        let k = self.params.k_score;
        let n_ref = ref32.len() / d;
        let rr = knn_within(ref32, d, k);
        let rq = knn_between(ref32, query32, d, k);
        let qq = knn_within(query32, d, k);
        let qr = knn_between(query32, ref32, d, k);

        let hood = |own: usize, offset_own: usize, within: &Neighbors, across: &Neighbors, offset_across: usize| {
            let mut set: HashSet<usize> = HashSet::new();
            set.insert(own + offset_own);
            set.extend(within.of(own).iter().map(|&j| j as usize + offset_own));
            set.extend(across.of(own).iter().map(|&j| j as usize + offset_across));
            set
        };

        let raw: Vec<f64> = pairs
            .iter()
            .map(|&(r, q)| {
                let a = hood(r, 0, &rr, &rq, n_ref);
                let b = hood(q, n_ref, &qq, &qr, 0);
                a.intersection(&b).count() as f64
            })
            .collect();

        let mut sorted = raw.clone();
        sorted.sort_by(f64::total_cmp);
        let lo = quantile(&sorted, 0.01);
        let hi = quantile(&sorted, 0.90);
        pairs
            .iter()
            .zip(raw)
            .map(|(&(reference, query), s)| Anchor {
                reference,
                query,
                score: if hi > lo {
                    ((s - lo) / (hi - lo)).clamp(0.0, 1.0)
                } else {
                    1.0
                },
            })
            .collect()
    }

    /// Adds to every query cell the weighted reference − query difference
    /// of its nearest anchors.
    pub fn correct(
        &self,
        reference: &Array2<f64>,
        query: &Array2<f64>,
        set: &AnchorSet,
    ) -> Array2<f64> {
        let d = set.query_space.ncols();
        let anchor_points: Vec<f32> = set
            .anchors
            .iter()
            .flat_map(|a| set.query_space.row(a.query).into_iter().map(|&v| v as f32))
            .collect();
        let corrections: Vec<Array1<f64>> = set
            .anchors
            .iter()
            .map(|a| &reference.row(a.reference) - &query.row(a.query))
            .collect();

        let nn = knn_between(&to_f32(&set.query_space), &anchor_points, d, self.params.k_weight);
        let bandwidth = (2.0 / self.params.sd_weight).powi(2);
        let mut out = query.clone();
        for (cell, mut row) in out.rows_mut().into_iter().enumerate() {
            let idx = nn.of(cell);
            let dist = nn.distances_of(cell);
            let d_max = dist.last().copied().unwrap_or(0.0) as f64;
            let mut weights: Vec<f64> = idx
                .iter()
                .zip(dist)
                .map(|(&a, &dd)| {
                    let closeness = if d_max > 0.0 { 1.0 - dd as f64 / d_max } else { 1.0 };
                    1.0 - (-closeness * set.anchors[a as usize].score / bandwidth).exp()
                })
                .collect();
            let total: f64 = weights.iter().sum();
            if total > 0.0 {
                weights.iter_mut().for_each(|w| *w /= total);
            } else if let Some(first) = weights.first_mut() {
                *first = 1.0;
            }
            for (&a, &w) in idx.iter().zip(&weights) {
                if w != 0.0 {
                    row.scaled_add(w, &corrections[a as usize]);
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/integrate/anchor.rs"]
mod tests;
