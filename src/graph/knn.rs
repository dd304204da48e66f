use std::cmp::Ordering;

use crate::simd;

/// Exact nearest neighbours, `k` per point, stored row-major and sorted by
/// increasing distance (ties by index).
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbors {
    pub k: usize,
    pub indices: Vec<u32>,
    pub distances: Vec<f32>,
}

impl Neighbors {
    pub fn n_points(&self) -> usize {
        if self.k == 0 {
            0
        } else {
            self.indices.len() / self.k
        }
    }

    pub fn of(&self, point: usize) -> &[u32] {
        &self.indices[point * self.k..(point + 1) * self.k]
    }

    pub fn distances_of(&self, point: usize) -> &[f32] {
        &self.distances[point * self.k..(point + 1) * self.k]
    }
}

/// Neighbours of every point among the other points of the same set.
/// `k` is capped at `n - 1`.
pub fn knn_within(points: &[f32], dim: usize, k: usize) -> Neighbors {
    let n = if dim == 0 { 0 } else { points.len() / dim };
    let k = k.min(n.saturating_sub(1));
    search(points, points, dim, k, true)
}

/// Neighbours of every query point among `base`. `k` is capped at the
/// number of base points.
pub fn knn_between(queries: &[f32], base: &[f32], dim: usize, k: usize) -> Neighbors {
    let n_base = if dim == 0 { 0 } else { base.len() / dim };
    search(queries, base, dim, k.min(n_base), false)
}

fn search(queries: &[f32], base: &[f32], dim: usize, k: usize, skip_self: bool) -> Neighbors {
    if dim == 0 || k == 0 {
        return Neighbors {
            k,
            indices: Vec::new(),
            distances: Vec::new(),
        };
    }
    let n_query = queries.len() / dim;
    let n_base = base.len() / dim;
    let mut indices = Vec::with_capacity(n_query * k);
    let mut distances = Vec::with_capacity(n_query * k);
    let mut scratch: Vec<(f32, u32)> = Vec::with_capacity(n_base);

    for q in 0..n_query {
        let query = &queries[q * dim..(q + 1) * dim];
        scratch.clear();
        for b in 0..n_base {
            if skip_self && b == q {
                continue;
            }
            let d = simd::sq_dist_f32(query, &base[b * dim..(b + 1) * dim]);
            scratch.push((d, b as u32));
        }
        let cmp = |a: &(f32, u32), b: &(f32, u32)| -> Ordering {
            a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
        };
        if scratch.len() > k {
            scratch.select_nth_unstable_by(k - 1, cmp);
            scratch.truncate(k);
        }
        scratch.sort_unstable_by(cmp);
        for &(d, b) in scratch.iter() {
            indices.push(b);
            distances.push(d.max(0.0).sqrt());
        }
    }

    Neighbors {
        k,
        indices,
        distances,
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/graph/knn.rs"]
mod tests;
