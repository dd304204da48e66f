use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg64;
use serde::Serialize;

use crate::graph::knn::Neighbors;

/// Undirected weighted graph as symmetric adjacency lists. A self loop is
/// stored once and counts once towards the node strength.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub adj: Vec<Vec<(u32, f64)>>,
}

impl Graph {
    pub fn n_nodes(&self) -> usize {
        self.adj.len()
    }

    pub fn n_edges(&self) -> usize {
        self.adj
            .iter()
            .enumerate()
            .map(|(i, row)| row.iter().filter(|(j, _)| *j as usize >= i).count())
            .sum()
    }

    pub fn strength(&self, node: usize) -> f64 {
        self.adj[node].iter().map(|(_, w)| w).sum()
    }

    /// Builds a graph from a list of undirected edges, summing repeats.
    pub fn from_edges(n: usize, edges: &[(usize, usize, f64)]) -> Self {
        let mut rows: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); n];
        for &(i, j, w) in edges {
            *rows[i].entry(j as u32).or_insert(0.0) += w;
            if i != j {
                *rows[j].entry(i as u32).or_insert(0.0) += w;
            }
        }
        Self::from_maps(rows)
    }

    fn from_maps(rows: Vec<BTreeMap<u32, f64>>) -> Self {
        Graph {
            adj: rows.into_iter().map(|r| r.into_iter().collect()).collect(),
        }
    }
}

/// Shared-nearest-neighbour graph. Each neighbourhood is the cell plus its
/// `k` nearest neighbours; edges carry the Jaccard index of the two
/// neighbourhoods and are dropped below `prune`.
pub fn snn_graph(nn: &Neighbors, prune: f64) -> Graph {
    let n = nn.n_points();
    let size = (nn.k + 1) as f64;
    let hood = |i: usize| std::iter::once(i as u32).chain(nn.of(i).iter().copied());

    let mut members: Vec<Vec<u32>> = vec![Vec::new(); n];
    for i in 0..n {
        for m in hood(i) {
            members[m as usize].push(i as u32);
        }
    }

    let mut shared = vec![0u32; n];
    let mut touched: Vec<u32> = Vec::new();
    let mut rows: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); n];
    for i in 0..n {
        for m in hood(i) {
            for &j in &members[m as usize] {
                if shared[j as usize] == 0 {
                    touched.push(j);
                }
                shared[j as usize] += 1;
            }
        }
        for &j in &touched {
            let s = shared[j as usize] as f64;
            shared[j as usize] = 0;
            if j as usize == i {
                continue;
            }
            let jaccard = s / (2.0 * size - s);
            if jaccard >= prune {
                rows[i].insert(j, jaccard);
            }
        }
        touched.clear();
    }
    Graph::from_maps(rows)
}

/// Unweighted kNN adjacency, symmetrized by union.
pub fn knn_graph(nn: &Neighbors) -> Graph {
    let n = nn.n_points();
    let mut rows: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); n];
    for i in 0..n {
        for &j in nn.of(i) {
            rows[i].insert(j, 1.0);
            rows[j as usize].insert(i as u32, 1.0);
        }
    }
    Graph::from_maps(rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    /// Cluster of every node; cluster 0 is the largest.
    pub labels: Vec<usize>,
    pub n_clusters: usize,
    pub modularity: f64,
    pub levels: usize,
}

impl ClusterAssignment {
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.n_clusters];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }
}

/// Multi-level Louvain community detection. Node visiting order is
/// shuffled with `seed`, so results are reproducible for a fixed seed.
pub fn louvain(graph: &Graph, resolution: f64, seed: u64, max_levels: usize) -> ClusterAssignment {
    let n = graph.n_nodes();
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut membership: Vec<usize> = (0..n).collect();
    let mut level_graph = graph.clone();
    let mut levels = 0usize;

    while levels < max_levels {
        let (moved, communities) = local_moves(&level_graph, resolution, &mut rng);
        if !moved {
            break;
        }
        levels += 1;
        let (dense, n_comm) = compact(&communities);
        for m in membership.iter_mut() {
            *m = dense[*m];
        }
        if n_comm == level_graph.n_nodes() {
            break;
        }
        level_graph = aggregate(&level_graph, &dense, n_comm);
    }

    let (labels, n_clusters) = renumber_by_size(&membership);
    let modularity = modularity(graph, &labels, resolution);
    ClusterAssignment {
        labels,
        n_clusters,
        modularity,
        levels,
    }
}

fn local_moves(graph: &Graph, resolution: f64, rng: &mut Pcg64) -> (bool, Vec<usize>) {
    let n = graph.n_nodes();
    let strength: Vec<f64> = (0..n).map(|i| graph.strength(i)).collect();
    let m2: f64 = strength.iter().sum();
    let mut community: Vec<usize> = (0..n).collect();
    if m2 <= 0.0 {
        return (false, community);
    }
    let mut total = strength.clone();

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let mut weight_to: Vec<f64> = vec![0.0; n];
    let mut seen: Vec<usize> = Vec::new();
    let mut any_move = false;
    loop {
        let mut moved = false;
        for &i in &order {
            let own = community[i];
            let k_i = strength[i];

            for &(j, w) in &graph.adj[i] {
                let j = j as usize;
                if j == i {
                    continue;
                }
                let c = community[j];
                if weight_to[c] == 0.0 {
                    seen.push(c);
                }
                weight_to[c] += w;
            }

            total[own] -= k_i;
            let gain = |c: usize, w_in: f64| w_in - resolution * total[c] * k_i / m2;
            let mut best = own;
            let mut best_gain = gain(own, weight_to[own]);
            for &c in &seen {
                let g = gain(c, weight_to[c]);
                if g > best_gain + 1e-12 {
                    best = c;
                    best_gain = g;
                }
            }
            total[best] += k_i;
            if best != own {
                community[i] = best;
                moved = true;
                any_move = true;
            }

            for &c in &seen {
                weight_to[c] = 0.0;
            }
            weight_to[own] = 0.0;
            seen.clear();
        }
        if !moved {
            break;
        }
    }
    (any_move, community)
}

fn compact(communities: &[usize]) -> (Vec<usize>, usize) {
    let mut map: BTreeMap<usize, usize> = BTreeMap::new();
    let mut dense = Vec::with_capacity(communities.len());
    for &c in communities {
        let next = map.len();
        dense.push(*map.entry(c).or_insert(next));
    }
    (dense, map.len())
}

fn aggregate(graph: &Graph, community: &[usize], n_comm: usize) -> Graph {
    let mut rows: Vec<BTreeMap<u32, f64>> = vec![BTreeMap::new(); n_comm];
    for (i, row) in graph.adj.iter().enumerate() {
        let ci = community[i];
        for &(j, w) in row {
            let cj = community[j as usize] as u32;
            *rows[ci].entry(cj).or_insert(0.0) += w;
        }
    }
    Graph::from_maps(rows)
}

/// Relabels clusters so that 0 is the largest; equal sizes keep the order
/// of first appearance.
pub fn renumber_by_size(labels: &[usize]) -> (Vec<usize>, usize) {
    let (dense, n) = compact(labels);
    let mut sizes = vec![0usize; n];
    for &l in &dense {
        sizes[l] += 1;
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]).then(a.cmp(&b)));
    let mut rank = vec![0usize; n];
    for (new, &old) in order.iter().enumerate() {
        rank[old] = new;
    }
    (dense.into_iter().map(|l| rank[l]).collect(), n)
}

/// Newman-Girvan modularity with a resolution parameter.
pub fn modularity(graph: &Graph, labels: &[usize], resolution: f64) -> f64 {
    let n = graph.n_nodes();
    let m2: f64 = (0..n).map(|i| graph.strength(i)).sum();
    if m2 <= 0.0 {
        return 0.0;
    }
    let n_comm = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut internal = vec![0f64; n_comm];
    let mut total = vec![0f64; n_comm];
    for (i, row) in graph.adj.iter().enumerate() {
        let ci = labels[i];
        for &(j, w) in row {
            total[ci] += w;
            if labels[j as usize] == ci {
                internal[ci] += w;
            }
        }
    }
    internal
        .iter()
        .zip(total.iter())
        .map(|(a, t)| a / m2 - resolution * (t / m2).powi(2))
        .sum()
}

#[cfg(test)]
#[path = "../../tests/src_inline/graph/louvain.rs"]
mod tests;
