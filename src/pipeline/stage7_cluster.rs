use tracing::info;

use crate::config::{ClusteringParams, GraphKind};
use crate::graph::ClusterError;
use crate::graph::knn::knn_within;
use crate::graph::louvain::{ClusterAssignment, knn_graph, louvain, snn_graph};
use crate::model::embedding::IntegratedRepresentation;

pub fn run_stage7(
    rep: &IntegratedRepresentation,
    params: &ClusteringParams,
) -> Result<ClusterAssignment, ClusterError> {
    let n = rep.n_cells();
    if rep.dims == 0 || rep.coords.len() != n * rep.dims {
        return Err(ClusterError::Shape {
            len: rep.coords.len(),
            dims: rep.dims,
        });
    }
    if n < 2 {
        return Err(ClusterError::TooFewCells {
            needed: 2,
            found: n,
        });
    }

    let nn = knn_within(&rep.coords, rep.dims, params.n_neighbors);
    let graph = match params.graph {
        GraphKind::Snn => snn_graph(&nn, params.prune),
        GraphKind::Knn => knn_graph(&nn),
    };
    info!(nodes = graph.n_nodes(), edges = graph.n_edges(), "neighbour graph built");

    let clusters = louvain(&graph, params.resolution, params.seed, params.max_levels);
    info!(
        clusters = clusters.n_clusters,
        modularity = clusters.modularity,
        levels = clusters.levels,
        "clustering finished"
    );
    Ok(clusters)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage7_cluster.rs"]
mod tests;
