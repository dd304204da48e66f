use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::thresholds::FilterThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Auto,
    Tenx,
    Delimited,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetSpec {
    pub label: String,
    pub path: PathBuf,
    #[serde(default)]
    pub format: InputFormat,
    /// Feature type to keep from multi-modal 10x containers.
    #[serde(default)]
    pub modality: Option<String>,
    /// TSV with `cell_id` and `cell_type` columns.
    #[serde(default)]
    pub cell_types: Option<PathBuf>,
    #[serde(default)]
    pub filter: FilterThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QcSettings {
    pub mito_prefixes: Vec<String>,
    pub ribo_prefixes: Vec<String>,
    pub case_insensitive: bool,
}

impl Default for QcSettings {
    fn default() -> Self {
        Self {
            mito_prefixes: vec!["MT-".to_string()],
            ribo_prefixes: vec!["RPS".to_string(), "RPL".to_string()],
            case_insensitive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeSettings {
    pub scale: f32,
    pub n_variable_features: usize,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            scale: 10_000.0,
            n_variable_features: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnchorParams {
    pub k_anchor: usize,
    pub k_filter: usize,
    pub k_score: usize,
    pub k_weight: usize,
    pub sd_weight: f64,
}

impl Default for AnchorParams {
    fn default() -> Self {
        Self {
            k_anchor: 5,
            k_filter: 200,
            k_score: 30,
            k_weight: 100,
            sd_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlignmentParams {
    pub theta: f64,
    pub sigma: f64,
    pub lambda: f64,
    /// Defaults to `min(100, n_cells / 30)`, at least 2.
    pub n_clusters: Option<usize>,
    pub max_iter: usize,
    pub max_iter_cluster: usize,
    pub epsilon: f64,
    pub epsilon_cluster: f64,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self {
            theta: 2.0,
            sigma: 0.1,
            lambda: 1.0,
            n_clusters: None,
            max_iter: 10,
            max_iter_cluster: 20,
            epsilon: 1e-4,
            epsilon_cluster: 1e-5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactorizationParams {
    pub lambda: f64,
    pub max_iter: usize,
    pub tolerance: f64,
    pub quantiles: usize,
    pub min_cells: usize,
    /// Neighbours used to smooth factor assignments; 0 disables smoothing.
    pub knn_k: usize,
}

impl Default for FactorizationParams {
    fn default() -> Self {
        Self {
            lambda: 5.0,
            max_iter: 100,
            tolerance: 1e-4,
            quantiles: 50,
            min_cells: 20,
            knn_k: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrationSettings {
    pub strategy: String,
    pub dims: usize,
    pub seed: u64,
    pub anchor: AnchorParams,
    pub alignment: AlignmentParams,
    pub factorization: FactorizationParams,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            strategy: "anchor".to_string(),
            dims: 30,
            seed: 42,
            anchor: AnchorParams::default(),
            alignment: AlignmentParams::default(),
            factorization: FactorizationParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    /// Shared-nearest-neighbour Jaccard weights.
    #[default]
    Snn,
    /// Unweighted k-nearest-neighbour adjacency.
    Knn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusteringParams {
    pub n_neighbors: usize,
    pub graph: GraphKind,
    pub prune: f64,
    pub resolution: f64,
    pub seed: u64,
    pub max_levels: usize,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            n_neighbors: 10,
            graph: GraphKind::Snn,
            prune: 1.0 / 15.0,
            resolution: 0.8,
            seed: 0,
            max_levels: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(rename = "dataset")]
    pub datasets: Vec<DatasetSpec>,
    #[serde(default)]
    pub qc: QcSettings,
    #[serde(default)]
    pub normalize: NormalizeSettings,
    #[serde(default)]
    pub integration: IntegrationSettings,
    #[serde(default)]
    pub clustering: ClusteringParams,
}
