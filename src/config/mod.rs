pub mod defs;

use std::collections::HashSet;
use std::fmt::Display;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::integrate::{CELL_ID_SEPARATOR, StrategyKind};

pub use defs::{
    AlignmentParams, AnchorParams, ClusteringParams, DatasetSpec, FactorizationParams, GraphKind,
    InputFormat, IntegrationSettings, NormalizeSettings, QcSettings, RunConfig,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown integration strategy {0:?} (expected anchor, alignment or factorization)")]
    UnknownStrategy(String),
    #[error("{name} = {value} is outside {range}")]
    OutOfRange {
        name: String,
        value: String,
        range: String,
    },
    #[error("at least two datasets are required, found {0}")]
    TooFewDatasets(usize),
    #[error("duplicate dataset label: {0}")]
    DuplicateLabel(String),
    #[error("dataset {0} has an empty label")]
    EmptyLabel(usize),
    #[error("dataset label {0:?} contains {sep:?}, which joins labels to barcodes", sep = CELL_ID_SEPARATOR)]
    LabelSeparator(String),
    #[error("dataset {label}: min_genes ({min}) must be below max_genes ({max})")]
    InvertedBounds { label: String, min: u32, max: u32 },
}

/// Reads and validates a run file. Relative dataset paths resolve against
/// the directory of the config file.
pub fn load_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let text = fs::read_to_string(path)?;
    let mut config: RunConfig = toml::from_str(&text)?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    config.validate()?;
    Ok(config)
}

impl RunConfig {
    pub fn resolve_paths(&mut self, base: &Path) {
        for ds in &mut self.datasets {
            if ds.path.is_relative() {
                ds.path = base.join(&ds.path);
            }
            if let Some(ct) = ds.cell_types.as_mut()
                && ct.is_relative()
            {
                *ct = base.join(&*ct);
            }
        }
    }

    pub fn strategy(&self) -> Result<StrategyKind, ConfigError> {
        self.integration.strategy.parse()
    }

    /// Replaces the configured strategy after checking the name.
    pub fn set_strategy(&mut self, name: &str) -> Result<StrategyKind, ConfigError> {
        let kind: StrategyKind = name.parse()?;
        self.integration.strategy = kind.as_str().to_string();
        Ok(kind)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy()?;

        if self.datasets.len() < 2 {
            return Err(ConfigError::TooFewDatasets(self.datasets.len()));
        }
        let mut labels = HashSet::new();
        for (idx, ds) in self.datasets.iter().enumerate() {
            if ds.label.trim().is_empty() {
                return Err(ConfigError::EmptyLabel(idx + 1));
            }
            if ds.label.contains(CELL_ID_SEPARATOR) {
                return Err(ConfigError::LabelSeparator(ds.label.clone()));
            }
            if !labels.insert(ds.label.as_str()) {
                return Err(ConfigError::DuplicateLabel(ds.label.clone()));
            }
            let f = &ds.filter;
            if f.min_genes >= f.max_genes {
                return Err(ConfigError::InvertedBounds {
                    label: ds.label.clone(),
                    min: f.min_genes,
                    max: f.max_genes,
                });
            }
            if let Some(cap) = f.max_mito_pct {
                check(
                    &format!("dataset.{}.filter.max_mito_pct", ds.label),
                    cap,
                    Bound::Open(0.0),
                    Bound::Closed(100.0),
                )?;
            }
        }

        check("normalize.scale", self.normalize.scale, Bound::Open(0.0), Bound::Unbounded)?;
        let ig = &self.integration;
        check("integration.dims", ig.dims, Bound::Closed(2), Bound::Closed(100))?;
        check(
            "normalize.n_variable_features",
            self.normalize.n_variable_features,
            Bound::Closed(ig.dims),
            Bound::Closed(20_000),
        )?;

        let a = &ig.anchor;
        check("anchor.k_anchor", a.k_anchor, Bound::Closed(1), Bound::Closed(100))?;
        check("anchor.k_filter", a.k_filter, Bound::Closed(1), Bound::Closed(10_000))?;
        check("anchor.k_score", a.k_score, Bound::Closed(1), Bound::Closed(200))?;
        check("anchor.k_weight", a.k_weight, Bound::Closed(1), Bound::Closed(1000))?;
        check("anchor.sd_weight", a.sd_weight, Bound::Open(0.0), Bound::Closed(10.0))?;

        let h = &ig.alignment;
        check("alignment.theta", h.theta, Bound::Closed(0.0), Bound::Closed(10.0))?;
        check("alignment.sigma", h.sigma, Bound::Open(0.0), Bound::Closed(10.0))?;
        check("alignment.lambda", h.lambda, Bound::Open(0.0), Bound::Closed(100.0))?;
        if let Some(k) = h.n_clusters {
            check("alignment.n_clusters", k, Bound::Closed(2), Bound::Closed(1000))?;
        }
        check("alignment.max_iter", h.max_iter, Bound::Closed(1), Bound::Closed(10_000))?;
        check(
            "alignment.max_iter_cluster",
            h.max_iter_cluster,
            Bound::Closed(1),
            Bound::Closed(10_000),
        )?;
        check("alignment.epsilon", h.epsilon, Bound::Open(0.0), Bound::Open(1.0))?;
        check(
            "alignment.epsilon_cluster",
            h.epsilon_cluster,
            Bound::Open(0.0),
            Bound::Open(1.0),
        )?;

        let f = &ig.factorization;
        check("factorization.lambda", f.lambda, Bound::Closed(0.0), Bound::Closed(100.0))?;
        check("factorization.max_iter", f.max_iter, Bound::Closed(1), Bound::Closed(10_000))?;
        check("factorization.tolerance", f.tolerance, Bound::Open(0.0), Bound::Open(1.0))?;
        check("factorization.quantiles", f.quantiles, Bound::Closed(2), Bound::Closed(1000))?;
        check("factorization.min_cells", f.min_cells, Bound::Closed(1), Bound::Closed(10_000))?;
        check("factorization.knn_k", f.knn_k, Bound::Closed(0), Bound::Closed(200))?;

        let c = &self.clustering;
        check("clustering.n_neighbors", c.n_neighbors, Bound::Closed(2), Bound::Closed(200))?;
        check("clustering.prune", c.prune, Bound::Closed(0.0), Bound::Open(1.0))?;
        check("clustering.resolution", c.resolution, Bound::Open(0.0), Bound::Closed(10.0))?;
        check("clustering.max_levels", c.max_levels, Bound::Closed(1), Bound::Closed(100))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Bound<T> {
    Open(T),
    Closed(T),
    Unbounded,
}

fn check<T: PartialOrd + Display + Copy>(
    name: &str,
    value: T,
    lo: Bound<T>,
    hi: Bound<T>,
) -> Result<(), ConfigError> {
    let lo_ok = match lo {
        Bound::Open(l) => value > l,
        Bound::Closed(l) => value >= l,
        Bound::Unbounded => true,
    };
    let hi_ok = match hi {
        Bound::Open(h) => value < h,
        Bound::Closed(h) => value <= h,
        Bound::Unbounded => true,
    };
    if lo_ok && hi_ok {
        return Ok(());
    }
    let left = match lo {
        Bound::Open(l) => format!("({l}"),
        Bound::Closed(l) => format!("[{l}"),
        Bound::Unbounded => "(-inf".to_string(),
    };
    let right = match hi {
        Bound::Open(h) => format!("{h})"),
        Bound::Closed(h) => format!("{h}]"),
        Bound::Unbounded => "inf)".to_string(),
    };
    Err(ConfigError::OutOfRange {
        name: name.to_string(),
        value: value.to_string(),
        range: format!("{left}, {right}"),
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/config/mod.rs"]
mod tests;
