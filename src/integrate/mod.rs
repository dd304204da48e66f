pub mod alignment;
pub mod anchor;
pub mod factorization;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, IntegrationSettings};
use crate::expr::scale::densify_cells;
use crate::linalg::{LinalgError, to_f32};
use crate::model::embedding::IntegratedRepresentation;
use crate::pipeline::stage5_normalize::NormalizedDataset;

/// Joins a dataset label to a barcode in integrated cell ids. Labels may
/// not contain it.
pub const CELL_ID_SEPARATOR: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Anchor,
    Alignment,
    Factorization,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Anchor,
        StrategyKind::Alignment,
        StrategyKind::Factorization,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Anchor => "anchor",
            StrategyKind::Alignment => "alignment",
            StrategyKind::Factorization => "factorization",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anchor" => Ok(StrategyKind::Anchor),
            "alignment" => Ok(StrategyKind::Alignment),
            "factorization" => Ok(StrategyKind::Factorization),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum IntegrateError {
    #[error("linear algebra error: {0}")]
    Linalg(#[from] LinalgError),
    #[error("{strategy} did not converge within {iterations} iterations (last relative change {delta:.3e})")]
    Convergence {
        strategy: StrategyKind,
        iterations: usize,
        delta: f64,
    },
    #[error("no anchors survived between {reference} and {query}")]
    NoAnchors { reference: String, query: String },
    #[error("{what}: need at least {needed}, found {found}")]
    TooSmall {
        what: &'static str,
        needed: usize,
        found: usize,
    },
}

/// Per-dataset normalized data restricted to a common gene space, plus the
/// gene rows chosen for integration.
#[derive(Debug)]
pub struct IntegrationInput {
    pub datasets: Vec<NormalizedDataset>,
    pub features: Vec<usize>,
}

impl IntegrationInput {
    pub fn n_cells(&self) -> usize {
        self.datasets.iter().map(|d| d.dataset.n_cells()).sum()
    }

    /// Log-normalized integration features of one dataset, cells × features.
    pub fn normalized(&self, idx: usize) -> Array2<f64> {
        let ds = &self.datasets[idx];
        densify_cells(&ds.dataset.counts, &ds.stats, &ds.norm, &self.features)
    }

    pub fn origin(&self) -> Vec<usize> {
        self.datasets
            .iter()
            .enumerate()
            .flat_map(|(i, d)| std::iter::repeat_n(i, d.dataset.n_cells()))
            .collect()
    }

    /// Wraps a cells × dims matrix, rows in dataset order, as the result of
    /// `kind`.
    pub fn represent(
        &self,
        kind: StrategyKind,
        coords: &Array2<f64>,
        diagnostics: BTreeMap<String, f64>,
    ) -> IntegratedRepresentation {
        let mut cell_ids = Vec::with_capacity(coords.nrows());
        let mut cell_types = Vec::with_capacity(coords.nrows());
        for d in &self.datasets {
            let ds = &d.dataset;
            for (c, id) in ds.cells.iter().enumerate() {
                cell_ids.push(format!("{}{}{}", ds.label(), CELL_ID_SEPARATOR, id));
                cell_types.push(ds.cell_type(c).map(str::to_string));
            }
        }
        IntegratedRepresentation {
            strategy: kind,
            dims: coords.ncols(),
            coords: to_f32(coords),
            cell_ids,
            origin: self.origin(),
            origin_labels: self
                .datasets
                .iter()
                .map(|d| d.dataset.label().to_string())
                .collect(),
            cell_types,
            diagnostics,
        }
    }
}

pub trait IntegrationStrategy {
    fn kind(&self) -> StrategyKind;

    fn integrate(
        &self,
        input: &IntegrationInput,
        dims: usize,
    ) -> Result<IntegratedRepresentation, IntegrateError>;
}

pub fn build_strategy(
    kind: StrategyKind,
    settings: &IntegrationSettings,
) -> Box<dyn IntegrationStrategy> {
    match kind {
        StrategyKind::Anchor => Box::new(anchor::AnchorIntegration {
            params: settings.anchor.clone(),
            seed: settings.seed,
        }),
        StrategyKind::Alignment => Box::new(alignment::EmbeddingAlignment {
            params: settings.alignment.clone(),
            seed: settings.seed,
        }),
        StrategyKind::Factorization => Box::new(factorization::JointFactorization {
            params: settings.factorization.clone(),
            seed: settings.seed,
        }),
    }
}

/// Genes ranked by how many datasets selected them as variable, ties broken
/// by the median of their per-dataset ranks, then by row.
pub fn select_integration_features(ranked_per_dataset: &[Vec<usize>], n_genes: usize, n: usize) -> Vec<usize> {
    let mut ranks: Vec<Vec<usize>> = vec![Vec::new(); n_genes];
    for ranked in ranked_per_dataset {
        for (r, &g) in ranked.iter().enumerate() {
            ranks[g].push(r);
        }
    }
    let mut candidates: Vec<(usize, usize, f64)> = ranks
        .iter_mut()
        .enumerate()
        .filter(|(_, r)| !r.is_empty())
        .map(|(g, r)| (g, r.len(), median(r)))
        .collect();
    candidates.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then(a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
            .then(a.0.cmp(&b.0))
    });
    candidates.into_iter().take(n).map(|c| c.0).collect()
}

fn median(values: &mut [usize]) -> f64 {
    values.sort_unstable();
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2] as f64
    } else {
        (values[n / 2 - 1] + values[n / 2]) as f64 / 2.0
    }
}

fn require(what: &'static str, needed: usize, found: usize) -> Result<(), IntegrateError> {
    if found < needed {
        return Err(IntegrateError::TooSmall {
            what,
            needed,
            found,
        });
    }
    Ok(())
}

/// Linear-interpolation quantile of sorted values, `p` in `[0, 1]`.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Relative change between two objective values.
fn relative_change(previous: f64, current: f64) -> f64 {
    (previous - current).abs() / previous.abs().max(f64::MIN_POSITIVE)
}

#[cfg(test)]
#[path = "../../tests/src_inline/integrate/mod.rs"]
mod tests;
