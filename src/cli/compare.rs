use std::path::PathBuf;

use clap::Args;
use tracing::{info, warn};

use crate::config::load_config;
use crate::integrate::StrategyKind;
use crate::pipeline::{integrate_and_report, prepare};
use crate::report::tsv::{ComparisonRow, ComparisonStats, write_comparison};

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Run configuration (TOML)
    #[arg(long)]
    pub(crate) config: PathBuf,

    /// Output directory; each strategy writes to a subdirectory
    #[arg(long)]
    pub(crate) out: PathBuf,
}

pub fn handle(args: CompareArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let prepared = prepare(&config)?;
    std::fs::create_dir_all(&args.out)?;

    let mut rows = Vec::with_capacity(StrategyKind::ALL.len());
    for kind in StrategyKind::ALL {
        let out_dir = args.out.join(kind.as_str());
        let outcome = match integrate_and_report(&config, kind, &prepared, &out_dir) {
            Ok(summary) => Ok(ComparisonStats {
                n_clusters: summary.clustering.n_clusters,
                modularity: summary.clustering.modularity,
                mean_mixing_entropy: summary.mixing.mean,
            }),
            Err(err) => {
                warn!(strategy = kind.as_str(), error = %err, "strategy failed");
                Err(err.to_string())
            }
        };
        rows.push(ComparisonRow {
            strategy: kind.as_str().to_string(),
            outcome,
        });
    }
    write_comparison(&args.out.join("comparison.tsv"), &rows)?;

    let succeeded = rows.iter().filter(|r| r.outcome.is_ok()).count();
    if succeeded == 0 {
        anyhow::bail!("every integration strategy failed; see comparison.tsv");
    }
    info!(succeeded, total = rows.len(), "comparison complete");
    Ok(())
}
