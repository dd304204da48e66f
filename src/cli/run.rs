use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::config::load_config;
use crate::pipeline::run_pipeline;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run configuration (TOML)
    #[arg(long)]
    pub(crate) config: PathBuf,

    /// Output directory
    #[arg(long)]
    pub(crate) out: PathBuf,

    /// Overrides the configured strategy: anchor, alignment or factorization
    #[arg(long)]
    pub(crate) strategy: Option<String>,
}

pub fn handle(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(name) = args.strategy.as_deref() {
        config.set_strategy(name)?;
    }
    let summary = run_pipeline(&config, &args.out)?;
    info!(
        strategy = summary.strategy.as_str(),
        cells = summary.n_cells,
        clusters = summary.clustering.n_clusters,
        out = %args.out.display(),
        "run complete"
    );
    Ok(())
}
