use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::config::load_config;
use crate::pipeline::screen;
use crate::report::tsv::{write_filter_summary, write_qc_tables};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Run configuration (TOML)
    #[arg(long)]
    pub(crate) config: PathBuf,

    /// Output directory
    #[arg(long)]
    pub(crate) out: PathBuf,
}

pub fn handle(args: ValidateArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let summaries = screen(&config)?;

    std::fs::create_dir_all(&args.out)?;
    write_qc_tables(&args.out, &summaries)?;
    write_filter_summary(&args.out.join("validate.tsv"), &summaries)?;
    for s in &summaries {
        info!(
            dataset = %s.label,
            before = s.cells_before,
            after = s.cells_after,
            "filter preview"
        );
    }
    Ok(())
}
