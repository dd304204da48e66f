use clap::{Parser, Subcommand};

mod compare;
mod run;
mod validate;

#[derive(Parser, Debug)]
#[command(
    name = "kira-integrate",
    version,
    about = "Integrate single-cell datasets and report cluster composition"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full pipeline with one integration strategy
    Run(run::RunArgs),
    /// Load, QC and filter only
    Validate(validate::ValidateArgs),
    /// Every integration strategy over the same prepared data
    Compare(compare::CompareArgs),
}

impl Cli {
    pub fn dispatch(self) -> anyhow::Result<()> {
        match self.command {
            Command::Run(args) => run::handle(args),
            Command::Validate(args) => validate::handle(args),
            Command::Compare(args) => compare::handle(args),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/cli/mod.rs"]
mod tests;
