use tracing::info;

use crate::integrate::{IntegrateError, IntegrationInput, IntegrationStrategy};
use crate::model::embedding::IntegratedRepresentation;

pub fn run_stage6(
    input: &IntegrationInput,
    strategy: &dyn IntegrationStrategy,
    dims: usize,
) -> Result<IntegratedRepresentation, IntegrateError> {
    info!(
        strategy = strategy.kind().as_str(),
        datasets = input.datasets.len(),
        cells = input.n_cells(),
        features = input.features.len(),
        dims,
        "integrating"
    );
    let rep = strategy.integrate(input, dims)?;
    for (name, value) in &rep.diagnostics {
        info!(strategy = strategy.kind().as_str(), name = %name, value, "integration diagnostic");
    }
    Ok(rep)
}
