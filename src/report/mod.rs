pub mod composition;
pub mod json;
pub mod text;
pub mod tsv;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tsv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Fixed six-decimal rendering used by every text output.
pub fn fmt6(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.6}")
    } else {
        "NA".to_string()
    }
}
