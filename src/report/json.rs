use std::path::Path;

use crate::pipeline::stage8_report::RunSummary;
use crate::report::ReportError;

pub fn write_summary(out_dir: &Path, summary: &RunSummary) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(out_dir.join("summary.json"), json)?;
    Ok(())
}
