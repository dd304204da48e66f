pub mod dataset;
pub mod embedding;
pub mod qc;
pub mod thresholds;
