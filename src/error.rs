//! Typed errors callers may want to match on.
use std::path::PathBuf;
use thiserror::Error;

/// Invalid-input failures of an analysis run.
///
/// Everything else surfaces as a plain `anyhow::Error`.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("source document {} does not exist", .0.display())]
    MissingSource(PathBuf),
}
