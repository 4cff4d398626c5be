//! Command handlers wiring the CLI to the analysis core.
//!
//! Each handler resolves the workspace, builds collaborators from config, and
//! writes machine-readable output to stdout.
mod analyze;
mod context;
mod init;
mod responses;
mod validate;

pub(crate) use analyze::{run_analyze, run_steps};
pub(crate) use context::RunContext;
pub(crate) use init::run_init;
pub(crate) use responses::run_responses;
pub(crate) use validate::{run_check, run_validate};
