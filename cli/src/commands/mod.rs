//! Command implementations

pub mod check;
pub mod doctor;
pub mod run;
pub mod version;

/// A failure the command has already rendered.
///
/// `main` exits 1 without printing anything else, so a `--json` run still
/// emits exactly one JSON document.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Reported(pub String);
