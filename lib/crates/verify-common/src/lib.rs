//! Shared data model for infra-verify.
//!
//! Everything here is plain data with serde support: suite files are parsed
//! into these types and the verifier library consumes them directly.

pub mod expectation;
pub mod suite;
pub mod types;

pub use expectation::{Expectation, Predicate, Probe};
pub use suite::{CaseSpec, SuiteFile};
pub use types::{OutputValue, RunMode, VarValue};
