//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod expectation;
pub mod module;
pub mod naming;
pub mod plan;
pub mod report;
pub mod run_result;
pub mod template;

pub use config::{ConfigOverrides, VerifierConfig, validate_config};
pub use error::{
    ConfigError, ExpectationError, InvocationError, ModuleError, Operation, SuiteError,
    TeardownError,
};
pub use expectation::{Checked, Outcome, Verdict, evaluate, evaluate_all};
pub use module::{ModuleBuilder, ModuleUnderTest};
pub use naming::{NamingStrategy, unique_id, unique_name};
pub use plan::{PlanReport, ResourceChange};
pub use report::{CaseReport, SuiteReport};
pub use run_result::{RunResult, parse_outputs};
pub use template::TemplateContext;
