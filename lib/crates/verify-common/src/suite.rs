use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::expectation::{Expectation, Probe};
use crate::types::{RunMode, VarValue};

/// Top-level suite file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SuiteFile {
    #[serde(default)]
    pub cases: Vec<CaseSpec>,
}

/// One verification case: a module, its inputs, a mode and what must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseSpec {
    /// Unique case name within the suite.
    pub name: String,
    /// Module directory, relative to the suite file.
    pub module: PathBuf,
    #[serde(default)]
    pub mode: RunMode,
    /// When set, `${name}` expands to `<name_prefix>-<unique id>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default)]
    pub vars: BTreeMap<String, VarValue>,
    /// Extra environment for every tool invocation of this case.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub expect: Vec<Expectation>,
    #[serde(default)]
    pub probes: Vec<Probe>,
}
