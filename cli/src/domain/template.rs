//! `${placeholder}` expansion for suite strings.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder regex"));

pub const UNIQUE_ID: &str = "unique_id";
pub const NAME: &str = "name";
pub const REGION: &str = "region";

/// Values available to `${...}` placeholders while expanding one case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    values: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Context for one case: `${unique_id}`, `${name}` and `${region}`.
    ///
    /// `${name}` is `<prefix>-<unique_id>` when the case has a name prefix,
    /// otherwise the case name.
    #[must_use]
    pub fn for_case(case_name: &str, name_prefix: Option<&str>, unique_id: &str, region: &str) -> Self {
        let name = match name_prefix {
            Some(prefix) => crate::domain::naming::join_name(prefix, unique_id),
            None => case_name.to_string(),
        };
        Self::default()
            .with(UNIQUE_ID, unique_id)
            .with(NAME, name)
            .with(REGION, region)
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Replace every known placeholder. Unknown ones are left verbatim.
    #[must_use]
    pub fn expand(&self, input: &str) -> String {
        PLACEHOLDER_RE
            .replace_all(input, |caps: &Captures<'_>| {
                self.values
                    .get(&caps[1])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// Placeholder names in `input` that this context cannot resolve.
    #[must_use]
    pub fn find_unresolved(&self, input: &str) -> Vec<String> {
        PLACEHOLDER_RE
            .captures_iter(input)
            .map(|caps| caps[1].to_string())
            .filter(|name| !self.values.contains_key(name))
            .collect()
    }
}
