use std::fmt;

use serde::{Deserialize, Serialize};

/// What an expectation checks.
///
/// `Output*` variants look at the raw text the tool printed, `Named*`
/// variants at the resolved named outputs of an apply, and
/// `ResourceCounts` at the plan summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    OutputContains {
        text: String,
    },
    OutputNotContains {
        text: String,
    },
    OutputNotEmpty,
    NamedEquals {
        name: String,
        value: String,
    },
    NamedContains {
        name: String,
        value: String,
    },
    NamedNotEmpty {
        name: String,
    },
    NamedLen {
        name: String,
        len: usize,
    },
    NamedHasKey {
        name: String,
        key: String,
    },
    ResourceCounts {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        add: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        change: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destroy: Option<u32>,
    },
}

impl Predicate {
    /// Whether the predicate reads named outputs (only produced by an apply).
    #[must_use]
    pub fn needs_outputs(&self) -> bool {
        matches!(
            self,
            Predicate::NamedEquals { .. }
                | Predicate::NamedContains { .. }
                | Predicate::NamedNotEmpty { .. }
                | Predicate::NamedLen { .. }
                | Predicate::NamedHasKey { .. }
        )
    }

    /// Rewrite every user-supplied string operand with `f`, output names
    /// included.
    #[must_use]
    pub fn map_strings(&self, f: &impl Fn(&str) -> String) -> Self {
        match self {
            Predicate::OutputContains { text } => Predicate::OutputContains { text: f(text) },
            Predicate::OutputNotContains { text } => Predicate::OutputNotContains { text: f(text) },
            Predicate::OutputNotEmpty => Predicate::OutputNotEmpty,
            Predicate::NamedEquals { name, value } => Predicate::NamedEquals {
                name: f(name),
                value: f(value),
            },
            Predicate::NamedContains { name, value } => Predicate::NamedContains {
                name: f(name),
                value: f(value),
            },
            Predicate::NamedNotEmpty { name } => Predicate::NamedNotEmpty { name: f(name) },
            Predicate::NamedLen { name, len } => Predicate::NamedLen {
                name: f(name),
                len: *len,
            },
            Predicate::NamedHasKey { name, key } => Predicate::NamedHasKey {
                name: f(name),
                key: f(key),
            },
            Predicate::ResourceCounts { .. } => self.clone(),
        }
    }

    /// Every string operand, for placeholder checks.
    #[must_use]
    pub fn operands(&self) -> Vec<&str> {
        match self {
            Predicate::OutputContains { text } | Predicate::OutputNotContains { text } => {
                vec![text.as_str()]
            }
            Predicate::NamedEquals { name, value } | Predicate::NamedContains { name, value } => {
                vec![name.as_str(), value.as_str()]
            }
            Predicate::NamedHasKey { name, key } => vec![name.as_str(), key.as_str()],
            Predicate::NamedNotEmpty { name } | Predicate::NamedLen { name, .. } => {
                vec![name.as_str()]
            }
            Predicate::OutputNotEmpty | Predicate::ResourceCounts { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::OutputContains { text } => write!(f, "output contains {text:?}"),
            Predicate::OutputNotContains { text } => write!(f, "output does not contain {text:?}"),
            Predicate::OutputNotEmpty => f.write_str("output is not empty"),
            Predicate::NamedEquals { name, value } => write!(f, "output `{name}` equals {value:?}"),
            Predicate::NamedContains { name, value } => {
                write!(f, "output `{name}` contains {value:?}")
            }
            Predicate::NamedNotEmpty { name } => write!(f, "output `{name}` is not empty"),
            Predicate::NamedLen { name, len } => write!(f, "output `{name}` has {len} entries"),
            Predicate::NamedHasKey { name, key } => write!(f, "output `{name}` has key {key:?}"),
            Predicate::ResourceCounts {
                add,
                change,
                destroy,
            } => {
                let mut parts = Vec::new();
                if let Some(n) = add {
                    parts.push(format!("{n} to add"));
                }
                if let Some(n) = change {
                    parts.push(format!("{n} to change"));
                }
                if let Some(n) = destroy {
                    parts.push(format!("{n} to destroy"));
                }
                if parts.is_empty() {
                    f.write_str("plan reports resource counts")
                } else {
                    write!(f, "plan reports {}", parts.join(", "))
                }
            }
        }
    }
}

/// A predicate plus an optional human explanation shown on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(flatten)]
    pub predicate: Predicate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Expectation {
    #[must_use]
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            message: None,
        }
    }

    #[must_use]
    pub fn output_contains(text: impl Into<String>) -> Self {
        Self::new(Predicate::OutputContains { text: text.into() })
    }

    #[must_use]
    pub fn output_not_contains(text: impl Into<String>) -> Self {
        Self::new(Predicate::OutputNotContains { text: text.into() })
    }

    #[must_use]
    pub fn output_not_empty() -> Self {
        Self::new(Predicate::OutputNotEmpty)
    }

    #[must_use]
    pub fn named_equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(Predicate::NamedEquals {
            name: name.into(),
            value: value.into(),
        })
    }

    #[must_use]
    pub fn named_contains(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(Predicate::NamedContains {
            name: name.into(),
            value: value.into(),
        })
    }

    #[must_use]
    pub fn named_not_empty(name: impl Into<String>) -> Self {
        Self::new(Predicate::NamedNotEmpty { name: name.into() })
    }

    #[must_use]
    pub fn named_len(name: impl Into<String>, len: usize) -> Self {
        Self::new(Predicate::NamedLen {
            name: name.into(),
            len,
        })
    }

    #[must_use]
    pub fn named_has_key(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(Predicate::NamedHasKey {
            name: name.into(),
            key: key.into(),
        })
    }

    #[must_use]
    pub fn resources_to_add(add: u32) -> Self {
        Self::new(Predicate::ResourceCounts {
            add: Some(add),
            change: None,
            destroy: None,
        })
    }

    /// Attach the explanation printed when the expectation fails.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)
    }
}

/// An independent query against the real cloud, run after an apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Probe {
    /// The VPC whose id is held in output `vpc_id_output` has CIDR `equals`.
    VpcCidrBlock {
        vpc_id_output: String,
        equals: String,
    },
}

impl Probe {
    #[must_use]
    pub fn map_strings(&self, f: &impl Fn(&str) -> String) -> Self {
        match self {
            Probe::VpcCidrBlock {
                vpc_id_output,
                equals,
            } => Probe::VpcCidrBlock {
                vpc_id_output: f(vpc_id_output),
                equals: f(equals),
            },
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::VpcCidrBlock {
                vpc_id_output,
                equals,
            } => write!(f, "VPC `{vpc_id_output}` has CIDR block {equals:?}"),
        }
    }
}
