use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How far a module is driven through the provisioning tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// `init` + `validate`; nothing is planned or created.
    SyntaxCheck,
    /// `init` + `plan`; never mutates real infrastructure.
    #[default]
    PlanOnly,
    /// `init` + `apply`, always followed by `destroy`.
    ApplyAndDestroy,
}

impl RunMode {
    /// Whether this mode creates real resources.
    #[must_use]
    pub fn provisions(self) -> bool {
        matches!(self, RunMode::ApplyAndDestroy)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::SyntaxCheck => "syntax-check",
            RunMode::PlanOnly => "plan-only",
            RunMode::ApplyAndDestroy => "apply-and-destroy",
        })
    }
}

/// A module input value.
///
/// Deserialized untagged, so suite files write plain YAML scalars, sequences
/// and mappings. Serializes back to the natural JSON shape, which is exactly
/// what a `*.tfvars.json` file expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<VarValue>),
    Map(BTreeMap<String, VarValue>),
}

impl VarValue {
    /// Build a list value from anything convertible into `VarValue`.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VarValue>,
    {
        VarValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a mapping value from key/value pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<VarValue>,
    {
        VarValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Rewrite every string leaf with `f`. Keys are left untouched.
    #[must_use]
    pub fn map_strings(&self, f: &impl Fn(&str) -> String) -> Self {
        match self {
            VarValue::Str(s) => VarValue::Str(f(s)),
            VarValue::List(items) => VarValue::List(items.iter().map(|v| v.map_strings(f)).collect()),
            VarValue::Map(entries) => VarValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.map_strings(f)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Visit every string leaf.
    pub fn for_each_string(&self, f: &mut impl FnMut(&str)) {
        match self {
            VarValue::Str(s) => f(s),
            VarValue::List(items) => {
                for item in items {
                    item.for_each_string(f);
                }
            }
            VarValue::Map(entries) => {
                for value in entries.values() {
                    value.for_each_string(f);
                }
            }
            _ => {}
        }
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::Str(s.to_string())
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        VarValue::Str(s)
    }
}

impl From<&String> for VarValue {
    fn from(s: &String) -> Self {
        VarValue::Str(s.clone())
    }
}

impl From<bool> for VarValue {
    fn from(b: bool) -> Self {
        VarValue::Bool(b)
    }
}

impl From<i64> for VarValue {
    fn from(n: i64) -> Self {
        VarValue::Int(n)
    }
}

impl From<i32> for VarValue {
    fn from(n: i32) -> Self {
        VarValue::Int(i64::from(n))
    }
}

impl From<u16> for VarValue {
    fn from(n: u16) -> Self {
        VarValue::Int(i64::from(n))
    }
}

impl From<f64> for VarValue {
    fn from(n: f64) -> Self {
        VarValue::Float(n)
    }
}

impl<V: Into<VarValue>> From<Vec<V>> for VarValue {
    fn from(items: Vec<V>) -> Self {
        VarValue::list(items)
    }
}

impl<V: Into<VarValue>> From<BTreeMap<String, V>> for VarValue {
    fn from(entries: BTreeMap<String, V>) -> Self {
        VarValue::map(entries)
    }
}

/// A resolved named output of an applied module.
///
/// The provisioning tool reports arbitrary JSON; it is folded into one of
/// three shapes. Non-string scalars become their textual form and nested
/// values inside a list or map become compact JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    Str(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl OutputValue {
    /// Fold a JSON value (as found under `.value` of `output -json`).
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(items) => {
                OutputValue::List(items.iter().map(scalar_text).collect())
            }
            serde_json::Value::Object(entries) => OutputValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), scalar_text(v)))
                    .collect(),
            ),
            other => OutputValue::Str(scalar_text(other)),
        }
    }

    /// The string value, if this output is a plain string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OutputValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The mapping, if this output is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            OutputValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Number of entries: characters for strings, elements for lists and maps.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            OutputValue::Str(s) => s.chars().count(),
            OutputValue::List(items) => items.len(),
            OutputValue::Map(entries) => entries.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Containment with the natural meaning per shape: substring for
    /// strings, element equality for lists, key presence for maps.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            OutputValue::Str(s) => s.contains(needle),
            OutputValue::List(items) => items.iter().any(|i| i == needle),
            OutputValue::Map(entries) => entries.contains_key(needle),
        }
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputValue::Str(s) => f.write_str(s),
            OutputValue::List(items) => write!(f, "[{}]", items.join(", ")),
            OutputValue::Map(entries) => {
                let pairs: Vec<String> = entries.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
        }
    }
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
