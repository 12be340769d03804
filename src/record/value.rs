use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A configuration value read from a source document.
///
/// Source formats encode configuration as loosely typed trees. Each leaf is
/// classified once, at parse time, as either a literal or a binding to a
/// path in the message being processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ConfigValue {
    Literal(String),
    /// A slash-separated data path such as `order/id`.
    Reference(String),
}

impl ConfigValue {
    pub fn literal(value: impl Into<String>) -> Self {
        ConfigValue::Literal(value.into())
    }

    pub fn reference(path: impl Into<String>) -> Self {
        ConfigValue::Reference(path.into())
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, ConfigValue::Reference(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ConfigValue::Literal(v) | ConfigValue::Reference(v) => v.trim().is_empty(),
        }
    }

    /// The raw literal text or reference path.
    pub fn as_str(&self) -> &str {
        match self {
            ConfigValue::Literal(v) | ConfigValue::Reference(v) => v,
        }
    }

    /// How the value is written into the target document: literals verbatim,
    /// references as `${path}` expressions.
    pub fn to_target_expression(&self) -> String {
        match self {
            ConfigValue::Literal(v) => v.clone(),
            ConfigValue::Reference(path) => format!("${{{}}}", path),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Literal(v) => write!(f, "{}", v),
            ConfigValue::Reference(path) => write!(f, "{{{}}}", path),
        }
    }
}

/// Ordered configuration keyed by a dot-separated path, in source order.
pub type ConfigMap = IndexMap<String, ConfigValue>;
