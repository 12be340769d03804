use super::{ConfigMap, ConfigValue};
use crate::model::EdgeKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The source platforms with a registered parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectId {
    Mule,
    Boomi,
    WebMethods,
}

impl DialectId {
    pub const ALL: [DialectId; 3] = [DialectId::Mule, DialectId::Boomi, DialectId::WebMethods];

    pub fn as_str(&self) -> &'static str {
        match self {
            DialectId::Mule => "mule",
            DialectId::Boomi => "boomi",
            DialectId::WebMethods => "webmethods",
        }
    }

    /// Whether flows written in this dialect must be free of sequence cycles.
    /// webMethods `REPEAT` steps loop back onto themselves, the others cannot.
    pub fn requires_acyclic(&self) -> bool {
        match self {
            DialectId::Mule | DialectId::Boomi => true,
            DialectId::WebMethods => false,
        }
    }
}

impl fmt::Display for DialectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "mule" | "mulesoft" => Ok(DialectId::Mule),
            "boomi" | "dell-boomi" => Ok(DialectId::Boomi),
            "webmethods" | "wm" => Ok(DialectId::WebMethods),
            other => Err(format!(
                "unknown dialect '{}'; supported dialects are mule, boomi, webmethods",
                other
            )),
        }
    }
}

/// Where a record sits structurally in its flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordRole {
    /// The designated entry point (message source / trigger).
    Start,
    #[default]
    Step,
    End,
}

/// How a record entered the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordOrigin {
    #[default]
    Parsed,
    /// Supplied by an external enrichment step rather than read from a document.
    Hinted,
}

/// A declared link from one record to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLink {
    /// Id of the target record (or its merge key).
    pub target: String,
    pub kind: EdgeKind,
    /// Routing condition guarding the link, e.g. a `choice` branch expression.
    pub condition: Option<String>,
}

impl RecordLink {
    pub fn new(target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            target: target.into(),
            kind,
            condition: None,
        }
    }

    pub fn sequence(target: impl Into<String>) -> Self {
        Self::new(target, EdgeKind::Sequence)
    }

    pub fn with_condition(mut self, condition: Option<String>) -> Self {
        self.condition = condition;
        self
    }
}

/// One source element, as extracted by a dialect parser.
///
/// Records are immutable once parsing is done; everything downstream works on
/// canonical nodes built from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Unique within `document`.
    pub id: String,
    pub name: String,
    /// The originating element type, verbatim.
    pub source_type: String,
    /// Dialect sub-type, such as a connector type or the invoked service.
    pub variant: Option<String>,
    pub config: ConfigMap,
    /// The source fragment the record came from.
    pub raw_content: String,
    pub document: String,
    pub dialect: Option<DialectId>,
    pub role: RecordRole,
    pub origin: RecordOrigin,
    /// Records sharing a merge key fold into one canonical node. Defaults to `id`.
    pub merge_key: Option<String>,
    pub links: Vec<RecordLink>,
}

impl ComponentRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source_type: impl Into<String>,
        document: impl Into<String>,
        dialect: DialectId,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_type: source_type.into(),
            variant: None,
            config: ConfigMap::new(),
            raw_content: String::new(),
            document: document.into(),
            dialect: Some(dialect),
            role: RecordRole::Step,
            origin: RecordOrigin::Parsed,
            merge_key: None,
            links: Vec::new(),
        }
    }

    /// A record supplied by an external analysis step instead of a parser.
    pub fn hint(
        id: impl Into<String>,
        name: impl Into<String>,
        source_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_type: source_type.into(),
            variant: None,
            config: ConfigMap::new(),
            raw_content: String::new(),
            document: "<hints>".to_string(),
            dialect: None,
            role: RecordRole::Step,
            origin: RecordOrigin::Hinted,
            merge_key: None,
            links: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: RecordRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    pub fn with_merge_key(mut self, key: impl Into<String>) -> Self {
        self.merge_key = Some(key.into());
        self
    }

    pub fn with_link(mut self, link: RecordLink) -> Self {
        self.links.push(link);
        self
    }

    pub fn link_to(self, target: impl Into<String>) -> Self {
        self.with_link(RecordLink::sequence(target))
    }

    pub fn effective_merge_key(&self) -> &str {
        self.merge_key.as_deref().unwrap_or(&self.id)
    }
}
