//! The canonical, dialect-neutral flow graph.
//!
//! A [`ComponentModel`] is produced once per flow by [`ModelBuilder`]. After that
//! only the type mapper touches it (setting `target_type` and `properties`);
//! layout and generation read it.

use crate::mapper::TargetType;
use crate::record::{ConfigMap, DialectId, RecordRole};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

mod builder;

pub use builder::ModelBuilder;

/// The kind of link an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Control flow from one step to the next.
    Sequence,
    /// A call into another flow or subprocess.
    Reference,
    /// Hand-over to an error handler. Exempt from acyclicity checks.
    Error,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Sequence => "sequence",
            EdgeKind::Reference => "reference",
            EdgeKind::Error => "error",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sequence" => Some(EdgeKind::Sequence),
            "reference" => Some(EdgeKind::Reference),
            "error" => Some(EdgeKind::Error),
            _ => None,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable edge identifier, also used as the `id` of the generated connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn from_index(index: usize) -> Self {
        EdgeId(format!("SequenceFlow_{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A directed link between two canonical nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source_node: String,
    pub target_node: String,
    pub kind: EdgeKind,
    pub condition: Option<String>,
}

/// Identifies one record that was folded into a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSource {
    pub document: String,
    pub record_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalNode {
    pub node_id: String,
    pub name: String,
    pub source_type: String,
    pub variant: Option<String>,
    pub role: RecordRole,
    pub dialect: Option<DialectId>,
    /// `Unresolved` until the type mapper runs.
    pub target_type: TargetType,
    pub incoming: Vec<EdgeId>,
    pub outgoing: Vec<EdgeId>,
    /// Merged source configuration, later records overriding earlier ones.
    pub config: ConfigMap,
    /// Normalized properties consumed by templates. Filled by the type mapper.
    pub properties: ConfigMap,
    pub sources: Vec<RecordSource>,
}

impl CanonicalNode {
    pub fn is_start(&self) -> bool {
        self.role == RecordRole::Start
    }

    pub fn is_end(&self) -> bool {
        self.role == RecordRole::End
    }

    /// Name shown on the generated shape, falling back to the node id.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.node_id
        } else {
            &self.name
        }
    }
}

/// The canonical graph for one integration flow.
///
/// Every edge endpoint is guaranteed to name a node in the set. Nodes are
/// read-only outside the crate once built:
///
/// ```compile_fail
/// use flowbridge::model::ModelBuilder;
/// use flowbridge::record::{ComponentRecord, RecordRole};
///
/// let records = vec![ComponentRecord::hint("a", "A", "listener").with_role(RecordRole::Start)];
/// let mut model = ModelBuilder::new().build(&records).unwrap();
/// for node in model.nodes_mut() {
///     node.node_id = "b".to_string();
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentModel {
    nodes: IndexMap<String, CanonicalNode>,
    edges: IndexMap<EdgeId, Edge>,
}

impl ComponentModel {
    pub(crate) fn from_parts(
        nodes: IndexMap<String, CanonicalNode>,
        edges: IndexMap<EdgeId, Edge>,
    ) -> Self {
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CanonicalNode> {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut CanonicalNode> {
        self.nodes.values_mut()
    }

    pub fn node(&self, node_id: &str) -> Option<&CanonicalNode> {
        self.nodes.get(node_id)
    }

    /// Position of a node in build order.
    pub fn node_index(&self, node_id: &str) -> Option<usize> {
        self.nodes.get_index_of(node_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge(&self, edge_id: &EdgeId) -> Option<&Edge> {
        self.edges.get(edge_id)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Designated start nodes in build order.
    pub fn starts(&self) -> impl Iterator<Item = &CanonicalNode> {
        self.nodes.values().filter(|n| n.is_start())
    }

    /// Outgoing edges of `node_id` in insertion order.
    pub fn outgoing(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.nodes
            .get(node_id)
            .into_iter()
            .flat_map(|n| n.outgoing.iter())
            .filter_map(|id| self.edges.get(id))
    }

    pub fn incoming(&self, node_id: &str) -> impl Iterator<Item = &Edge> {
        self.nodes
            .get(node_id)
            .into_iter()
            .flat_map(|n| n.incoming.iter())
            .filter_map(|id| self.edges.get(id))
    }

    /// Counts nodes per resolved target type, in first-seen order.
    pub fn type_histogram(&self) -> IndexMap<TargetType, usize> {
        let mut histogram = IndexMap::new();
        for node in self.nodes.values() {
            *histogram.entry(node.target_type).or_insert(0) += 1;
        }
        histogram
    }
}
