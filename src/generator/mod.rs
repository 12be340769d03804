//! Target document generation.
//!
//! Each mapped node is rendered by the template registered for its
//! [`TargetType`]; connectors and the document scaffolding are added around
//! them. Generation is deterministic: equal inputs produce byte-identical XML.

use crate::error::GenerateError;
use crate::layout::{LayoutPositions, Point};
use crate::mapper::TargetType;
use crate::model::{ComponentModel, Edge, EdgeKind};
use crate::xml::XmlElement;
use ahash::AHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

mod document;
mod scaffold;
pub mod templates;

pub use document::{
    Document, FLOW_NODE_TAGS, is_flow_node, properties, property, property_value,
};
pub use templates::{
    ComponentTemplate, Rendered, TemplateSpec, infer_target_type, render_standard, template_spec,
};

use document::coordinate;
use templates::register_default_templates;

/// Flow-level metadata written into the collaboration and the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMeta {
    pub flow_id: String,
    pub flow_name: String,
    pub flow_version: String,
    /// Version of the mapping table used to classify the nodes.
    pub table_version: String,
}

impl Default for FlowMeta {
    fn default() -> Self {
        Self {
            flow_id: "flow".to_string(),
            flow_name: "Integration Flow".to_string(),
            flow_version: "1.0.0".to_string(),
            table_version: "unversioned".to_string(),
        }
    }
}

/// Summary handed to the packaging layer next to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowManifest {
    pub flow_id: String,
    pub flow_name: String,
    pub flow_version: String,
    pub table_version: String,
    pub node_count: usize,
    pub edge_count: usize,
    /// Number of nodes per target type, in first-seen order.
    pub component_types: IndexMap<TargetType, usize>,
}

impl FlowManifest {
    /// Recomputes the counts from a (possibly repaired) document.
    pub fn recount(&mut self, document: &Document) {
        let mut histogram: IndexMap<TargetType, usize> = IndexMap::new();
        let mut nodes = 0;
        for element in document.flow_nodes() {
            nodes += 1;
            let target = property_value(element, "componentType")
                .and_then(|t| TargetType::from_str(&t).ok())
                .or_else(|| infer_target_type(element))
                .unwrap_or(TargetType::GenericPassthrough);
            *histogram.entry(target).or_insert(0) += 1;
        }
        self.node_count = nodes;
        self.edge_count = document.sequence_flows().count();
        self.component_types = histogram;
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// A rendered flow: the document and its manifest.
#[derive(Debug, Clone)]
pub struct GeneratedFlow {
    pub document: Document,
    pub manifest: FlowManifest,
}

pub struct TemplateGenerator {
    templates: AHashMap<TargetType, Arc<dyn ComponentTemplate>>,
}

pub struct TemplateGeneratorBuilder {
    templates: AHashMap<TargetType, Arc<dyn ComponentTemplate>>,
}

impl Default for TemplateGeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateGeneratorBuilder {
    pub fn new() -> Self {
        let mut templates: AHashMap<TargetType, Arc<dyn ComponentTemplate>> = AHashMap::new();
        register_default_templates(&mut templates);
        Self { templates }
    }

    /// Replaces the template for the type the given template renders.
    pub fn with_custom_template(mut self, template: Box<dyn ComponentTemplate>) -> Self {
        self.templates
            .insert(template.target_type(), Arc::from(template));
        self
    }

    pub fn build(self) -> TemplateGenerator {
        TemplateGenerator {
            templates: self.templates,
        }
    }
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateGenerator {
    pub fn new() -> Self {
        TemplateGeneratorBuilder::new().build()
    }

    pub fn builder() -> TemplateGeneratorBuilder {
        TemplateGeneratorBuilder::new()
    }

    /// Renders a document with default flow metadata.
    pub fn generate(
        &self,
        model: &ComponentModel,
        positions: &LayoutPositions,
    ) -> Result<Document, GenerateError> {
        self.generate_flow(model, positions, &FlowMeta::default())
            .map(|flow| flow.document)
    }

    pub fn generate_flow(
        &self,
        model: &ComponentModel,
        positions: &LayoutPositions,
        meta: &FlowMeta,
    ) -> Result<GeneratedFlow, GenerateError> {
        let mut scaffold = scaffold::build(meta, positions.extent());

        let mut shapes = Vec::with_capacity(model.node_count());
        for node in model.nodes() {
            if !node.target_type.is_resolved() {
                return Err(GenerateError::UnresolvedType(node.node_id.clone()));
            }
            let template = self
                .templates
                .get(&node.target_type)
                .ok_or_else(|| GenerateError::UnresolvedType(node.node_id.clone()))?;
            let position = positions
                .node(&node.node_id)
                .ok_or_else(|| GenerateError::MissingPosition(node.node_id.clone()))?;
            let rendered = template.render(node, position);
            debug!(node = %node.node_id, target = %node.target_type, "rendered node");
            scaffold.process.push_child(rendered.element);
            shapes.push(rendered.shape);
        }

        let mut diagram_edges = Vec::with_capacity(model.edge_count());
        for edge in model.edges() {
            scaffold.process.push_child(sequence_flow(
                edge.id.as_str(),
                &edge.source_node,
                &edge.target_node,
                edge.kind,
                edge.condition.as_deref(),
            ));
            let points = match positions.waypoints(&edge.id) {
                Some(points) => points.to_vec(),
                None => fallback_waypoints(edge, positions)?,
            };
            diagram_edges.push(diagram_edge(
                edge.id.as_str(),
                &edge.source_node,
                &edge.target_node,
                &points,
            ));
        }

        for shape in shapes.into_iter().chain(diagram_edges) {
            scaffold.plane.push_child(shape);
        }

        let manifest = FlowManifest {
            flow_id: meta.flow_id.clone(),
            flow_name: meta.flow_name.clone(),
            flow_version: meta.flow_version.clone(),
            table_version: meta.table_version.clone(),
            node_count: model.node_count(),
            edge_count: model.edge_count(),
            component_types: model.type_histogram(),
        };
        info!(
            flow = %meta.flow_id,
            nodes = manifest.node_count,
            edges = manifest.edge_count,
            "document generated"
        );
        Ok(GeneratedFlow {
            document: Document::new(scaffold.assemble()),
            manifest,
        })
    }
}

/// A straight connector between the two shapes, for edges that were not routed.
fn fallback_waypoints(edge: &Edge, positions: &LayoutPositions) -> Result<Vec<Point>, GenerateError> {
    let bounds = |id: &str| {
        positions
            .node(id)
            .map(|p| p.bounds)
            .ok_or_else(|| GenerateError::MissingPosition(id.to_string()))
    };
    Ok(vec![
        bounds(&edge.source_node)?.right_mid(),
        bounds(&edge.target_node)?.left_mid(),
    ])
}

/// A `bpmn2:sequenceFlow` connector element.
pub fn sequence_flow(
    id: &str,
    source: &str,
    target: &str,
    kind: EdgeKind,
    condition: Option<&str>,
) -> XmlElement {
    let mut element = XmlElement::new("bpmn2:sequenceFlow").with_attr("id", id);
    if let Some(condition) = condition {
        element.set_attr("name", condition);
    }
    element.set_attr("sourceRef", source);
    element.set_attr("targetRef", target);
    element.push_child(
        XmlElement::new("bpmn2:extensionElements").with_child(property("edgeKind", kind.as_str())),
    );
    if let Some(condition) = condition {
        element.push_child(
            XmlElement::new("bpmn2:conditionExpression")
                .with_attr("xsi:type", "bpmn2:tFormalExpression")
                .with_text(condition),
        );
    }
    element
}

/// A `bpmndi:BPMNEdge` with one `di:waypoint` per point.
pub fn diagram_edge(id: &str, source: &str, target: &str, points: &[Point]) -> XmlElement {
    XmlElement::new("bpmndi:BPMNEdge")
        .with_attr("bpmnElement", id)
        .with_attr("id", format!("BPMNEdge_{}", id))
        .with_attr("sourceElement", format!("BPMNShape_{}", source))
        .with_attr("targetElement", format!("BPMNShape_{}", target))
        .with_children(points.iter().map(|p| {
            XmlElement::new("di:waypoint")
                .with_attr("x", coordinate(p.x))
                .with_attr("xsi:type", "dc:Point")
                .with_attr("y", coordinate(p.y))
        }))
}
