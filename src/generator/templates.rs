use super::document::{coordinate, property};
use crate::layout::NodePosition;
use crate::mapper::TargetType;
use crate::model::CanonicalNode;
use crate::xml::XmlElement;
use ahash::AHashMap;
use std::sync::Arc;

/// The static shape of a target component: its element tag, runtime activity
/// type, optional event definition and the properties it cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateSpec {
    pub target: TargetType,
    /// Element tag in the `bpmn2` namespace, without prefix.
    pub tag: &'static str,
    pub activity_type: &'static str,
    pub event_definition: Option<&'static str>,
    /// Mandatory property keys and the default used when a node has none.
    pub mandatory: &'static [(&'static str, &'static str)],
}

/// A node rendered by a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// The flow-node element placed inside `bpmn2:process`.
    pub element: XmlElement,
    /// The `bpmndi:BPMNShape` placed on the diagram plane.
    pub shape: XmlElement,
}

/// Renders nodes of one target type.
///
/// Implementations must be pure: equal inputs give equal output trees.
pub trait ComponentTemplate: Send + Sync {
    fn target_type(&self) -> TargetType;
    fn render(&self, node: &CanonicalNode, position: &NodePosition) -> Rendered;
}

/// Renders `node` the standard way for `spec`.
pub fn render_standard(spec: &TemplateSpec, node: &CanonicalNode, position: &NodePosition) -> Rendered {
    Rendered {
        element: flow_element(spec, node),
        shape: shape_element(&node.node_id, position),
    }
}

/// Builds the process element: `extensionElements` with the component type,
/// activity type, mandatory and remaining properties, then incoming and
/// outgoing refs, then the event definition.
pub fn flow_element(spec: &TemplateSpec, node: &CanonicalNode) -> XmlElement {
    let mut extension = XmlElement::new("bpmn2:extensionElements")
        .with_child(property("componentType", spec.target.as_str()))
        .with_child(property("activityType", spec.activity_type));

    for (key, default) in spec.mandatory {
        let value = node
            .properties
            .get(*key)
            .filter(|v| !v.is_empty())
            .map(|v| v.to_target_expression())
            .unwrap_or_else(|| default.to_string());
        extension.push_child(property(key, &value));
    }
    for (key, value) in &node.properties {
        let reserved = matches!(key.as_str(), "componentType" | "activityType")
            || spec.mandatory.iter().any(|(k, _)| k == key);
        if !reserved {
            extension.push_child(property(key, &value.to_target_expression()));
        }
    }

    let mut element = XmlElement::new(format!("bpmn2:{}", spec.tag))
        .with_attr("id", node.node_id.as_str())
        .with_attr("name", node.display_name())
        .with_child(extension);
    for edge in &node.incoming {
        element.push_child(XmlElement::text_element("bpmn2:incoming", edge.as_str()));
    }
    for edge in &node.outgoing {
        element.push_child(XmlElement::text_element("bpmn2:outgoing", edge.as_str()));
    }
    if let Some(definition) = spec.event_definition {
        element.push_child(XmlElement::new(format!("bpmn2:{}", definition)));
    }
    element
}

pub fn shape_element(node_id: &str, position: &NodePosition) -> XmlElement {
    let b = &position.bounds;
    XmlElement::new("bpmndi:BPMNShape")
        .with_attr("bpmnElement", node_id)
        .with_attr("id", format!("BPMNShape_{}", node_id))
        .with_child(
            XmlElement::new("dc:Bounds")
                .with_attr("height", coordinate(b.height))
                .with_attr("width", coordinate(b.width))
                .with_attr("x", coordinate(b.x))
                .with_attr("y", coordinate(b.y)),
        )
}

/// Declares every built-in template: the struct, its spec, registration and
/// lookup by target type.
macro_rules! define_component_templates {
    ( $( ($struct_name:ident, $target:path, $tag:expr, $activity:expr, $event:expr, [ $( ($key:expr, $default:expr) ),* $(,)? ]) ),* $(,)? ) => {
        $(
            pub struct $struct_name;

            impl $struct_name {
                pub const SPEC: TemplateSpec = TemplateSpec {
                    target: $target,
                    tag: $tag,
                    activity_type: $activity,
                    event_definition: $event,
                    mandatory: &[ $( ($key, $default) ),* ],
                };
            }

            impl ComponentTemplate for $struct_name {
                fn target_type(&self) -> TargetType { $target }
                fn render(&self, node: &CanonicalNode, position: &NodePosition) -> Rendered {
                    render_standard(&Self::SPEC, node, position)
                }
            }
        )*

        pub(super) fn register_default_templates(registry: &mut AHashMap<TargetType, Arc<dyn ComponentTemplate>>) {
            $( registry.insert($target, Arc::new($struct_name)); )*
        }

        /// The built-in spec for a target type; `None` only for `Unresolved`.
        pub fn template_spec(target: TargetType) -> Option<&'static TemplateSpec> {
            match target {
                $( $target => Some(&$struct_name::SPEC), )*
                _ => None,
            }
        }
    };
}

define_component_templates! {
    // Events
    (StartEventTemplate, TargetType::StartEvent, "startEvent", "StartEvent", Some("messageEventDefinition"), []),
    (EndEventTemplate, TargetType::EndEvent, "endEvent", "EndEvent", Some("messageEventDefinition"), []),
    (ErrorEndEventTemplate, TargetType::ErrorEndEvent, "endEvent", "ErrorEndEvent", Some("errorEventDefinition"), []),

    // Adapters
    (RequestReplyTemplate, TargetType::RequestReply, "serviceTask", "ExternalCall", None,
        [("address", "/"), ("httpMethod", "POST")]),
    (SendTemplate, TargetType::Send, "serviceTask", "Send", None, [("address", "/")]),

    // Gateways
    (RouterTemplate, TargetType::Router, "exclusiveGateway", "ExclusiveGateway", None, []),
    (MulticastTemplate, TargetType::Multicast, "parallelGateway", "Multicast", None,
        [("parallelProcessing", "true")]),
    (JoinTemplate, TargetType::Join, "parallelGateway", "Join", None, []),

    // Steps
    (ContentModifierTemplate, TargetType::ContentModifier, "callActivity", "Enricher", None, []),
    (ScriptTemplate, TargetType::Script, "callActivity", "Script", None,
        [("scriptFunction", "processData")]),
    (MessageMappingTemplate, TargetType::MessageMapping, "callActivity", "Mapping", None,
        [("mappingPath", "mapping/default.mmap")]),
    (ConverterTemplate, TargetType::Converter, "callActivity", "Converter", None, [("format", "xml")]),
    (SplitterTemplate, TargetType::Splitter, "callActivity", "Splitter", None, [("expression", "/*")]),
    (GatherTemplate, TargetType::Gather, "callActivity", "Gather", None, [("strategy", "combine")]),
    (FilterTemplate, TargetType::Filter, "callActivity", "Filter", None, [("xpath", "/*")]),
    (ProcessCallTemplate, TargetType::ProcessCall, "callActivity", "ProcessCallElement", None,
        [("processId", "Local Integration Process")]),
    (LoopingProcessCallTemplate, TargetType::LoopingProcessCall, "callActivity", "LoopingProcessCall", None,
        [("processId", "Local Integration Process"), ("maxNumberOfIterations", "999")]),
    (DataStoreTemplate, TargetType::DataStore, "callActivity", "DBstorage", None, [("operation", "put")]),
    (EncoderTemplate, TargetType::Encoder, "callActivity", "Encoder", None, [("encoding", "base64")]),
    (LoggerTemplate, TargetType::Logger, "callActivity", "Logger", None, [("level", "INFO")]),
    (GenericPassthroughTemplate, TargetType::GenericPassthrough, "callActivity", "Passthrough", None, []),
}

/// The target type implied by a flow-node element's tag alone, used when an
/// element lacks its `componentType`.
pub fn infer_target_type(element: &XmlElement) -> Option<TargetType> {
    match element.local_name() {
        "startEvent" => Some(TargetType::StartEvent),
        "endEvent" if element.find("errorEventDefinition").is_some() => {
            Some(TargetType::ErrorEndEvent)
        }
        "endEvent" => Some(TargetType::EndEvent),
        "exclusiveGateway" => Some(TargetType::Router),
        "parallelGateway" => Some(TargetType::Multicast),
        "serviceTask" => Some(TargetType::RequestReply),
        "callActivity" => Some(TargetType::GenericPassthrough),
        _ => None,
    }
}
