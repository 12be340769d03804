use crate::error::XmlError;
use crate::xml::XmlElement;

pub const BPMN2_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
pub const BPMNDI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";
pub const DC_NS: &str = "http://www.omg.org/spec/DD/20100524/DC";
pub const DI_NS: &str = "http://www.omg.org/spec/DD/20100524/DI";
pub const IFL_NS: &str = "http:///com.sap.ifl.model/Ifl.xsd";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Tags of process children that are flow nodes rather than connectors or
/// metadata.
pub const FLOW_NODE_TAGS: &[&str] = &[
    "startEvent",
    "endEvent",
    "serviceTask",
    "callActivity",
    "exclusiveGateway",
    "parallelGateway",
];

/// A generated integration-flow document.
///
/// Wraps the `bpmn2:definitions` root and offers accessors for the parts the
/// repair pass edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: XmlElement,
}

impl Document {
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut XmlElement {
        &mut self.root
    }

    pub fn into_root(self) -> XmlElement {
        self.root
    }

    pub fn process(&self) -> Option<&XmlElement> {
        self.root.find("process")
    }

    pub fn process_mut(&mut self) -> Option<&mut XmlElement> {
        self.root.find_mut("process")
    }

    /// The `bpmndi:BPMNPlane` holding shapes and connector geometry.
    pub fn plane(&self) -> Option<&XmlElement> {
        self.root.find("BPMNDiagram")?.find("BPMNPlane")
    }

    pub fn plane_mut(&mut self) -> Option<&mut XmlElement> {
        self.root.find_mut("BPMNDiagram")?.find_mut("BPMNPlane")
    }

    /// Flow-node elements of the process, in document order.
    pub fn flow_nodes(&self) -> impl Iterator<Item = &XmlElement> {
        self.process()
            .into_iter()
            .flat_map(|p| p.elements())
            .filter(|e| is_flow_node(e))
    }

    pub fn sequence_flows(&self) -> impl Iterator<Item = &XmlElement> {
        self.process()
            .into_iter()
            .flat_map(|p| p.find_all("sequenceFlow"))
    }

    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        self.root.to_xml_string()
    }
}

pub fn is_flow_node(element: &XmlElement) -> bool {
    FLOW_NODE_TAGS.contains(&element.local_name())
}

/// `<ifl:property><key>..</key><value>..</value></ifl:property>`.
pub fn property(key: &str, value: &str) -> XmlElement {
    XmlElement::new("ifl:property")
        .with_child(XmlElement::text_element("key", key))
        .with_child(XmlElement::text_element("value", value))
}

/// Key/value pairs of the `ifl:property` children of an `extensionElements`.
pub fn properties(extension: &XmlElement) -> Vec<(String, String)> {
    extension
        .find_all("property")
        .map(|p| {
            (
                p.find("key").map(XmlElement::text).unwrap_or_default(),
                p.find("value").map(XmlElement::text).unwrap_or_default(),
            )
        })
        .collect()
}

/// The first value stored under `key` in an element's `extensionElements`.
pub fn property_value(element: &XmlElement, key: &str) -> Option<String> {
    properties(element.find("extensionElements")?)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

/// Formats a diagram coordinate; whole numbers print without a fraction.
pub(crate) fn coordinate(value: f64) -> String {
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_round_trip() {
        let extension = XmlElement::new("bpmn2:extensionElements")
            .with_child(property("componentType", "script"))
            .with_child(property("scriptFunction", "processData"));
        let element = XmlElement::new("bpmn2:callActivity").with_child(extension);
        assert_eq!(
            property_value(&element, "scriptFunction").as_deref(),
            Some("processData")
        );
        assert_eq!(property_value(&element, "missing"), None);
    }

    #[test]
    fn test_coordinates_drop_trailing_zero() {
        assert_eq!(coordinate(260.0), "260");
        assert_eq!(coordinate(12.5), "12.5");
    }
}
