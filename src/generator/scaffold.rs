//! Document-level structure emitted once per flow: definitions root,
//! collaboration with participants, the process container and the diagram
//! plane with the participant pools.

use super::FlowMeta;
use super::document::{
    BPMN2_NS, BPMNDI_NS, DC_NS, DI_NS, IFL_NS, XSI_NS, coordinate, property,
};
use crate::layout::Bounds;
use crate::xml::XmlElement;

pub(crate) const COLLABORATION_ID: &str = "Collaboration_1";
pub(crate) const PROCESS_ID: &str = "Process_1";
const PROCESS_PARTICIPANT: &str = "Participant_Process";

/// Padding between the process pool border and its content.
const POOL_PADDING: f64 = 40.0;
const ENDPOINT_WIDTH: f64 = 100.0;
const ENDPOINT_HEIGHT: f64 = 140.0;
const ENDPOINT_MARGIN: f64 = 40.0;

/// The container elements; node and connector content is added by the caller.
pub(crate) struct Scaffold {
    pub definitions: XmlElement,
    pub collaboration: XmlElement,
    pub process: XmlElement,
    pub plane: XmlElement,
}

pub(crate) fn build(meta: &FlowMeta, content: Option<Bounds>) -> Scaffold {
    let definitions = XmlElement::new("bpmn2:definitions")
        .with_attr("xmlns:bpmn2", BPMN2_NS)
        .with_attr("xmlns:bpmndi", BPMNDI_NS)
        .with_attr("xmlns:dc", DC_NS)
        .with_attr("xmlns:di", DI_NS)
        .with_attr("xmlns:ifl", IFL_NS)
        .with_attr("xmlns:xsi", XSI_NS)
        .with_attr("id", "Definitions_1");

    let collaboration = XmlElement::new("bpmn2:collaboration")
        .with_attr("id", COLLABORATION_ID)
        .with_attr("name", "Default Collaboration")
        .with_child(
            XmlElement::new("bpmn2:extensionElements")
                .with_child(property("flowId", &meta.flow_id))
                .with_child(property("flowName", &meta.flow_name))
                .with_child(property("flowVersion", &meta.flow_version))
                .with_child(property("mappingTableVersion", &meta.table_version)),
        )
        .with_child(participant("Participant_Sender", "EndpointSender", "Sender", None))
        .with_child(participant(
            "Participant_Receiver",
            "EndpointRecevier",
            "Receiver",
            None,
        ))
        .with_child(participant(
            PROCESS_PARTICIPANT,
            "IntegrationProcess",
            "Integration Process",
            Some(PROCESS_ID),
        ));

    let process = XmlElement::new("bpmn2:process")
        .with_attr("id", PROCESS_ID)
        .with_attr("name", "Integration Process")
        .with_child(
            XmlElement::new("bpmn2:extensionElements")
                .with_child(property("transactionHandling", "None"))
                .with_child(property("transactionTimeout", "30")),
        );

    // Pool around all content, endpoints to its left and right.
    let content = content.unwrap_or(Bounds {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    });
    let pool = Bounds {
        x: content.x - POOL_PADDING,
        y: content.y - POOL_PADDING,
        width: content.width + 2.0 * POOL_PADDING,
        height: content.height + 2.0 * POOL_PADDING,
    };
    let endpoint_y = pool.y + (pool.height - ENDPOINT_HEIGHT) / 2.0;
    let sender = Bounds {
        x: pool.x - ENDPOINT_MARGIN - ENDPOINT_WIDTH,
        y: endpoint_y,
        width: ENDPOINT_WIDTH,
        height: ENDPOINT_HEIGHT,
    };
    let receiver = Bounds {
        x: pool.x + pool.width + ENDPOINT_MARGIN,
        ..sender
    };

    let plane = XmlElement::new("bpmndi:BPMNPlane")
        .with_attr("bpmnElement", COLLABORATION_ID)
        .with_attr("id", "BPMNPlane_1")
        .with_child(pool_shape(PROCESS_PARTICIPANT, &pool))
        .with_child(pool_shape("Participant_Sender", &sender))
        .with_child(pool_shape("Participant_Receiver", &receiver));

    Scaffold {
        definitions,
        collaboration,
        process,
        plane,
    }
}

impl Scaffold {
    /// Nests the parts into the final `bpmn2:definitions` tree.
    pub(crate) fn assemble(self) -> XmlElement {
        let diagram = XmlElement::new("bpmndi:BPMNDiagram")
            .with_attr("id", "BPMNDiagram_1")
            .with_attr("name", "Default Collaboration Diagram")
            .with_child(self.plane);
        self.definitions
            .with_child(self.collaboration)
            .with_child(self.process)
            .with_child(diagram)
    }
}

fn participant(id: &str, kind: &str, name: &str, process: Option<&str>) -> XmlElement {
    let mut element = XmlElement::new("bpmn2:participant")
        .with_attr("id", id)
        .with_attr("ifl:type", kind)
        .with_attr("name", name);
    if let Some(process) = process {
        element.set_attr("processRef", process);
    }
    element
}

fn pool_shape(element: &str, bounds: &Bounds) -> XmlElement {
    XmlElement::new("bpmndi:BPMNShape")
        .with_attr("bpmnElement", element)
        .with_attr("id", format!("BPMNShape_{}", element))
        .with_child(
            XmlElement::new("dc:Bounds")
                .with_attr("height", coordinate(bounds.height))
                .with_attr("width", coordinate(bounds.width))
                .with_attr("x", coordinate(bounds.x))
                .with_attr("y", coordinate(bounds.y)),
        )
}
