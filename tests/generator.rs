//! Tests for target document generation.
mod common;
use common::*;
use flowbridge::error::GenerateError;
use flowbridge::generator::templates::flow_element;
use flowbridge::generator::{
    ComponentTemplate, FlowMeta, Rendered, TemplateSpec, property_value, templates,
};
use flowbridge::layout::NodePosition;
use flowbridge::parser::parse;
use flowbridge::prelude::*;

fn mule_model() -> ComponentModel {
    mapped(&parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml").records)
}

fn element<'a>(document: &'a Document, id: &str) -> &'a flowbridge::xml::XmlElement {
    document
        .flow_nodes()
        .find(|e| e.attr("id") == Some(id))
        .unwrap_or_else(|| panic!("no flow node '{}'", id))
}

/// Logs through an audit sink instead of the standard logger.
struct AuditLoggerTemplate;

impl AuditLoggerTemplate {
    const SPEC: TemplateSpec = TemplateSpec {
        target: TargetType::Logger,
        tag: "callActivity",
        activity_type: "AuditLogger",
        event_definition: None,
        mandatory: &[("level", "DEBUG"), ("sink", "audit")],
    };
}

impl ComponentTemplate for AuditLoggerTemplate {
    fn target_type(&self) -> TargetType {
        TargetType::Logger
    }

    fn render(&self, node: &CanonicalNode, position: &NodePosition) -> Rendered {
        Rendered {
            element: flow_element(&Self::SPEC, node),
            shape: templates::shape_element(&node.node_id, position),
        }
    }
}

#[cfg(test)]
mod document_tests {
    use super::*;

    #[test]
    fn test_document_has_scaffold_nodes_and_connectors() {
        let document = generate(&three_node_records());
        let root = document.root();
        assert_eq!(root.name, "bpmn2:definitions");
        assert!(root.find("collaboration").is_some());
        assert!(document.plane().is_some());

        let tags: Vec<&str> = document.flow_nodes().map(|e| e.local_name()).collect();
        assert_eq!(tags, vec!["startEvent", "serviceTask", "endEvent"]);
        assert_eq!(document.sequence_flows().count(), 2);

        let flow = document.sequence_flows().next().unwrap();
        assert_eq!(flow.attr("id"), Some("SequenceFlow_1"));
        assert_eq!(flow.attr("sourceRef"), Some("start"));
        assert_eq!(flow.attr("targetRef"), Some("http_call"));
    }

    #[test]
    fn test_every_node_and_connector_is_drawn() {
        let document = generate(&parse(BOOMI_BILLING_XML.as_bytes(), DialectId::Boomi, "billing.xml").records);
        let plane = document.plane().unwrap();
        for node in document.flow_nodes() {
            let id = node.attr("id").unwrap();
            assert!(
                plane
                    .find_all("BPMNShape")
                    .any(|s| s.attr("bpmnElement") == Some(id)),
                "{} has no shape",
                id
            );
        }
        for flow in document.sequence_flows() {
            let id = flow.attr("id").unwrap();
            let edge = plane
                .find_all("BPMNEdge")
                .find(|e| e.attr("bpmnElement") == Some(id))
                .unwrap();
            assert!(edge.find_all("waypoint").count() >= 2);
        }
    }

    #[test]
    fn test_incoming_and_outgoing_refs_match_connectors() {
        let document = generate(&three_node_records());
        let call = element(&document, "http_call");
        let incoming: Vec<String> = call.find_all("incoming").map(|e| e.text()).collect();
        let outgoing: Vec<String> = call.find_all("outgoing").map(|e| e.text()).collect();
        assert_eq!(incoming, vec!["SequenceFlow_1"]);
        assert_eq!(outgoing, vec!["SequenceFlow_2"]);
    }

    #[test]
    fn test_conditions_are_written_on_connectors() {
        let document = generate(&parse(BOOMI_BILLING_XML.as_bytes(), DialectId::Boomi, "billing.xml").records);
        let conditional = document
            .sequence_flows()
            .find(|f| f.attr("name") == Some("true"))
            .unwrap();
        assert_eq!(conditional.attr("targetRef"), Some("shape4"));
        assert_eq!(conditional.find("conditionExpression").unwrap().text(), "true");
    }

    #[test]
    fn test_generation_is_byte_identical() {
        let records = parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml").records;
        let first = generate(&records).to_xml_string().unwrap();
        let second = generate(&records).to_xml_string().unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("<?xml"));
    }

    #[test]
    fn test_unresolved_nodes_are_rejected() {
        let model = build(&three_node_records());
        let positions = layout(&model);
        match TemplateGenerator::new().generate(&model, &positions) {
            Err(GenerateError::UnresolvedType(id)) => assert_eq!(id, "start"),
            other => panic!("expected UnresolvedType, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_position_is_an_error() {
        let model = mapped(&three_node_records());
        let mut positions = layout(&model);
        positions.nodes.shift_remove("end");
        assert!(matches!(
            TemplateGenerator::new().generate(&model, &positions),
            Err(GenerateError::MissingPosition(id)) if id == "end"
        ));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;

    #[test]
    fn test_mandatory_properties_get_defaults() {
        let document = generate(&three_node_records());
        let call = element(&document, "http_call");
        assert_eq!(property_value(call, "componentType").as_deref(), Some("request_reply"));
        assert_eq!(property_value(call, "activityType").as_deref(), Some("ExternalCall"));
        assert_eq!(property_value(call, "address").as_deref(), Some("/"));
        assert_eq!(property_value(call, "httpMethod").as_deref(), Some("POST"));
    }

    #[test]
    fn test_source_values_override_defaults() {
        let model = mule_model();
        let document = TemplateGenerator::new()
            .generate(&model, &layout(&model))
            .unwrap();
        let request = element(&document, "orders_3");
        assert_eq!(
            property_value(request, "address").as_deref(),
            Some("https://eu.example.com/orders")
        );
        assert_eq!(property_value(request, "httpMethod").as_deref(), Some("PUT"));

        let logger = element(&document, "orders_1");
        assert_eq!(property_value(logger, "message").as_deref(), Some("${payload/id}"));
        assert_eq!(property_value(logger, "level").as_deref(), Some("INFO"));
    }

    #[test]
    fn test_custom_template_replaces_builtin() {
        let model = mule_model();
        let generator = TemplateGenerator::builder()
            .with_custom_template(Box::new(AuditLoggerTemplate))
            .build();
        let document = generator.generate(&model, &layout(&model)).unwrap();

        let logger = element(&document, "audit_0");
        assert_eq!(property_value(logger, "activityType").as_deref(), Some("AuditLogger"));
        assert_eq!(property_value(logger, "level").as_deref(), Some("DEBUG"));
        assert_eq!(property_value(logger, "sink").as_deref(), Some("audit"));
        // Other types still use the built-in templates.
        let request = element(&document, "orders_3");
        assert_eq!(property_value(request, "activityType").as_deref(), Some("ExternalCall"));
    }

    #[test]
    fn test_error_end_has_error_definition() {
        let document = generate(&parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml").records);
        let error_end = element(&document, "orders_error-end-0");
        assert_eq!(error_end.local_name(), "endEvent");
        assert!(error_end.find("errorEventDefinition").is_some());
    }
}

#[cfg(test)]
mod manifest_tests {
    use super::*;

    #[test]
    fn test_manifest_counts_and_metadata() {
        let model = mule_model();
        let meta = FlowMeta {
            flow_id: "orders".to_string(),
            flow_name: "Order Intake".to_string(),
            flow_version: "2.1.0".to_string(),
            table_version: "2024.2".to_string(),
        };
        let flow = TemplateGenerator::new()
            .generate_flow(&model, &layout(&model), &meta)
            .unwrap();
        let manifest = &flow.manifest;
        assert_eq!(manifest.flow_id, "orders");
        assert_eq!(manifest.node_count, model.node_count());
        assert_eq!(manifest.edge_count, model.edge_count());
        assert_eq!(manifest.component_types.get(&TargetType::Logger), Some(&3));
        assert_eq!(manifest.component_types.values().sum::<usize>(), 10);

        let json = manifest.to_json().unwrap();
        assert!(json.contains("\"flow_version\": \"2.1.0\""));
        assert!(json.contains("\"logger\": 3"));

        let collaboration = flow.document.root().find("collaboration").unwrap();
        assert_eq!(
            property_value(collaboration, "mappingTableVersion").as_deref(),
            Some("2024.2")
        );
    }

    #[test]
    fn test_recount_agrees_with_generation() {
        let model = mule_model();
        let flow = TemplateGenerator::new()
            .generate_flow(&model, &layout(&model), &FlowMeta::default())
            .unwrap();
        let mut recounted = flow.manifest.clone();
        recounted.node_count = 0;
        recounted.component_types.clear();
        recounted.recount(&flow.document);
        assert_eq!(recounted.node_count, flow.manifest.node_count);
        assert_eq!(recounted.edge_count, flow.manifest.edge_count);
        let mut expected: Vec<_> = flow.manifest.component_types.iter().collect();
        let mut actual: Vec<_> = recounted.component_types.iter().collect();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
    }
}
