//! Tests for document validation and repair.
mod common;
use common::*;
use flowbridge::generator::{diagram_edge, property, property_value, sequence_flow};
use flowbridge::layout::Point;
use flowbridge::parser::parse;
use flowbridge::prelude::*;
use flowbridge::repair::{RepairCheck, validate_and_repair};
use flowbridge::xml::XmlElement;

fn node_mut<'a>(document: &'a mut Document, id: &str) -> &'a mut XmlElement {
    document
        .process_mut()
        .unwrap()
        .elements_mut()
        .find(|e| e.attr("id") == Some(id))
        .unwrap()
}

fn extension_mut<'a>(document: &'a mut Document, id: &str) -> &'a mut XmlElement {
    node_mut(document, id).find_mut("extensionElements").unwrap()
}

fn drop_property(document: &mut Document, id: &str, key: &str) {
    extension_mut(document, id).retain_elements(|p| {
        p.find("key").map(XmlElement::text).as_deref() != Some(key)
    });
}

/// `start -> a -> end` plus a logger nothing links to.
fn records_with_orphan() -> Vec<ComponentRecord> {
    vec![
        start("start").link_to("a"),
        step("a", "logger").link_to("end"),
        end("end"),
        step("orphan", "logger"),
    ]
}

#[cfg(test)]
mod connector_tests {
    use super::*;

    #[test]
    fn test_clean_document_needs_no_repairs() {
        let document = generate(&three_node_records());
        let (repaired, report) = RepairPass::new().run(document.clone());
        assert!(report.is_empty(), "{:?}", report);
        assert_eq!(repaired, document);
    }

    #[test]
    fn test_dangling_connector_is_dropped() {
        let mut document = generate(&three_node_records());
        document.process_mut().unwrap().push_child(sequence_flow(
            "SequenceFlow_9",
            "http_call",
            "ghost",
            EdgeKind::Sequence,
            None,
        ));
        document.plane_mut().unwrap().push_child(diagram_edge(
            "SequenceFlow_9",
            "http_call",
            "ghost",
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
        ));

        let (repaired, report) = validate_and_repair(document);
        assert!(!report.has_fatal());
        assert_eq!(repaired.sequence_flows().count(), 2);
        assert!(
            report
                .entries()
                .iter()
                .any(|d| d.kind == DiagnosticKind::RepairApplied
                    && d.message.contains("SequenceFlow_9"))
        );
        let plane = repaired.plane().unwrap();
        assert!(
            plane
                .find_all("BPMNEdge")
                .all(|e| e.attr("bpmnElement") != Some("SequenceFlow_9"))
        );
    }

    #[test]
    fn test_refs_follow_the_connectors() {
        let mut document = generate(&three_node_records());
        let call = node_mut(&mut document, "http_call");
        call.retain_elements(|e| e.local_name() != "incoming");
        call.push_child(XmlElement::text_element("bpmn2:outgoing", "SequenceFlow_77"));

        let (repaired, report) = validate_and_repair(document);
        assert_eq!(report.of_kind(DiagnosticKind::RepairApplied).count(), 2);
        let call = repaired
            .flow_nodes()
            .find(|e| e.attr("id") == Some("http_call"))
            .unwrap();
        let refs: Vec<(String, String)> = call
            .elements()
            .filter(|e| matches!(e.local_name(), "incoming" | "outgoing"))
            .map(|e| (e.local_name().to_string(), e.text()))
            .collect();
        assert_eq!(
            refs,
            vec![
                ("incoming".to_string(), "SequenceFlow_1".to_string()),
                ("outgoing".to_string(), "SequenceFlow_2".to_string()),
            ]
        );
    }

    #[test]
    fn test_unconnected_node_is_attached_to_the_start() {
        let document = generate(&records_with_orphan());
        let (repaired, report) = validate_and_repair(document);

        assert!(!report.has_fatal());
        let attached: Vec<&Diagnostic> = report.of_kind(DiagnosticKind::RepairApplied).collect();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].node_id.as_deref(), Some("orphan"));

        let flow = repaired
            .sequence_flows()
            .find(|f| f.attr("id") == Some("SequenceFlow_repair_orphan"))
            .unwrap();
        assert_eq!(flow.attr("sourceRef"), Some("start"));
        assert_eq!(flow.attr("targetRef"), Some("orphan"));
        assert!(
            repaired
                .plane()
                .unwrap()
                .find_all("BPMNEdge")
                .any(|e| e.attr("bpmnElement") == Some("SequenceFlow_repair_orphan"))
        );
    }

    #[test]
    fn test_ancestors_of_the_start_count_as_connected() {
        let mut records = records_with_orphan();
        records.pop();
        records.push(step("feeder", "logger").link_to("start"));
        let (_, report) = validate_and_repair(generate(&records));
        assert!(report.is_empty(), "{:?}", report);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;

    #[test]
    fn test_missing_mandatory_property_is_inserted() {
        let mut document = generate(&three_node_records());
        drop_property(&mut document, "http_call", "address");

        let (repaired, report) = validate_and_repair(document);
        assert_eq!(report.len(), 1);
        assert_eq!(report.entries()[0].node_id.as_deref(), Some("http_call"));
        let call = repaired
            .flow_nodes()
            .find(|e| e.attr("id") == Some("http_call"))
            .unwrap();
        assert_eq!(property_value(call, "address").as_deref(), Some("/"));
    }

    #[test]
    fn test_empty_mandatory_property_is_filled() {
        let mut document = generate(&three_node_records());
        drop_property(&mut document, "http_call", "httpMethod");
        extension_mut(&mut document, "http_call").push_child(property("httpMethod", ""));

        let (repaired, report) = validate_and_repair(document);
        assert_eq!(report.count(Severity::Info), 1);
        let call = repaired
            .flow_nodes()
            .find(|e| e.attr("id") == Some("http_call"))
            .unwrap();
        assert_eq!(property_value(call, "httpMethod").as_deref(), Some("POST"));
    }

    #[test]
    fn test_component_type_is_inferred_from_the_tag() {
        let mut document = generate(&three_node_records());
        drop_property(&mut document, "http_call", "componentType");
        drop_property(&mut document, "http_call", "activityType");

        let (repaired, report) = validate_and_repair(document);
        assert_eq!(report.len(), 2);
        let call = repaired
            .flow_nodes()
            .find(|e| e.attr("id") == Some("http_call"))
            .unwrap();
        assert_eq!(property_value(call, "componentType").as_deref(), Some("request_reply"));
        assert_eq!(property_value(call, "activityType").as_deref(), Some("ExternalCall"));
    }

    #[test]
    fn test_conflicting_component_types_are_fatal() {
        let mut document = generate(&three_node_records());
        extension_mut(&mut document, "http_call").push_child(property("componentType", "logger"));

        let (_, report) = validate_and_repair(document);
        assert!(report.has_fatal());
        let defect = report.fatal().next().unwrap();
        assert_eq!(defect.kind, DiagnosticKind::UnrepairableDefect);
        assert_eq!(defect.node_id.as_deref(), Some("http_call"));
    }

    #[test]
    fn test_conflicting_mandatory_values_are_fatal() {
        let mut document = generate(&three_node_records());
        extension_mut(&mut document, "http_call").push_child(property("address", "/other"));
        let (_, report) = validate_and_repair(document);
        assert_eq!(report.fatal().count(), 1);
    }
}

#[cfg(test)]
mod start_tests {
    use super::*;

    #[test]
    fn test_missing_start_is_fatal() {
        let mut document = generate(&three_node_records());
        document
            .process_mut()
            .unwrap()
            .retain_elements(|e| e.local_name() != "startEvent");

        let (repaired, report) = validate_and_repair(document);
        assert!(report.has_fatal());
        assert!(report.fatal().any(|d| d.message.contains("no start event")));
        // The connector from the removed start is gone too.
        assert_eq!(repaired.sequence_flows().count(), 1);
    }

    #[test]
    fn test_several_starts_are_fatal() {
        let mut document = generate(&three_node_records());
        let mut second = node_mut(&mut document, "start").clone();
        second.set_attr("id", "start_2");
        second.retain_elements(|e| e.local_name() != "outgoing");
        document.process_mut().unwrap().push_child(second);

        let (_, report) = validate_and_repair(document);
        let defects: Vec<&Diagnostic> = report.fatal().collect();
        assert_eq!(defects.len(), 1);
        assert!(defects[0].message.contains("2 start events"));
    }

    #[test]
    fn test_document_without_process_is_fatal() {
        let document = Document::new(XmlElement::new("bpmn2:definitions"));
        let (_, report) = validate_and_repair(document);
        assert!(report.has_fatal());
    }
}

#[cfg(test)]
mod pass_tests {
    use super::*;

    /// Flags every node whose name is still the default.
    struct NamedNodesCheck;

    impl RepairCheck for NamedNodesCheck {
        fn name(&self) -> &'static str {
            "named-nodes"
        }

        fn apply(&self, document: &mut Document, report: &mut Report) {
            for node in document.flow_nodes() {
                if node.attr("name").map_or(true, str::is_empty) {
                    report.push(
                        Diagnostic::new(
                            Severity::Warning,
                            DiagnosticKind::UnrepairableDefect,
                            Stage::Repair,
                            "Unnamed node",
                        )
                        .with_node(node.attr("id").unwrap_or_default()),
                    );
                }
            }
        }
    }

    #[test]
    fn test_custom_checks_run_after_the_builtin_ones() {
        let pass = RepairPass::new().with_check(Box::new(NamedNodesCheck));
        assert_eq!(
            pass.check_names(),
            vec![
                "dangling-connector",
                "unconnected-node",
                "mandatory-properties",
                "start-count",
                "named-nodes",
            ]
        );
        let (_, report) = pass.run(generate(&three_node_records()));
        assert!(report.is_empty());
    }

    #[test]
    fn test_repair_is_idempotent() {
        let mut broken = generate(&records_with_orphan());
        drop_property(&mut broken, "a", "level");
        let documents = vec![
            broken,
            generate(&parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml").records),
            generate(&parse(BOOMI_BILLING_XML.as_bytes(), DialectId::Boomi, "billing.xml").records),
            generate(
                &parse(
                    WEBMETHODS_ORDER_XML.as_bytes(),
                    DialectId::WebMethods,
                    WEBMETHODS_DOCUMENT,
                )
                .records,
            ),
        ];
        for document in documents {
            let (once, _) = validate_and_repair(document);
            let (twice, report) = validate_and_repair(once.clone());
            assert!(report.is_empty(), "{:?}", report);
            assert_eq!(
                once.to_xml_string().unwrap(),
                twice.to_xml_string().unwrap()
            );
        }
    }
}
