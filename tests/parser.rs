//! Tests for the source dialect parsers.
mod common;
use common::*;
use flowbridge::model::EdgeKind;
use flowbridge::parser::{ParseOptions, ParserRegistry, parse};
use flowbridge::prelude::*;

fn record<'a>(records: &'a [ComponentRecord], id: &str) -> &'a ComponentRecord {
    records
        .iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| panic!("no record '{}'", id))
}

#[cfg(test)]
mod mule_tests {
    use super::*;

    #[test]
    fn test_flow_becomes_a_chain_of_records() {
        let output = parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml");
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);

        let ids: Vec<&str> = output.records.iter().map(|r| r.id.as_str()).collect();
        for expected in [
            "orders/0",
            "orders/1",
            "orders/2",
            "orders/3",
            "orders/4",
            "orders/5",
            "orders/6",
            "orders/end",
            "orders/error-end-0",
            "audit/0",
        ] {
            assert!(ids.contains(&expected), "missing {} in {:?}", expected, ids);
        }
        assert_eq!(output.records.len(), 10);

        let listener = record(&output.records, "orders/0");
        assert_eq!(listener.role, RecordRole::Start);
        assert_eq!(listener.source_type, "http:listener");
        assert_eq!(listener.name, "Receive order");
        assert_eq!(record(&output.records, "orders/end").role, RecordRole::End);
    }

    #[test]
    fn test_source_types_are_kept_verbatim() {
        let output = parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml");
        assert_eq!(record(&output.records, "orders/3").source_type, "http:request");
        assert_eq!(record(&output.records, "orders/4").source_type, "set-payload");
        assert_eq!(record(&output.records, "orders/5").source_type, "flow-ref");
    }

    #[test]
    fn test_simple_expressions_become_references() {
        let output = parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml");
        let logger = record(&output.records, "orders/1");
        assert_eq!(
            logger.config.get("message"),
            Some(&ConfigValue::reference("payload/id"))
        );
        assert_eq!(logger.config.get("level"), Some(&ConfigValue::literal("INFO")));
        assert!(!logger.config.contains_key("doc:name"));
    }

    #[test]
    fn test_config_ref_pulls_in_global_config() {
        let output = parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml");
        let listener = record(&output.records, "orders/0");
        assert!(
            listener
                .config
                .keys()
                .any(|k| k.starts_with("config.") && k.ends_with("port")),
            "{:?}",
            listener.config.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_choice_branches_carry_conditions() {
        let output = parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml");
        let choice = record(&output.records, "orders/2");
        let when = choice
            .links
            .iter()
            .find(|l| l.target == "orders/3")
            .unwrap();
        assert_eq!(when.condition.as_deref(), Some("#[vars.region == 'EU']"));
        let otherwise = choice
            .links
            .iter()
            .find(|l| l.target == "orders/4")
            .unwrap();
        assert_eq!(otherwise.condition, None);
    }

    #[test]
    fn test_flow_ref_and_error_handler_links() {
        let output = parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml");
        let flow_ref = record(&output.records, "orders/5");
        assert!(
            flow_ref
                .links
                .iter()
                .any(|l| l.target == "audit/0" && l.kind == EdgeKind::Reference)
        );

        let listener = record(&output.records, "orders/0");
        let error = listener
            .links
            .iter()
            .find(|l| l.kind == EdgeKind::Error)
            .unwrap();
        assert_eq!(error.target, "orders/6");
        assert_eq!(error.condition.as_deref(), Some("HTTP:CONNECTIVITY"));

        let failure_log = record(&output.records, "orders/6");
        assert!(
            failure_log
                .links
                .iter()
                .any(|l| l.target == "orders/error-end-0")
        );
    }

    #[test]
    fn test_raw_content_is_retained() {
        let output = parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml");
        assert!(
            record(&output.records, "orders/3")
                .raw_content
                .contains("<http:request")
        );
    }

    #[test]
    fn test_unnamed_flow_is_reported_and_skipped() {
        let xml = r#"<mule>
            <flow><logger message="a"/></flow>
            <flow name="kept"><logger message="b"/></flow>
        </mule>"#;
        let output = parse(xml.as_bytes(), DialectId::Mule, "partial.xml");
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].id, "kept/0");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].kind, DiagnosticKind::ParseError);
        assert!(
            output.diagnostics[0]
                .location
                .as_deref()
                .unwrap()
                .starts_with("partial.xml:2:")
        );
    }

    #[test]
    fn test_wrong_root_yields_no_records() {
        let output = parse(b"<beans/>", DialectId::Mule, "beans.xml");
        assert!(output.records.is_empty());
        assert_eq!(output.diagnostics.len(), 1);
    }
}

#[cfg(test)]
mod boomi_tests {
    use super::*;

    #[test]
    fn test_shapes_become_records() {
        let output = parse(BOOMI_BILLING_XML.as_bytes(), DialectId::Boomi, "billing.xml");
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        assert_eq!(output.records.len(), 5);

        assert_eq!(record(&output.records, "shape1").role, RecordRole::Start);
        assert_eq!(record(&output.records, "shape5").role, RecordRole::End);

        let query = record(&output.records, "shape2");
        assert_eq!(query.source_type, "connectoraction");
        assert_eq!(query.variant.as_deref(), Some("database"));
        assert_eq!(query.name, "Load invoices");
    }

    #[test]
    fn test_dragpoints_become_conditional_links() {
        let output = parse(BOOMI_BILLING_XML.as_bytes(), DialectId::Boomi, "billing.xml");
        let decision = record(&output.records, "shape3");
        let targets: Vec<(&str, Option<&str>)> = decision
            .links
            .iter()
            .map(|l| (l.target.as_str(), l.condition.as_deref()))
            .collect();
        assert_eq!(
            targets,
            vec![("shape4", Some("true")), ("shape5", Some("false"))]
        );
    }

    #[test]
    fn test_shape_without_type_is_skipped_with_its_links() {
        let xml = r#"<bns:Component xmlns:bns="http://api.platform.boomi.com/" type="process">
          <bns:object><process><shapes>
            <shape name="shape1" shapetype="start">
              <dragpoints>
                <dragpoint toShape="shape2"/>
                <dragpoint toShape="shape3"/>
              </dragpoints>
            </shape>
            <shape name="shape2"/>
            <shape name="shape3" shapetype="stop"/>
          </shapes></process></bns:object>
        </bns:Component>"#;
        let output = parse(xml.as_bytes(), DialectId::Boomi, "broken.xml");
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.diagnostics.len(), 1);
        let start = record(&output.records, "shape1");
        assert_eq!(start.links.len(), 1);
        assert_eq!(start.links[0].target, "shape3");
    }

    #[test]
    fn test_non_process_component_is_rejected() {
        let xml = r#"<bns:Component xmlns:bns="http://api.platform.boomi.com/" type="connector-settings"/>"#;
        let output = parse(xml.as_bytes(), DialectId::Boomi, "settings.xml");
        assert!(output.records.is_empty());
        assert_eq!(output.diagnostics.len(), 1);
    }
}

#[cfg(test)]
mod webmethods_tests {
    use super::*;

    #[test]
    fn test_steps_get_sequential_ids() {
        let output = parse(
            WEBMETHODS_ORDER_XML.as_bytes(),
            DialectId::WebMethods,
            WEBMETHODS_DOCUMENT,
        );
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        let ids: Vec<&str> = output.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["start", "step1", "step2", "step3", "step4", "step5", "step6", "end"]
        );
        assert_eq!(record(&output.records, "start").name, "processOrder");
        assert_eq!(
            record(&output.records, "step1").variant.as_deref(),
            Some("pub.flow:debugLog")
        );
    }

    #[test]
    fn test_exit_from_flow_ends_it() {
        let output = parse(
            WEBMETHODS_ORDER_XML.as_bytes(),
            DialectId::WebMethods,
            WEBMETHODS_DOCUMENT,
        );
        let exit = record(&output.records, "step4");
        assert_eq!(exit.role, RecordRole::End);
        assert_eq!(exit.variant.as_deref(), Some("FAILURE"));
        assert!(exit.links.is_empty());
    }

    #[test]
    fn test_repeat_body_loops_back() {
        let output = parse(
            WEBMETHODS_ORDER_XML.as_bytes(),
            DialectId::WebMethods,
            WEBMETHODS_DOCUMENT,
        );
        let repeat = record(&output.records, "step5");
        assert!(repeat.links.iter().any(|l| l.target == "step6"));
        assert!(repeat.links.iter().any(|l| l.target == "end"));
        let body = record(&output.records, "step6");
        assert!(body.links.iter().any(|l| l.target == "step5"));
    }

    #[test]
    fn test_pipeline_paths_become_references() {
        let output = parse(
            WEBMETHODS_ORDER_XML.as_bytes(),
            DialectId::WebMethods,
            WEBMETHODS_DOCUMENT,
        );
        let branch = record(&output.records, "step2");
        assert_eq!(
            branch.config.get("SWITCH"),
            Some(&ConfigValue::reference("status"))
        );
        let map = record(&output.records, "step6");
        assert_eq!(
            map.config.get("map.attempt"),
            Some(&ConfigValue::literal("1"))
        );
    }

    #[test]
    fn test_unknown_steps_are_reported() {
        let xml = r#"<FLOW><INVOKE SERVICE="a:b"/><TELEPORT/></FLOW>"#;
        let output = parse(xml.as_bytes(), DialectId::WebMethods, "x/flow.xml");
        assert_eq!(output.records.len(), 3);
        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.diagnostics[0].message.contains("TELEPORT"));
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    #[test]
    fn test_malformed_document_keeps_what_was_read() {
        let xml = "<mule>\n  <flow name=\"a\">\n    <logger message=\"x\"/>\n  </flow>\n  <flow name=\"b\">\n</mule>";
        let output = parse(xml.as_bytes(), DialectId::Mule, "bad.xml");
        assert!(output.records.iter().any(|r| r.id == "a/0"));
        let error = output
            .diagnostics
            .iter()
            .find(|d| d.kind == DiagnosticKind::ParseError)
            .unwrap();
        assert_eq!(error.severity, Severity::Warning);
        assert!(error.location.as_deref().unwrap().starts_with("bad.xml:"));
    }

    #[test]
    fn test_bad_element_does_not_hide_later_flows() {
        let xml = "<mule>\n  <flow name=\"a\">\n    <logger message=\"x\"></loger>\n  </flow>\n  <flow name=\"b\">\n    <logger message=\"y\"/>\n  </flow>\n</mule>";
        let output = parse(xml.as_bytes(), DialectId::Mule, "bad.xml");
        let ids: Vec<&str> = output.records.iter().map(|r| r.id.as_str()).collect();
        assert!(ids.contains(&"a/0"), "{:?}", ids);
        assert!(ids.contains(&"b/0"), "{:?}", ids);

        let stray = output
            .diagnostics
            .iter()
            .find(|d| d.message.contains("</loger>"))
            .unwrap();
        assert_eq!(stray.kind, DiagnosticKind::ParseError);
        assert_eq!(stray.location.as_deref(), Some("bad.xml:3:25"));
    }

    #[test]
    fn test_oversized_document_is_rejected() {
        let registry = ParserRegistry::new().with_options(ParseOptions {
            max_document_bytes: 16,
        });
        let output = registry.parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "big.xml");
        assert!(output.records.is_empty());
        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.diagnostics[0].message.contains("limit"));
    }

    #[test]
    fn test_invalid_utf8_is_rejected_with_location() {
        let bytes = b"<mule>\n<flow name=\"\xff\"/></mule>";
        let output = parse(bytes, DialectId::Mule, "latin1.xml");
        assert!(output.records.is_empty());
        assert_eq!(
            output.diagnostics[0].location.as_deref(),
            Some("latin1.xml:2:13")
        );
    }

    #[test]
    fn test_missing_parser_is_fatal() {
        let output = ParserRegistry::empty().parse(b"<mule/>", DialectId::Mule, "a.xml");
        assert!(output.diagnostics[0].is_fatal());
        assert!(!ParserRegistry::empty().supports(DialectId::Mule));
        assert!(ParserRegistry::new().supports(DialectId::Boomi));
    }
}
