//! Common test fixtures: sample source documents and record builders.
use flowbridge::generator::{Document, TemplateGenerator};
use flowbridge::layout::{LayoutConfig, LayoutEngine, LayoutPositions};
use flowbridge::mapper::{MappingTable, TypeMapper};
use flowbridge::model::{ComponentModel, EdgeKind, ModelBuilder};
use flowbridge::record::{ComponentRecord, RecordLink, RecordRole};
use std::sync::Arc;

/// A Mule application with one HTTP-triggered flow and one sub-flow.
///
/// Flow `orders`: listener -> logger -> choice (EU: http request, otherwise:
/// set-payload) -> flow-ref `audit` -> end, plus an error handler that logs
/// and propagates.
#[allow(dead_code)]
pub const MULE_ORDERS_XML: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<mule xmlns="http://www.mulesoft.org/schema/mule/core"
      xmlns:http="http://www.mulesoft.org/schema/mule/http"
      xmlns:doc="http://www.mulesoft.org/schema/mule/documentation">
    <http:listener-config name="HTTP_Listener_config">
        <http:listener-connection host="0.0.0.0" port="8081"/>
    </http:listener-config>
    <flow name="orders">
        <http:listener doc:name="Receive order" config-ref="HTTP_Listener_config" path="/orders"/>
        <logger doc:name="Log order" message="#[payload.id]" level="INFO"/>
        <choice doc:name="Route by region">
            <when expression="#[vars.region == 'EU']">
                <http:request doc:name="Send to EU" method="PUT" url="https://eu.example.com/orders"/>
            </when>
            <otherwise>
                <set-payload doc:name="Reject" value="rejected"/>
            </otherwise>
        </choice>
        <flow-ref doc:name="Audit" name="audit"/>
        <error-handler>
            <on-error-propagate type="HTTP:CONNECTIVITY">
                <logger doc:name="Log failure" message="failed"/>
            </on-error-propagate>
        </error-handler>
    </flow>
    <sub-flow name="audit">
        <logger doc:name="Audit log" message="audited"/>
    </sub-flow>
</mule>
"##;

/// A Boomi process: start -> database query -> decision (true: map) -> stop.
#[allow(dead_code)]
pub const BOOMI_BILLING_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bns:Component xmlns:bns="http://api.platform.boomi.com/" componentId="c-1" name="Billing" type="process">
  <bns:object>
    <process>
      <shapes>
        <shape name="shape1" shapetype="start" userlabel="Start">
          <configuration><noaction/></configuration>
          <dragpoints><dragpoint name="shape1.dragpoint1" toShape="shape2"/></dragpoints>
        </shape>
        <shape name="shape2" shapetype="connectoraction" userlabel="Load invoices">
          <configuration>
            <connectoraction actionType="QUERY" connectorType="database"/>
          </configuration>
          <dragpoints><dragpoint name="shape2.dragpoint1" toShape="shape3"/></dragpoints>
        </shape>
        <shape name="shape3" shapetype="decision" userlabel="Has lines?">
          <dragpoints>
            <dragpoint identifier="true" name="shape3.dragpoint1" text="true" toShape="shape4"/>
            <dragpoint identifier="false" name="shape3.dragpoint2" text="false" toShape="shape5"/>
          </dragpoints>
        </shape>
        <shape name="shape4" shapetype="map" userlabel="Map invoice">
          <dragpoints><dragpoint name="shape4.dragpoint1" toShape="shape5"/></dragpoints>
        </shape>
        <shape name="shape5" shapetype="stop">
          <configuration><stop continue="true"/></configuration>
        </shape>
      </shapes>
    </process>
  </bns:object>
</bns:Component>
"#;

/// Document name that makes the webMethods parser name the flow `processOrder`.
#[allow(dead_code)]
pub const WEBMETHODS_DOCUMENT: &str = "orders/processOrder/flow.xml";

/// A webMethods flow service with a branch and a repeat loop.
#[allow(dead_code)]
pub const WEBMETHODS_ORDER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<FLOW VERSION="3.0" CLEANUP="true">
  <COMMENT></COMMENT>
  <INVOKE SERVICE="pub.flow:debugLog" VALIDATE-IN="$none" VALIDATE-OUT="$none">
    <COMMENT>Log the request</COMMENT>
  </INVOKE>
  <BRANCH SWITCH="/status" NAME="Check status">
    <SEQUENCE NAME="OK">
      <INVOKE SERVICE="pub.client:http"/>
    </SEQUENCE>
    <SEQUENCE NAME="$default">
      <EXIT FROM="$flow" SIGNAL="FAILURE"/>
    </SEQUENCE>
  </BRANCH>
  <REPEAT COUNT="3">
    <MAP MODE="STANDALONE">
      <MAPSET FIELD="/attempt;1;0"><DATA><Values><value name="xml">1</value></Values></DATA></MAPSET>
    </MAP>
  </REPEAT>
</FLOW>
"#;

/// A hinted record with no dialect.
#[allow(dead_code)]
pub fn step(id: &str, source_type: &str) -> ComponentRecord {
    ComponentRecord::hint(id, id, source_type)
}

#[allow(dead_code)]
pub fn start(id: &str) -> ComponentRecord {
    ComponentRecord::hint(id, "Start", "listener").with_role(RecordRole::Start)
}

#[allow(dead_code)]
pub fn end(id: &str) -> ComponentRecord {
    ComponentRecord::hint(id, "End", "end").with_role(RecordRole::End)
}

/// `start -> http_call -> end`, where `http_call` has a type no table knows.
#[allow(dead_code)]
pub fn three_node_records() -> Vec<ComponentRecord> {
    vec![
        start("start").link_to("http_call"),
        ComponentRecord::hint("http_call", "Call backend", "HttpListener").link_to("end"),
        end("end"),
    ]
}

/// A start and an end joined by a sequence and an error connector.
#[allow(dead_code)]
pub fn parallel_edge_records() -> Vec<ComponentRecord> {
    vec![
        start("s")
            .link_to("e")
            .with_link(RecordLink::new("e", EdgeKind::Error)),
        end("e"),
    ]
}

#[allow(dead_code)]
pub fn build(records: &[ComponentRecord]) -> ComponentModel {
    ModelBuilder::new().build(records).unwrap()
}

/// Builds and maps a model with the built-in table.
#[allow(dead_code)]
pub fn mapped(records: &[ComponentRecord]) -> ComponentModel {
    let mut model = build(records);
    mapper().map_model(&mut model);
    model
}

#[allow(dead_code)]
pub fn mapper() -> TypeMapper {
    TypeMapper::new(Arc::new(MappingTable::builtin().unwrap()))
}

#[allow(dead_code)]
pub fn layout(model: &ComponentModel) -> LayoutPositions {
    LayoutEngine::new(LayoutConfig::default())
        .layout(model)
        .unwrap()
}

/// Runs build, map, layout and generate over `records`.
#[allow(dead_code)]
pub fn generate(records: &[ComponentRecord]) -> Document {
    let model = mapped(records);
    let positions = layout(&model);
    TemplateGenerator::new().generate(&model, &positions).unwrap()
}
