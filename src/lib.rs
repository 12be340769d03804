//! # Flowbridge - iPaaS Flow Transpiler
//!
//! **Flowbridge** converts integration flows written for one iPaaS vendor
//! (Mule, Boomi, webMethods) into the BPMN-based integration-flow XML of
//! another. Every vendor dialect is first lowered into a canonical
//! [`ComponentModel`](model::ComponentModel), so adding a source dialect
//! never touches the target side.
//!
//! ## Core Workflow
//!
//! A flow passes through six stages, each consuming the complete output of
//! the previous one:
//!
//! 1.  **Parse**: A dialect parser turns each source document into
//!     [`ComponentRecord`](record::ComponentRecord)s. Malformed documents are
//!     reported, never silently dropped.
//! 2.  **Build**: The [`ModelBuilder`](model::ModelBuilder) merges records into
//!     one graph and resolves their links into typed edges.
//! 3.  **Map**: The [`TypeMapper`](mapper::TypeMapper) assigns every node a
//!     target type from a versioned mapping table, falling back to keyword
//!     heuristics and finally to a generic passthrough.
//! 4.  **Layout**: The [`LayoutEngine`](layout::LayoutEngine) places nodes
//!     left to right by rank and routes connectors orthogonally.
//! 5.  **Generate**: The [`TemplateGenerator`](generator::TemplateGenerator)
//!     renders each node through the template for its target type.
//! 6.  **Repair**: The [`RepairPass`](repair::RepairPass) fixes structural
//!     defects it can fix and reports the rest.
//!
//! Every stage adds to one [`Report`](report::Report). Warnings never stop a
//! flow; a fatal diagnostic stops it with a [`PipelineError`](error::PipelineError)
//! that carries the full report.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowbridge::prelude::*;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let xml = r#"<mule xmlns:http="http://www.mulesoft.org/schema/mule/http">
//!         <flow name="orders">
//!             <http:listener path="/orders"/>
//!             <logger message="received"/>
//!             <http:request method="POST" url="https://erp.example.com/orders"/>
//!         </flow>
//!     </mule>"#;
//!
//!     let pipeline = Pipeline::builder().build()?;
//!     let bundle = FlowBundle::new("orders", "Order Intake")
//!         .with_document(SourceDocument::new("orders.xml", DialectId::Mule, xml));
//!
//!     let output = pipeline.run(&bundle)?;
//!     assert!(!output.report.has_fatal());
//!     assert_eq!(output.manifest.node_count, 4);
//!
//!     let target_xml = output.document.to_xml_string()?;
//!     assert!(target_xml.contains("bpmn2:startEvent"));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod generator;
pub mod layout;
pub mod mapper;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod prelude;
pub mod record;
pub mod repair;
pub mod report;
pub mod xml;
