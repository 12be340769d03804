//! Prelude module for convenient imports
//!
//! This module re-exports the types needed to configure and run a pipeline
//! and to inspect what it produced.
//!
//! # Example
//!
//! ```rust,no_run
//! use flowbridge::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let config = PipelineConfig::load(Path::new("flowbridge.toml"))?;
//! let pipeline = Pipeline::builder().with_config(config).build()?;
//!
//! let xml = std::fs::read("process.xml")?;
//! let bundle = FlowBundle::new("billing", "Billing")
//!     .with_document(SourceDocument::new("process.xml", DialectId::Boomi, xml));
//!
//! match pipeline.run(&bundle) {
//!     Ok(output) => println!("{}", output.document.to_xml_string()?),
//!     Err(e) => eprintln!("{}", e),
//! }
//! # Ok(())
//! # }
//! ```

// Pipeline
pub use crate::pipeline::{
    CancelToken, FlowBundle, FlowOutput, Pipeline, PipelineBuilder, PipelineConfig,
    SourceDocument,
};

// Intermediate representations
pub use crate::model::{CanonicalNode, ComponentModel, Edge, EdgeId, EdgeKind};
pub use crate::record::{ComponentRecord, ConfigValue, DialectId, RecordRole};

// Stages
pub use crate::generator::{Document, FlowManifest, TemplateGenerator};
pub use crate::layout::{LayoutConfig, LayoutEngine, LayoutPositions};
pub use crate::mapper::{MappingTable, TargetType, TypeMapper};
pub use crate::repair::RepairPass;

// Diagnostics
pub use crate::report::{Diagnostic, DiagnosticKind, Report, Severity, Stage};

// Error types
pub use crate::error::{ConfigError, MappingTableError, PipelineError};

pub use std::path::Path;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
