//! End-to-end conversion of one integration flow.
//!
//! A [`Pipeline`] runs parse → build → map → layout → generate → repair for
//! a [`FlowBundle`]. Stages run strictly in order, each consuming the
//! complete output of the previous one. The pipeline holds no per-flow
//! state, so one instance can convert many flows in parallel
//! ([`Pipeline::run_batch`]).

use crate::error::{BuildError, GenerateError, MappingTableError, PipelineError};
use crate::generator::{
    ComponentTemplate, Document, FlowManifest, FlowMeta, TemplateGenerator,
    TemplateGeneratorBuilder,
};
use crate::layout::LayoutEngine;
use crate::mapper::{MappingTable, TypeMapper};
use crate::model::ModelBuilder;
use crate::parser::{ParserRegistry, SourceParser};
use crate::record::{ComponentRecord, DialectId};
use crate::repair::{RepairCheck, RepairPass};
use crate::report::{Diagnostic, DiagnosticKind, Report, Severity, Stage};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, info_span};

mod config;

pub use config::PipelineConfig;

/// One source document as handed over by the upload layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Name used in diagnostics, usually the path inside the upload.
    pub name: String,
    pub dialect: DialectId,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, dialect: DialectId, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            dialect,
            bytes: bytes.into(),
        }
    }
}

/// Everything needed to convert one flow.
#[derive(Debug, Clone, Default)]
pub struct FlowBundle {
    pub flow_id: String,
    pub flow_name: String,
    pub documents: Vec<SourceDocument>,
    /// Pre-built records merged ahead of the parsed ones.
    pub hints: Vec<ComponentRecord>,
}

impl FlowBundle {
    pub fn new(flow_id: impl Into<String>, flow_name: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            flow_name: flow_name.into(),
            ..Self::default()
        }
    }

    pub fn with_document(mut self, document: SourceDocument) -> Self {
        self.documents.push(document);
        self
    }

    pub fn with_hint(mut self, record: ComponentRecord) -> Self {
        self.hints.push(record);
        self
    }
}

/// A converted flow: the repaired document, the advisory report and the
/// manifest for the packaging layer.
#[derive(Debug, Clone)]
pub struct FlowOutput {
    pub document: Document,
    pub report: Report,
    pub manifest: FlowManifest,
}

/// Cooperative cancellation, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Pipeline {
    parsers: ParserRegistry,
    model_builder: ModelBuilder,
    mapper: TypeMapper,
    layout: LayoutEngine,
    generator: TemplateGenerator,
    repair: RepairPass,
}

pub struct PipelineBuilder {
    table: Option<Arc<MappingTable>>,
    config: PipelineConfig,
    parsers: Vec<Box<dyn SourceParser>>,
    templates: TemplateGeneratorBuilder,
    checks: Vec<Box<dyn RepairCheck>>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            table: None,
            config: PipelineConfig::default(),
            parsers: Vec::new(),
            templates: TemplateGenerator::builder(),
            checks: Vec::new(),
        }
    }

    /// Uses `table` instead of the built-in mapping table.
    pub fn with_mapping_table(mut self, table: impl Into<Arc<MappingTable>>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers an additional parser, replacing any for the same dialect.
    pub fn with_parser(mut self, parser: Box<dyn SourceParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    pub fn with_custom_template(mut self, template: Box<dyn ComponentTemplate>) -> Self {
        self.templates = self.templates.with_custom_template(template);
        self
    }

    /// Runs `check` after the built-in repair checks.
    pub fn with_repair_check(mut self, check: Box<dyn RepairCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Fails only if no table was given and the built-in table cannot be read.
    pub fn build(self) -> Result<Pipeline, MappingTableError> {
        let table = match self.table {
            Some(table) => table,
            None => Arc::new(MappingTable::builtin()?),
        };
        let parsers = self
            .parsers
            .into_iter()
            .fold(ParserRegistry::new(), ParserRegistry::with_parser)
            .with_options(self.config.parser.clone());
        let repair = self
            .checks
            .into_iter()
            .fold(RepairPass::new(), RepairPass::with_check);

        Ok(Pipeline {
            parsers,
            model_builder: ModelBuilder::new(),
            mapper: TypeMapper::new(table),
            layout: LayoutEngine::new(self.config.layout),
            generator: self.templates.build(),
            repair,
        })
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn mapping_table(&self) -> &MappingTable {
        self.mapper.table()
    }

    pub fn run(&self, bundle: &FlowBundle) -> Result<FlowOutput, PipelineError> {
        self.run_with_cancel(bundle, &CancelToken::new())
    }

    pub fn run_with_cancel(
        &self,
        bundle: &FlowBundle,
        cancel: &CancelToken,
    ) -> Result<FlowOutput, PipelineError> {
        let _span = info_span!("flow", flow_id = %bundle.flow_id).entered();
        let run = FlowRun {
            bundle,
            cancel,
            report: Report::new(),
        };
        let result = self.convert(run);
        match &result {
            Ok(output) => info!(
                nodes = output.manifest.node_count,
                edges = output.manifest.edge_count,
                diagnostics = output.report.len(),
                "flow converted"
            ),
            Err(e) => error!(stage = %e.stage(), "{}", e),
        }
        result
    }

    /// Converts independent flows in parallel. Results are in input order.
    pub fn run_batch(&self, bundles: &[FlowBundle]) -> Vec<Result<FlowOutput, PipelineError>> {
        bundles.par_iter().map(|bundle| self.run(bundle)).collect()
    }

    fn convert(&self, mut run: FlowRun<'_>) -> Result<FlowOutput, PipelineError> {
        run.checkpoint(Stage::Parse)?;
        let mut records = run.bundle.hints.clone();
        for document in &run.bundle.documents {
            let output = self
                .parsers
                .parse(&document.bytes, document.dialect, &document.name);
            records.extend(output.records);
            run.report.extend(output.diagnostics);
        }
        run.stop_on_fatal(Stage::Parse)?;

        run.checkpoint(Stage::Build)?;
        let mut model = match self.model_builder.build(&records) {
            Ok(model) => model,
            Err(e) => {
                let diagnostic = Diagnostic::new(
                    Severity::Fatal,
                    DiagnosticKind::BuildError,
                    Stage::Build,
                    e.to_string(),
                );
                let diagnostic = match &e {
                    BuildError::DanglingReference { source_node, .. } => {
                        diagnostic.with_node(source_node.as_str())
                    }
                    BuildError::Cycle { path } => match path.first() {
                        Some(node) => diagnostic.with_node(node.as_str()),
                        None => diagnostic,
                    },
                };
                return Err(run.abort(Stage::Build, diagnostic));
            }
        };

        run.checkpoint(Stage::Map)?;
        let mapping_report = self.mapper.map_model(&mut model);
        run.report.merge(mapping_report);

        run.checkpoint(Stage::Layout)?;
        let positions = self.layout.layout(&model).map_err(|e| {
            let diagnostic = Diagnostic::new(
                Severity::Fatal,
                DiagnosticKind::LayoutInconsistency,
                Stage::Layout,
                e.to_string(),
            );
            run.abort(Stage::Layout, diagnostic)
        })?;

        run.checkpoint(Stage::Generate)?;
        let meta = FlowMeta {
            flow_id: run.bundle.flow_id.clone(),
            flow_name: run.bundle.flow_name.clone(),
            table_version: self.mapper.table().version().to_string(),
            ..FlowMeta::default()
        };
        let generated = self
            .generator
            .generate_flow(&model, &positions, &meta)
            .map_err(|e| {
                let node = match &e {
                    GenerateError::MissingPosition(id) | GenerateError::UnresolvedType(id) => {
                        Some(id.clone())
                    }
                    GenerateError::Xml(_) => None,
                };
                let mut diagnostic = Diagnostic::new(
                    Severity::Fatal,
                    DiagnosticKind::LayoutInconsistency,
                    Stage::Generate,
                    e.to_string(),
                );
                diagnostic.node_id = node;
                run.abort(Stage::Generate, diagnostic)
            })?;

        run.checkpoint(Stage::Repair)?;
        let (document, repair_report) = self.repair.run(generated.document);
        run.report.merge(repair_report);
        run.stop_on_fatal(Stage::Repair)?;

        let mut manifest = generated.manifest;
        manifest.recount(&document);
        Ok(FlowOutput {
            document,
            report: run.report,
            manifest,
        })
    }
}

/// Per-run state threaded through the stages.
struct FlowRun<'a> {
    bundle: &'a FlowBundle,
    cancel: &'a CancelToken,
    report: Report,
}

impl FlowRun<'_> {
    fn checkpoint(&self, stage: Stage) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled {
                flow_id: self.bundle.flow_id.clone(),
                stage,
            });
        }
        Ok(())
    }

    fn stop_on_fatal(&self, stage: Stage) -> Result<(), PipelineError> {
        match self.report.fatal().next() {
            Some(first) => Err(PipelineError::Aborted {
                flow_id: self.bundle.flow_id.clone(),
                stage,
                reason: first.message.clone(),
                report: self.report.clone(),
            }),
            None => Ok(()),
        }
    }

    fn abort(&self, stage: Stage, diagnostic: Diagnostic) -> PipelineError {
        let mut report = self.report.clone();
        let reason = diagnostic.message.clone();
        report.push(diagnostic);
        PipelineError::Aborted {
            flow_id: self.bundle.flow_id.clone(),
            stage,
            reason,
            report,
        }
    }
}
