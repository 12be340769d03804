use crate::report::{Report, Stage};
use thiserror::Error;

/// Errors raised while serializing an XML tree.
#[derive(Error, Debug, Clone)]
pub enum XmlError {
    #[error("Failed to write XML element '{element}': {message}")]
    Write { element: String, message: String },

    #[error("Serialized XML is not valid UTF-8: {0}")]
    Encoding(String),
}

/// Errors that abort the component model build for a flow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Node '{missing}' not found, which is required by a link from node '{source_node}'")]
    DanglingReference {
        missing: String,
        source_node: String,
    },

    #[error("Flow must be acyclic, but contains the cycle {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// Internal invariant violations detected by the layout engine.
///
/// The model builder guarantees these cannot happen, so hitting one is a bug
/// rather than a problem with the user's input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Layout invariant violated: {0}")]
    Inconsistency(String),
}

/// Errors raised while rendering the target document.
#[derive(Error, Debug, Clone)]
pub enum GenerateError {
    #[error("Node '{0}' has no computed layout position")]
    MissingPosition(String),

    #[error("Node '{0}' reached generation without a resolved target type")]
    UnresolvedType(String),

    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// Errors raised while loading an external mapping table.
#[derive(Error, Debug, Clone)]
pub enum MappingTableError {
    #[error("Failed to parse mapping table JSON: {0}")]
    Parse(String),

    #[error("Mapping table lists source type '{0}' more than once")]
    DuplicateEntry(String),

    #[error("Mapping table maps '{source_type}' to unknown target type '{target}'")]
    UnknownTarget { source_type: String, target: String },
}

/// Errors raised while loading pipeline configuration.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// The structured error returned when a flow cannot be converted.
///
/// `Aborted` always carries the full report, whose fatal entries explain
/// why no document was produced.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("Flow '{flow_id}' aborted during {stage}: {reason}")]
    Aborted {
        flow_id: String,
        stage: Stage,
        reason: String,
        report: Report,
    },

    #[error("Flow '{flow_id}' was cancelled before {stage}")]
    Cancelled { flow_id: String, stage: Stage },
}

impl PipelineError {
    /// The stage in which the flow stopped.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Aborted { stage, .. } | PipelineError::Cancelled { stage, .. } => *stage,
        }
    }

    /// The diagnostics accumulated before the flow stopped, if any.
    pub fn report(&self) -> Option<&Report> {
        match self {
            PipelineError::Aborted { report, .. } => Some(report),
            PipelineError::Cancelled { .. } => None,
        }
    }
}
