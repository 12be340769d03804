//! Diagnostics accumulated across all pipeline stages.
//!
//! Non-fatal conditions (malformed source fragments, mapping fallbacks,
//! applied repairs) never surface as `Err` values. They are collected here
//! and handed to the caller next to the generated document.

use serde::Serialize;
use std::fmt;

pub mod formatter;

pub use formatter::ReportFormatter;

/// How serious a diagnostic is. `Fatal` means no document is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// The class of condition a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ParseError,
    BuildError,
    MappingFallback,
    LayoutInconsistency,
    RepairApplied,
    UnrepairableDefect,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::ParseError => "ParseError",
            DiagnosticKind::BuildError => "BuildError",
            DiagnosticKind::MappingFallback => "MappingFallback",
            DiagnosticKind::LayoutInconsistency => "LayoutInconsistency",
            DiagnosticKind::RepairApplied => "RepairApplied",
            DiagnosticKind::UnrepairableDefect => "UnrepairableDefect",
        };
        f.write_str(name)
    }
}

/// The pipeline stage a diagnostic or error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Parse,
    Build,
    Map,
    Layout,
    Generate,
    Repair,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Parse => write!(f, "parse"),
            Stage::Build => write!(f, "build"),
            Stage::Map => write!(f, "map"),
            Stage::Layout => write!(f, "layout"),
            Stage::Generate => write!(f, "generate"),
            Stage::Repair => write!(f, "repair"),
        }
    }
}

/// A single entry in a [`Report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub stage: Stage,
    /// Canonical node id (or source record id during parsing), when known.
    pub node_id: Option<String>,
    /// Source location such as `orders.xml:12:5`, when known.
    pub location: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        kind: DiagnosticKind,
        stage: Stage,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            stage,
            node_id: None,
            location: None,
            message: message.into(),
        }
    }

    /// A recoverable problem found while reading a source document.
    pub fn parse_error(severity: Severity, message: impl Into<String>) -> Self {
        Self::new(severity, DiagnosticKind::ParseError, Stage::Parse, message)
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.severity, self.kind, self.stage)?;
        if let Some(node_id) = &self.node_id {
            write!(f, " node '{}'", node_id)?;
        }
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered list of diagnostics for one flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Report {
    entries: Vec<Diagnostic>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.entries.extend(diagnostics);
    }

    /// Appends every entry of `other`, preserving order.
    pub fn merge(&mut self, other: Report) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_fatal(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_fatal)
    }

    pub fn fatal(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.is_fatal())
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl IntoIterator for Report {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<Diagnostic> for Report {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
