//! Structural validation and repair of generated documents.
//!
//! A [`RepairPass`] runs a fixed list of [`RepairCheck`]s in order. A check
//! either fixes what it finds, logging a `RepairApplied` diagnostic, or
//! reports an `UnrepairableDefect`. Repairs are idempotent: a second pass over
//! a repaired document changes nothing and reports nothing.

use crate::generator::Document;
use crate::report::{Diagnostic, DiagnosticKind, Report, Severity, Stage};
use tracing::{info, warn};

pub mod checks;

pub use checks::{
    DanglingConnectorCheck, MandatoryPropertiesCheck, StartCountCheck, UnconnectedNodeCheck,
};

/// One structural check over a document.
pub trait RepairCheck: Send + Sync {
    /// Stable kebab-case name, used in log output.
    fn name(&self) -> &'static str;

    /// Inspects and, where possible, fixes `document`, recording every repair
    /// and every unfixable defect in `report`.
    fn apply(&self, document: &mut Document, report: &mut Report);
}

/// Runs the built-in checks in their fixed order.
pub struct RepairPass {
    checks: Vec<Box<dyn RepairCheck>>,
}

impl RepairPass {
    pub fn new() -> Self {
        let checks: Vec<Box<dyn RepairCheck>> = vec![
            Box::new(DanglingConnectorCheck),
            Box::new(UnconnectedNodeCheck),
            Box::new(MandatoryPropertiesCheck),
            Box::new(StartCountCheck),
        ];
        Self { checks }
    }

    /// Appends a check after the built-in ones.
    pub fn with_check(mut self, check: Box<dyn RepairCheck>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn run(&self, mut document: Document) -> (Document, Report) {
        let mut report = Report::new();
        if document.process().is_none() {
            report.push(defect(None, "Document has no process element"));
            return (document, report);
        }
        for check in &self.checks {
            let before = report.len();
            check.apply(&mut document, &mut report);
            let found = report.len() - before;
            if found > 0 {
                warn!(check = check.name(), found, "repair check reported problems");
            }
        }
        info!(
            repairs = report.count(Severity::Info),
            defects = report.count(Severity::Fatal),
            "repair pass finished"
        );
        (document, report)
    }
}

impl Default for RepairPass {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the default [`RepairPass`] over `document`.
pub fn validate_and_repair(document: Document) -> (Document, Report) {
    RepairPass::new().run(document)
}

pub(crate) fn repaired(node_id: Option<&str>, message: impl Into<String>) -> Diagnostic {
    let diagnostic = Diagnostic::new(
        Severity::Info,
        DiagnosticKind::RepairApplied,
        Stage::Repair,
        message,
    );
    match node_id {
        Some(id) => diagnostic.with_node(id),
        None => diagnostic,
    }
}

pub(crate) fn defect(node_id: Option<&str>, message: impl Into<String>) -> Diagnostic {
    let diagnostic = Diagnostic::new(
        Severity::Fatal,
        DiagnosticKind::UnrepairableDefect,
        Stage::Repair,
        message,
    );
    match node_id {
        Some(id) => diagnostic.with_node(id),
        None => diagnostic,
    }
}
