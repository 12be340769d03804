use crate::report::{Diagnostic, Report, Severity};
use itertools::Itertools;

/// Formats reports into human-readable text.
pub struct ReportFormatter;

impl ReportFormatter {
    /// One line per diagnostic, most severe first, followed by a summary line.
    /// Entries of equal severity keep their original order.
    pub fn format_report(report: &Report) -> String {
        if report.is_empty() {
            return "No diagnostics.".to_string();
        }

        let mut lines: Vec<String> = report
            .entries()
            .iter()
            .sorted_by_key(|d| std::cmp::Reverse(d.severity))
            .map(Self::format_entry)
            .collect();
        lines.push(Self::summary(report));
        lines.join("\n")
    }

    /// Formats a single diagnostic.
    pub fn format_entry(diagnostic: &Diagnostic) -> String {
        let mut line = format!(
            "{:<7} {:<19} {:<8}",
            diagnostic.severity.to_string().to_uppercase(),
            diagnostic.kind.to_string(),
            diagnostic.stage.to_string(),
        );
        if let Some(node_id) = &diagnostic.node_id {
            line.push_str(&format!(" [{}]", node_id));
        }
        if let Some(location) = &diagnostic.location {
            line.push_str(&format!(" @{}", location));
        }
        line.push(' ');
        line.push_str(&diagnostic.message);
        line
    }

    fn summary(report: &Report) -> String {
        format!(
            "{} fatal, {} warning(s), {} info",
            report.count(Severity::Fatal),
            report.count(Severity::Warning),
            report.count(Severity::Info)
        )
    }
}
