//! Classification of canonical nodes into target component types.
//!
//! Resolution runs in tiers and the first tier that answers wins:
//!
//! 0. The node's designated role: starts become `start_event`, ends become
//!    `end_event` (or `error_end_event` when the table says so).
//! 1. The mapping table, keyed by `source_type:variant` then `source_type`.
//! 2. Keyword heuristics over the tokens of `source_type` and `variant`, then
//!    over the tokens of the node name.
//! 3. `generic_passthrough`, with a warning.
//!
//! Mapping never fails. An unknown component still yields a valid node.

use crate::model::{CanonicalNode, ComponentModel};
use crate::record::RecordRole;
use crate::report::{Diagnostic, DiagnosticKind, Report, Severity, Stage};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod heuristics;
pub mod properties;
mod table;
mod target;

pub use heuristics::HeuristicRule;
pub use table::MappingTable;
pub use target::{ShapeKind, TargetType};

/// Which resolution tier produced a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingTier {
    Role,
    Table,
    Heuristic,
    Fallback,
}

/// The outcome of classifying one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub target: TargetType,
    pub tier: MappingTier,
    /// The table key or rule name that matched.
    pub matched: Option<String>,
    /// Set only for fallbacks.
    pub diagnostic: Option<Diagnostic>,
}

/// Table-driven classifier with heuristic fallback.
#[derive(Debug, Clone)]
pub struct TypeMapper {
    table: Arc<MappingTable>,
    rules: Vec<HeuristicRule>,
}

impl TypeMapper {
    pub fn new(table: Arc<MappingTable>) -> Self {
        Self {
            table,
            rules: heuristics::default_rules(),
        }
    }

    /// Replaces the heuristic rule list.
    pub fn with_rules(mut self, rules: Vec<HeuristicRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// Classifies a single node.
    pub fn map(&self, node: &CanonicalNode) -> Mapping {
        let variant = node.variant.as_deref();

        match node.role {
            RecordRole::Start => return role_mapping(TargetType::StartEvent),
            RecordRole::End => {
                let target = match self.table.lookup(&node.source_type, variant) {
                    Some((TargetType::ErrorEndEvent, _)) => TargetType::ErrorEndEvent,
                    _ => TargetType::EndEvent,
                };
                return role_mapping(target);
            }
            RecordRole::Step => {}
        }

        if let Some((target, key)) = self.table.lookup(&node.source_type, variant) {
            // Event types describe roles; a step the table calls an event stays a step.
            if target.shape() != ShapeKind::Event {
                return Mapping {
                    target,
                    tier: MappingTier::Table,
                    matched: Some(key),
                    diagnostic: None,
                };
            }
        }

        let mut type_tokens = heuristics::tokenize(&node.source_type);
        if let Some(variant) = variant {
            type_tokens.extend(heuristics::tokenize(variant));
        }
        let name_tokens = heuristics::tokenize(&node.name);
        let rule = heuristics::first_match(&self.rules, &type_tokens)
            .or_else(|| heuristics::first_match(&self.rules, &name_tokens));
        if let Some(rule) = rule {
            return Mapping {
                target: rule.target,
                tier: MappingTier::Heuristic,
                matched: Some(rule.name.to_string()),
                diagnostic: None,
            };
        }

        let diagnostic = Diagnostic::new(
            Severity::Warning,
            DiagnosticKind::MappingFallback,
            Stage::Map,
            format!(
                "No mapping for source type '{}'; using generic_passthrough",
                node.source_type
            ),
        )
        .with_node(node.node_id.clone());
        Mapping {
            target: TargetType::GenericPassthrough,
            tier: MappingTier::Fallback,
            matched: None,
            diagnostic: Some(diagnostic),
        }
    }

    /// Classifies every node of `model`, writing `target_type` and the
    /// normalized `properties`. Fallback warnings are returned in node order.
    pub fn map_model(&self, model: &mut ComponentModel) -> Report {
        let mut report = Report::new();
        let mut fallbacks = 0usize;
        for node in model.nodes_mut() {
            let mapping = self.map(node);
            debug!(
                node_id = %node.node_id,
                target = %mapping.target,
                tier = ?mapping.tier,
                matched = mapping.matched.as_deref().unwrap_or("-"),
                "mapped node"
            );
            if let Some(diagnostic) = mapping.diagnostic {
                warn!(node_id = %node.node_id, source_type = %node.source_type, "mapping fallback");
                fallbacks += 1;
                report.push(diagnostic);
            }
            node.properties = properties::normalize(node, mapping.target);
            node.target_type = mapping.target;
        }
        info!(
            nodes = model.node_count(),
            fallbacks,
            table_version = self.table.version(),
            "type mapping complete"
        );
        report
    }
}

fn role_mapping(target: TargetType) -> Mapping {
    Mapping {
        target,
        tier: MappingTier::Role,
        matched: None,
        diagnostic: None,
    }
}
