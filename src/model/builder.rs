use super::{CanonicalNode, ComponentModel, Edge, EdgeId, EdgeKind, RecordSource};
use crate::error::BuildError;
use crate::mapper::TargetType;
use crate::record::{ComponentRecord, ConfigMap, RecordRole};
use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use tracing::{debug, info};

/// Folds component records into a [`ComponentModel`].
///
/// Records sharing a merge key become one node. Their config is merged in
/// input order, later non-empty values replacing earlier ones, so the order of
/// `records` is the precedence order.
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    require_acyclic: Option<bool>,
}

/// Records grouped under one merge key, in input order.
struct Group<'a> {
    key: &'a str,
    records: Vec<&'a ComponentRecord>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the acyclicity requirement that is otherwise derived from the
    /// records' dialects.
    pub fn require_acyclic(mut self, required: bool) -> Self {
        self.require_acyclic = Some(required);
        self
    }

    pub fn build(&self, records: &[ComponentRecord]) -> Result<ComponentModel, BuildError> {
        let (groups, group_index) = group_records(records);
        let node_ids = assign_node_ids(&groups);
        let resolver = LinkResolver::new(records);

        let mut nodes: IndexMap<String, CanonicalNode> = IndexMap::with_capacity(groups.len());
        for (group, node_id) in groups.iter().zip(&node_ids) {
            let node_id = node_id.clone();
            debug!(node_id = %node_id, records = group.records.len(), "folding records");
            nodes.insert(node_id.clone(), fold_group(node_id, group));
        }

        let mut edges: IndexMap<EdgeId, Edge> = IndexMap::new();
        let mut seen: AHashSet<(String, String, EdgeKind)> = AHashSet::new();
        for (group, source_node) in groups.iter().zip(&node_ids) {
            for record in &group.records {
                for link in &record.links {
                    let target_key = resolver.resolve(&record.document, &link.target).ok_or_else(
                        || BuildError::DanglingReference {
                            missing: link.target.clone(),
                            source_node: record.id.clone(),
                        },
                    )?;
                    let target_node = group_index
                        .get(target_key)
                        .map(|&i| &node_ids[i])
                        .ok_or_else(|| BuildError::DanglingReference {
                            missing: link.target.clone(),
                            source_node: record.id.clone(),
                        })?;
                    let triple = (source_node.clone(), target_node.clone(), link.kind);
                    if !seen.insert(triple) {
                        debug!(source = %source_node, target = %target_node, kind = %link.kind, "folded duplicate link");
                        continue;
                    }

                    let id = EdgeId::from_index(edges.len() + 1);
                    if let Some(node) = nodes.get_mut(source_node) {
                        node.outgoing.push(id.clone());
                    }
                    if let Some(node) = nodes.get_mut(target_node) {
                        node.incoming.push(id.clone());
                    }
                    edges.insert(
                        id.clone(),
                        Edge {
                            id,
                            source_node: source_node.clone(),
                            target_node: target_node.clone(),
                            kind: link.kind,
                            condition: link.condition.clone(),
                        },
                    );
                }
            }
        }

        let model = ComponentModel::from_parts(nodes, edges);
        if self.acyclic_required(records) {
            if let Some(path) = find_cycle(&model) {
                return Err(BuildError::Cycle { path });
            }
        }

        info!(
            records = records.len(),
            nodes = model.node_count(),
            edges = model.edge_count(),
            "component model built"
        );
        Ok(model)
    }

    fn acyclic_required(&self, records: &[ComponentRecord]) -> bool {
        self.require_acyclic.unwrap_or_else(|| {
            records
                .iter()
                .filter_map(|r| r.dialect)
                .all(|d| d.requires_acyclic())
        })
    }
}

fn group_records(records: &[ComponentRecord]) -> (Vec<Group<'_>>, AHashMap<&str, usize>) {
    let mut index: AHashMap<&str, usize> = AHashMap::new();
    let mut groups: Vec<Group<'_>> = Vec::new();
    for record in records {
        let key = record.effective_merge_key();
        match index.get(key) {
            Some(&i) => groups[i].records.push(record),
            None => {
                index.insert(key, groups.len());
                groups.push(Group {
                    key,
                    records: vec![record],
                });
            }
        }
    }
    (groups, index)
}

/// One unique NCName-safe node id per group, in group order.
fn assign_node_ids(groups: &[Group<'_>]) -> Vec<String> {
    let mut taken: AHashSet<String> = AHashSet::new();
    let mut ids = Vec::with_capacity(groups.len());
    for group in groups {
        let base = sanitize_ncname(group.key);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while taken.contains(&candidate) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        taken.insert(candidate.clone());
        ids.push(candidate);
    }
    ids
}

/// Turns an arbitrary key into a valid XML NCName.
pub(crate) fn sanitize_ncname(key: &str) -> String {
    let mut out: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match out.chars().next() {
        None => out.push_str("node"),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => out.insert(0, '_'),
        _ => {}
    }
    out
}

fn fold_group(node_id: String, group: &Group<'_>) -> CanonicalNode {
    let mut name = String::new();
    let mut source_type = String::new();
    let mut variant = None;
    let mut role = RecordRole::Step;
    let mut dialect = None;
    let mut config = ConfigMap::new();
    let mut sources = Vec::with_capacity(group.records.len());

    for record in &group.records {
        if !record.name.trim().is_empty() {
            name = record.name.clone();
        }
        if !record.source_type.trim().is_empty() {
            source_type = record.source_type.clone();
        }
        if record.variant.is_some() {
            variant = record.variant.clone();
        }
        if role == RecordRole::Step {
            role = record.role;
        }
        dialect = dialect.or(record.dialect);
        for (key, value) in &record.config {
            if !value.is_empty() || !config.contains_key(key) {
                config.insert(key.clone(), value.clone());
            }
        }
        sources.push(RecordSource {
            document: record.document.clone(),
            record_id: record.id.clone(),
        });
    }

    CanonicalNode {
        node_id,
        name,
        source_type,
        variant,
        role,
        dialect,
        target_type: TargetType::Unresolved,
        incoming: Vec::new(),
        outgoing: Vec::new(),
        config,
        properties: ConfigMap::new(),
        sources,
    }
}

/// Resolves link targets to merge keys: same-document id first, then an id in
/// any document, then a merge key.
struct LinkResolver<'a> {
    by_document: AHashMap<(&'a str, &'a str), &'a str>,
    by_id: AHashMap<&'a str, &'a str>,
    keys: AHashSet<&'a str>,
}

impl<'a> LinkResolver<'a> {
    fn new(records: &'a [ComponentRecord]) -> Self {
        let mut by_document = AHashMap::new();
        let mut by_id = AHashMap::new();
        let mut keys = AHashSet::new();
        for record in records {
            let key = record.effective_merge_key();
            by_document
                .entry((record.document.as_str(), record.id.as_str()))
                .or_insert(key);
            by_id.entry(record.id.as_str()).or_insert(key);
            keys.insert(key);
        }
        Self {
            by_document,
            by_id,
            keys,
        }
    }

    fn resolve(&self, document: &str, target: &str) -> Option<&'a str> {
        self.by_document
            .get(&(document, target))
            .or_else(|| self.by_id.get(target))
            .copied()
            .or_else(|| self.keys.get(target).copied())
    }
}

/// Depth-first search for a cycle over sequence and reference edges.
/// Returns the node ids along the cycle, first node repeated at the end.
fn find_cycle(model: &ComponentModel) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Active,
        Done,
    }

    let ids: Vec<&str> = model.nodes().map(|n| n.node_id.as_str()).collect();
    let mut marks: AHashMap<&str, Mark> = ids.iter().map(|id| (*id, Mark::Unvisited)).collect();

    for &root in &ids {
        if marks.get(root) != Some(&Mark::Unvisited) {
            continue;
        }
        // Explicit stack of (node, next outgoing index) keeps deep flows off the call stack.
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::Active);
        while let Some((node, cursor)) = stack.pop() {
            let next = model
                .outgoing(node)
                .filter(|e| e.kind != EdgeKind::Error)
                .nth(cursor);
            let Some(edge) = next else {
                marks.insert(node, Mark::Done);
                continue;
            };
            stack.push((node, cursor + 1));
            let target = edge.target_node.as_str();
            match marks.get(target).copied().unwrap_or(Mark::Done) {
                Mark::Active => {
                    let start = stack.iter().position(|(n, _)| *n == target).unwrap_or(0);
                    let mut path: Vec<String> =
                        stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                    path.push(target.to_string());
                    return Some(path);
                }
                Mark::Unvisited => {
                    marks.insert(target, Mark::Active);
                    stack.push((target, 0));
                }
                Mark::Done => {}
            }
        }
    }
    None
}
