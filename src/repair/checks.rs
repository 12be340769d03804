use super::{RepairCheck, defect, repaired};
use crate::generator::{
    Document, diagram_edge, infer_target_type, is_flow_node, properties, property,
    sequence_flow, template_spec,
};
use crate::layout::{Bounds, Point};
use crate::mapper::TargetType;
use crate::model::EdgeKind;
use crate::report::Report;
use crate::xml::{XmlElement, XmlNode};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use std::collections::VecDeque;
use std::str::FromStr;
use tracing::debug;

/// Drops connectors whose endpoints are gone, then brings every node's
/// `incoming`/`outgoing` refs and the diagram in line with what is left.
pub struct DanglingConnectorCheck;

/// Attaches nodes that are neither ancestors nor descendants of the start
/// event with a synthetic connector from the start.
pub struct UnconnectedNodeCheck;

/// Fills in `extensionElements`, `componentType`, `activityType` and the
/// mandatory properties of each flow node's type.
pub struct MandatoryPropertiesCheck;

/// Exactly one start event per flow.
pub struct StartCountCheck;

impl RepairCheck for DanglingConnectorCheck {
    fn name(&self) -> &'static str {
        "dangling-connector"
    }

    fn apply(&self, document: &mut Document, report: &mut Report) {
        let Some(process) = document.process_mut() else {
            return;
        };
        let node_ids: AHashSet<String> = process
            .elements()
            .filter(|e| is_flow_node(e))
            .filter_map(|e| e.attr("id"))
            .map(str::to_string)
            .collect();

        let mut dropped = Vec::new();
        process.retain_elements(|e| {
            if e.local_name() != "sequenceFlow" {
                return true;
            }
            let source = e.attr("sourceRef").unwrap_or_default();
            let target = e.attr("targetRef").unwrap_or_default();
            let keep = node_ids.contains(source) && node_ids.contains(target);
            if !keep {
                dropped.push(format!(
                    "Dropped connector '{}' from '{}' to '{}' because an endpoint does not exist",
                    e.attr("id").unwrap_or_default(),
                    source,
                    target
                ));
            }
            keep
        });
        report.extend(dropped.into_iter().map(|m| repaired(None, m)));

        // Expected refs per node, in connector order.
        let mut incoming: AHashMap<String, Vec<String>> = AHashMap::new();
        let mut outgoing: AHashMap<String, Vec<String>> = AHashMap::new();
        for flow in process.find_all("sequenceFlow") {
            let (Some(id), Some(source), Some(target)) =
                (flow.attr("id"), flow.attr("sourceRef"), flow.attr("targetRef"))
            else {
                continue;
            };
            outgoing
                .entry(source.to_string())
                .or_default()
                .push(id.to_string());
            incoming
                .entry(target.to_string())
                .or_default()
                .push(id.to_string());
        }

        let prefix = process.prefix().map(str::to_string);
        for node in process.elements_mut().filter(|e| is_flow_node(e)) {
            let id = node.attr("id").unwrap_or_default().to_string();
            let none = Vec::new();
            let expected_in = incoming.get(&id).unwrap_or(&none);
            let expected_out = outgoing.get(&id).unwrap_or(&none);
            sync_refs(node, &id, "incoming", expected_in, prefix.as_deref(), report);
            sync_refs(node, &id, "outgoing", expected_out, prefix.as_deref(), report);
        }

        let mut known = AHashSet::new();
        collect_ids(document.root(), &mut known);
        let Some(plane) = document.plane_mut() else {
            return;
        };
        let mut removed = Vec::new();
        plane.retain_elements(|e| {
            if !matches!(e.local_name(), "BPMNShape" | "BPMNEdge") {
                return true;
            }
            let target = e.attr("bpmnElement").unwrap_or_default();
            let keep = known.contains(target);
            if !keep {
                removed.push(format!(
                    "Removed diagram element '{}' for missing element '{}'",
                    e.attr("id").unwrap_or_default(),
                    target
                ));
            }
            keep
        });
        report.extend(removed.into_iter().map(|m| repaired(None, m)));
    }
}

/// Removes stale or repeated `incoming`/`outgoing` refs and adds missing ones.
fn sync_refs(
    node: &mut XmlElement,
    node_id: &str,
    direction: &str,
    expected: &[String],
    prefix: Option<&str>,
    report: &mut Report,
) {
    let mut seen: AHashSet<String> = AHashSet::new();
    let mut stale = Vec::new();
    node.retain_elements(|e| {
        if e.local_name() != direction {
            return true;
        }
        let flow = e.text();
        let keep = expected.contains(&flow) && seen.insert(flow.clone());
        if !keep {
            stale.push(flow);
        }
        keep
    });
    for flow in stale {
        report.push(repaired(
            Some(node_id),
            format!("Removed stale {} ref '{}'", direction, flow),
        ));
    }

    for flow in expected.iter().filter(|f| !seen.contains(*f)) {
        add_ref(node, direction, flow, prefix);
        report.push(repaired(
            Some(node_id),
            format!("Added missing {} ref '{}'", direction, flow),
        ));
    }
}

/// Inserts a ref keeping the `incoming*, outgoing*, eventDefinition` order.
fn add_ref(node: &mut XmlElement, direction: &str, flow: &str, prefix: Option<&str>) {
    let element = XmlElement::text_element(qualified(prefix, direction), flow);
    let incoming = direction == "incoming";
    node.insert_child_before(element, |e| {
        e.local_name().ends_with("EventDefinition") || (incoming && e.local_name() == "outgoing")
    });
}

fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

/// Every `id` outside the diagram.
fn collect_ids(element: &XmlElement, out: &mut AHashSet<String>) {
    if element.local_name() == "BPMNDiagram" {
        return;
    }
    if let Some(id) = element.attr("id") {
        out.insert(id.to_string());
    }
    for child in element.elements() {
        collect_ids(child, out);
    }
}

impl RepairCheck for UnconnectedNodeCheck {
    fn name(&self) -> &'static str {
        "unconnected-node"
    }

    fn apply(&self, document: &mut Document, report: &mut Report) {
        let nodes: Vec<(String, bool)> = document
            .flow_nodes()
            .filter_map(|e| {
                e.attr("id")
                    .map(|id| (id.to_string(), e.local_name() == "startEvent"))
            })
            .collect();
        let starts: Vec<&str> = nodes
            .iter()
            .filter(|(_, is_start)| *is_start)
            .map(|(id, _)| id.as_str())
            .collect();
        // Zero or several starts are reported by the start-count check.
        let [start] = starts.as_slice() else {
            return;
        };
        let start = start.to_string();
        let mut flows: Vec<(String, String)> = document
            .sequence_flows()
            .filter_map(|f| Some((f.attr("sourceRef")?.to_string(), f.attr("targetRef")?.to_string())))
            .collect();

        loop {
            let connected = connected_to(&start, &flows);
            let unconnected: Vec<&str> = nodes
                .iter()
                .map(|(id, _)| id.as_str())
                .filter(|id| !connected.contains(*id))
                .collect();
            let Some(first) = unconnected.first() else {
                break;
            };
            // Attach only nodes with no unconnected predecessor; the rest are
            // reached through them.
            let node = unconnected
                .iter()
                .find(|n| {
                    !flows
                        .iter()
                        .any(|(s, t)| t == **n && s != **n && unconnected.contains(&s.as_str()))
                })
                .unwrap_or(first)
                .to_string();

            let id = attach(document, &start, &node);
            debug!(%start, %node, connector = %id, "attached unconnected node");
            report.push(repaired(
                Some(&node),
                format!(
                    "Attached unconnected node to start '{}' with connector '{}'",
                    start, id
                ),
            ));
            flows.push((start.clone(), node));
        }
    }
}

/// Nodes reachable from `start` in either direction, `start` included.
fn connected_to(start: &str, flows: &[(String, String)]) -> AHashSet<String> {
    let mut connected = AHashSet::new();
    connected.insert(start.to_string());
    for forward in [true, false] {
        let mut seen: AHashSet<&str> = AHashSet::new();
        let mut queue = VecDeque::from([start]);
        seen.insert(start);
        while let Some(current) = queue.pop_front() {
            for (source, target) in flows {
                let (from, to) = if forward {
                    (source, target)
                } else {
                    (target, source)
                };
                if from == current && seen.insert(to.as_str()) {
                    connected.insert(to.clone());
                    queue.push_back(to.as_str());
                }
            }
        }
    }
    connected
}

/// Adds `start -> node` to the process and, when both shapes exist, to the
/// diagram. Returns the connector id.
fn attach(document: &mut Document, start: &str, node: &str) -> String {
    let id = format!("SequenceFlow_repair_{}", node);
    if let Some(process) = document.process_mut() {
        let prefix = process.prefix().map(str::to_string);
        process.push_child(sequence_flow(&id, start, node, EdgeKind::Sequence, None));
        for element in process.elements_mut() {
            let direction = match element.attr("id") {
                Some(i) if i == start => "outgoing",
                Some(i) if i == node => "incoming",
                _ => continue,
            };
            add_ref(element, direction, &id, prefix.as_deref());
        }
    }

    if let Some(plane) = document.plane_mut() {
        let bounds = |element: &str| {
            plane
                .find_all("BPMNShape")
                .find(|s| s.attr("bpmnElement") == Some(element))
                .and_then(shape_bounds)
        };
        if let (Some(from), Some(to)) = (bounds(start), bounds(node)) {
            let (a, b) = (from.right_mid(), to.left_mid());
            let mid = (a.x + b.x) / 2.0;
            let points = if a.y == b.y {
                vec![a, b]
            } else {
                vec![a, Point::new(mid, a.y), Point::new(mid, b.y), b]
            };
            plane.push_child(diagram_edge(&id, start, node, &points));
        }
    }
    id
}

fn shape_bounds(shape: &XmlElement) -> Option<Bounds> {
    let bounds = shape.find("Bounds")?;
    let number = |key: &str| bounds.attr(key)?.trim().parse::<f64>().ok();
    Some(Bounds {
        x: number("x")?,
        y: number("y")?,
        width: number("width")?,
        height: number("height")?,
    })
}

impl RepairCheck for MandatoryPropertiesCheck {
    fn name(&self) -> &'static str {
        "mandatory-properties"
    }

    fn apply(&self, document: &mut Document, report: &mut Report) {
        let Some(process) = document.process_mut() else {
            return;
        };
        for node in process.elements_mut().filter(|e| is_flow_node(e)) {
            let id = node.attr("id").unwrap_or_default().to_string();
            let tag = node.local_name().to_string();
            let Some(inferred) = infer_target_type(node) else {
                continue;
            };

            if node.find("extensionElements").is_none() {
                let name = qualified(node.prefix(), "extensionElements");
                node.insert_child_before(XmlElement::new(name), |_| true);
                report.push(repaired(Some(&id), "Inserted missing extensionElements"));
            }
            let Some(extension) = node.find_mut("extensionElements") else {
                continue;
            };

            let types = distinct_values(extension, "componentType");
            let target = match types.as_slice() {
                [] => {
                    extension.push_child(property("componentType", inferred.as_str()));
                    report.push(repaired(
                        Some(&id),
                        format!("Inserted componentType '{}' inferred from <{}>", inferred, tag),
                    ));
                    inferred
                }
                [single] => match TargetType::from_str(single) {
                    Ok(target) => target,
                    Err(_) => {
                        report.push(defect(
                            Some(&id),
                            format!("Unknown component type '{}'", single),
                        ));
                        continue;
                    }
                },
                several => {
                    report.push(defect(
                        Some(&id),
                        format!("Conflicting component types: {}", several.iter().join(", ")),
                    ));
                    continue;
                }
            };

            let Some(spec) = template_spec(target) else {
                continue;
            };
            if spec.tag != tag {
                report.push(defect(
                    Some(&id),
                    format!(
                        "Component type '{}' requires a <{}> element, found <{}>",
                        target, spec.tag, tag
                    ),
                ));
                continue;
            }

            if distinct_values(extension, "activityType").is_empty() {
                extension.push_child(property("activityType", spec.activity_type));
                report.push(repaired(
                    Some(&id),
                    format!("Inserted activityType '{}'", spec.activity_type),
                ));
            }

            for (key, default) in spec.mandatory {
                match distinct_values(extension, key).as_slice() {
                    [] => {
                        extension.push_child(property(key, default));
                        report.push(repaired(
                            Some(&id),
                            format!("Inserted mandatory property '{}' = '{}'", key, default),
                        ));
                    }
                    [single] if single.trim().is_empty() => {
                        set_property_value(extension, key, default);
                        report.push(repaired(
                            Some(&id),
                            format!("Filled empty mandatory property '{}' with '{}'", key, default),
                        ));
                    }
                    [_] => {}
                    several => report.push(defect(
                        Some(&id),
                        format!(
                            "Mandatory property '{}' has conflicting values: {}",
                            key,
                            several.iter().join(", ")
                        ),
                    )),
                }
            }
        }
    }
}

/// Distinct values stored under `key`, in first-seen order.
fn distinct_values(extension: &XmlElement, key: &str) -> Vec<String> {
    properties(extension)
        .into_iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v)
        .unique()
        .collect()
}

fn set_property_value(extension: &mut XmlElement, key: &str, value: &str) {
    for entry in extension.elements_mut() {
        if entry.local_name() != "property" || entry.find("key").map(XmlElement::text).as_deref() != Some(key) {
            continue;
        }
        match entry.find_mut("value") {
            Some(existing) => existing.children = vec![XmlNode::Text(value.to_string())],
            None => entry.push_child(XmlElement::text_element("value", value)),
        }
    }
}

impl RepairCheck for StartCountCheck {
    fn name(&self) -> &'static str {
        "start-count"
    }

    fn apply(&self, document: &mut Document, report: &mut Report) {
        let starts: Vec<String> = document
            .flow_nodes()
            .filter(|e| e.local_name() == "startEvent")
            .map(|e| e.attr("id").unwrap_or_default().to_string())
            .collect();
        match starts.len() {
            1 => {}
            0 => report.push(defect(None, "Flow has no start event")),
            n => report.push(defect(
                None,
                format!("Flow has {} start events: {}", n, starts.join(", ")),
            )),
        }
    }
}
