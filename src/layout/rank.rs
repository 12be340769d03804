//! Column (rank) and row assignment.
//!
//! Ranks are longest-path distances over the flow graph with cycle back edges
//! removed, so every remaining edge points strictly rightwards. Nodes reachable
//! from a start over sequence edges form the main grid; everything else goes
//! to the auxiliary lane.

use super::Lane;
use crate::model::{ComponentModel, EdgeId, EdgeKind};
use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;

/// Grid cell of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cell {
    pub rank: usize,
    pub row: usize,
    pub lane: Lane,
}

/// Ranks and rows for every node, keyed by node id, in model order.
pub(crate) struct Grid {
    pub cells: Vec<(String, Cell)>,
    pub back_edges: AHashSet<EdgeId>,
    /// Number of rows used by the main lane.
    pub main_rows: usize,
}

pub(crate) fn assign(model: &ComponentModel) -> Grid {
    let ids: Vec<&str> = model.nodes().map(|n| n.node_id.as_str()).collect();
    let back_edges = find_back_edges(model, &ids);
    let ranks = longest_paths(model, &ids, &back_edges);
    let main_order = main_lane_order(model);

    // Group into (lane, rank) buckets; main rows follow breadth-first order,
    // auxiliary rows follow model order.
    let mut main: Vec<&str> = main_order.keys().copied().collect();
    main.sort_by_key(|id| main_order.get(id).copied().unwrap_or(usize::MAX));
    let aux: Vec<&str> = ids
        .iter()
        .copied()
        .filter(|id| !main_order.contains_key(id))
        .collect();

    let mut cells: AHashMap<&str, Cell> = AHashMap::with_capacity(ids.len());
    let mut main_rows = 0;
    for (lane, members) in [(Lane::Main, &main), (Lane::Auxiliary, &aux)] {
        let mut next_row: AHashMap<usize, usize> = AHashMap::new();
        for &id in members.iter() {
            let rank = ranks.get(id).copied().unwrap_or(0);
            let row = next_row.entry(rank).or_insert(0);
            cells.insert(id, Cell {
                rank,
                row: *row,
                lane,
            });
            *row += 1;
        }
        if lane == Lane::Main {
            main_rows = next_row.values().copied().max().unwrap_or(0);
        }
    }

    Grid {
        cells: ids
            .iter()
            .filter_map(|id| cells.get(id).map(|cell| (id.to_string(), *cell)))
            .collect(),
        back_edges,
        main_rows,
    }
}

/// Breadth-first discovery index of every node reachable from a start over
/// sequence edges.
fn main_lane_order(model: &ComponentModel) -> AHashMap<&str, usize> {
    let mut order: AHashMap<&str, usize> = AHashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for start in model.starts() {
        let id = start.node_id.as_str();
        if !order.contains_key(id) {
            order.insert(id, order.len());
            queue.push_back(id);
        }
    }
    while let Some(id) = queue.pop_front() {
        for edge in model.outgoing(id).filter(|e| e.kind == EdgeKind::Sequence) {
            let target = edge.target_node.as_str();
            if !order.contains_key(target) {
                order.insert(target, order.len());
                queue.push_back(target);
            }
        }
    }
    order
}

/// Edges closing a cycle, found by depth-first search from the starts first
/// and then from the remaining nodes in model order.
fn find_back_edges(model: &ComponentModel, ids: &[&str]) -> AHashSet<EdgeId> {
    let mut back = AHashSet::new();
    let mut on_stack: AHashSet<&str> = AHashSet::new();
    let mut visited: AHashSet<&str> = AHashSet::new();

    let roots = model
        .starts()
        .map(|n| n.node_id.as_str())
        .chain(ids.iter().copied());
    for root in roots {
        if !visited.insert(root) {
            continue;
        }
        on_stack.insert(root);
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        while let Some((node, cursor)) = stack.pop() {
            let Some(edge) = model.outgoing(node).nth(cursor) else {
                on_stack.remove(node);
                continue;
            };
            stack.push((node, cursor + 1));
            let target = edge.target_node.as_str();
            if on_stack.contains(target) {
                back.insert(edge.id.clone());
            } else if visited.insert(target) {
                on_stack.insert(target);
                stack.push((target, 0));
            }
        }
    }
    back
}

/// Longest-path rank of every node over the acyclic remainder of the graph.
fn longest_paths<'a>(
    model: &'a ComponentModel,
    ids: &[&'a str],
    back_edges: &AHashSet<EdgeId>,
) -> AHashMap<&'a str, usize> {
    let forward = |id: &'a str| {
        model
            .outgoing(id)
            .filter(|e| !back_edges.contains(&e.id))
            .map(|e| e.target_node.as_str())
    };

    let mut in_degree: AHashMap<&str, usize> = ids.iter().map(|id| (*id, 0)).collect();
    for &id in ids {
        for target in forward(id) {
            if let Some(d) = in_degree.get_mut(target) {
                *d += 1;
            }
        }
    }

    let mut rank: AHashMap<&str, usize> = ids.iter().map(|id| (*id, 0)).collect();
    let mut ready: VecDeque<&str> = ids
        .iter()
        .copied()
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();
    while let Some(id) = ready.pop_front() {
        let here = rank.get(id).copied().unwrap_or(0);
        for target in forward(id) {
            if let Some(r) = rank.get_mut(target) {
                *r = (*r).max(here + 1);
            }
            if let Some(d) = in_degree.get_mut(target) {
                *d -= 1;
                if *d == 0 {
                    ready.push_back(target);
                }
            }
        }
    }
    rank
}
