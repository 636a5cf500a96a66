//! Ancestry cycle detection.
//!
//! # Invariants
//! - Arcs point child -> parent; one arc per ordered node pair.
//! - An arc represented by both a declared and an inferred edge reports the
//!   declared one.
//! - Roots are visited in node order and arcs in edge order, so the reported
//!   closing edges are deterministic.

use crate::cancel::CancellationFlag;
use crate::check::CheckError;
use crate::model::graph::{EdgeIndex, FamilyGraph, NodeIndex};
use crate::model::relation::{EdgeOrigin, RelationType};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Returns every edge that closes an ancestry loop, in discovery order.
pub(crate) fn cycle_closing_edges(
    graph: &FamilyGraph,
    cancel: &CancellationFlag,
) -> Result<Vec<EdgeIndex>, CheckError> {
    let arcs = ancestry_arcs(graph);
    let mut color = vec![Color::White; graph.node_count()];
    let mut closing = Vec::new();
    let mut visited = 0usize;

    for root in 0..graph.node_count() {
        if color[root] != Color::White {
            continue;
        }
        if cancel.is_cancelled() {
            return Err(CheckError::Cancelled { visited });
        }
        color[root] = Color::Grey;
        visited += 1;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(top) = stack.last_mut() {
            let (node, cursor) = *top;
            let Some(&(next, edge)) = arcs[node].get(cursor) else {
                color[node] = Color::Black;
                stack.pop();
                continue;
            };
            top.1 += 1;

            match color[next.0] {
                Color::White => {
                    if cancel.is_cancelled() {
                        return Err(CheckError::Cancelled { visited });
                    }
                    color[next.0] = Color::Grey;
                    visited += 1;
                    stack.push((next.0, 0));
                }
                Color::Grey => closing.push(edge),
                Color::Black => {}
            }
        }
    }

    Ok(closing)
}

/// Child -> parent arcs from valid, resolved, non-self parent/child edges.
fn ancestry_arcs(graph: &FamilyGraph) -> Vec<Vec<(NodeIndex, EdgeIndex)>> {
    let mut arcs: Vec<Vec<(NodeIndex, EdgeIndex)>> = vec![Vec::new(); graph.node_count()];
    let mut slots: HashMap<(NodeIndex, NodeIndex), usize> = HashMap::new();

    for (position, edge) in graph.edges().iter().enumerate() {
        if !edge.is_valid() || edge.is_self_reference() {
            continue;
        }
        let Some(target) = edge.target_node() else {
            continue;
        };
        let (child, parent) = match edge.kind {
            RelationType::Parent => (edge.source, target),
            RelationType::Child => (target, edge.source),
            RelationType::Spouse => continue,
        };

        let index = EdgeIndex(position);
        match slots.get(&(child, parent)) {
            Some(slot) => {
                let (_, current) = arcs[child.0][*slot];
                let prefer_new = graph.edge(current).origin == EdgeOrigin::Inferred
                    && edge.origin == EdgeOrigin::Declared;
                if prefer_new {
                    arcs[child.0][*slot].1 = index;
                }
            }
            None => {
                slots.insert((child, parent), arcs[child.0].len());
                arcs[child.0].push((parent, index));
            }
        }
    }
    arcs
}
