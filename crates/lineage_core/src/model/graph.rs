//! Arena-backed family graph.
//!
//! # Responsibility
//! - Own person nodes and typed edges for one import run.
//! - Provide id lookup and per-node adjacency without owning cross-references.
//!
//! # Invariants
//! - `index[id]` always points at the node holding `id`.
//! - Every `EdgeIndex` stored in adjacency lists is valid for `edges`.
//! - Edges with a missing target stay in the arena; they are never dropped.

use crate::model::person::{Person, PersonId};
use crate::model::relation::{EdgeOrigin, EdgeValidity, RelationId, RelationType};
use serde::Serialize;
use std::collections::HashMap;

/// Arena position of a person node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeIndex(pub usize);

/// Arena position of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeIndex(pub usize);

/// Edge endpoint after target resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum EdgeTarget {
    Node(NodeIndex),
    /// Target id did not match any person in the batch.
    Missing(PersonId),
}

/// Typed, directed relation edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub id: RelationId,
    pub source: NodeIndex,
    pub target: EdgeTarget,
    pub kind: RelationType,
    pub origin: EdgeOrigin,
    pub validity: EdgeValidity,
    /// Ids of later declarations collapsed into this edge.
    pub duplicate_ids: Vec<RelationId>,
}

impl Edge {
    pub fn target_node(&self) -> Option<NodeIndex> {
        match self.target {
            EdgeTarget::Node(index) => Some(index),
            EdgeTarget::Missing(_) => None,
        }
    }

    pub fn is_self_reference(&self) -> bool {
        self.target_node() == Some(self.source)
    }

    pub fn is_valid(&self) -> bool {
        self.validity == EdgeValidity::Valid
    }
}

/// Relation projected back onto its owning person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRelation {
    pub id: RelationId,
    #[serde(rename = "type")]
    pub kind: RelationType,
    pub person_id: PersonId,
    pub origin: EdgeOrigin,
    pub validity: EdgeValidity,
}

/// Person nodes plus typed edges, indexed by stable id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyGraph {
    nodes: Vec<Person>,
    index: HashMap<PersonId, NodeIndex>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeIndex>>,
}

impl FamilyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node, or returns the existing index when the id is taken.
    pub fn add_person(&mut self, person: Person) -> Result<NodeIndex, NodeIndex> {
        if let Some(existing) = self.index.get(&person.id) {
            return Err(*existing);
        }
        let node = NodeIndex(self.nodes.len());
        self.index.insert(person.id.clone(), node);
        self.nodes.push(person);
        self.outgoing.push(Vec::new());
        Ok(node)
    }

    pub(crate) fn push_edge(&mut self, edge: Edge) -> EdgeIndex {
        let index = EdgeIndex(self.edges.len());
        self.outgoing[edge.source.0].push(index);
        self.edges.push(edge);
        index
    }

    pub(crate) fn edge_mut(&mut self, index: EdgeIndex) -> &mut Edge {
        &mut self.edges[index.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn lookup(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn person(&self, node: NodeIndex) -> &Person {
        &self.nodes[node.0]
    }

    pub fn persons(&self) -> &[Person] {
        &self.nodes
    }

    pub fn edge(&self, index: EdgeIndex) -> &Edge {
        &self.edges[index.0]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Outgoing edges of `node` in insertion order.
    pub fn outgoing(&self, node: NodeIndex) -> impl Iterator<Item = (EdgeIndex, &Edge)> + '_ {
        self.outgoing[node.0]
            .iter()
            .map(move |index| (*index, &self.edges[index.0]))
    }

    /// Id of the person an edge points at, resolved or not.
    pub fn target_id<'a>(&'a self, edge: &'a Edge) -> &'a str {
        match &edge.target {
            EdgeTarget::Node(node) => self.nodes[node.0].id.as_str(),
            EdgeTarget::Missing(id) => id.as_str(),
        }
    }

    /// Relations owned by `id`, declared and inferred, in edge order.
    pub fn relations_of(&self, id: &str) -> Vec<PersonRelation> {
        let Some(node) = self.lookup(id) else {
            return Vec::new();
        };
        self.outgoing(node)
            .map(|(_, edge)| PersonRelation {
                id: edge.id.clone(),
                kind: edge.kind,
                person_id: self.target_id(edge).to_string(),
                origin: edge.origin,
                validity: edge.validity,
            })
            .collect()
    }
}
