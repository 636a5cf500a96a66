//! Relationship resolver: declared relations to a symmetric graph.
//!
//! # Responsibility
//! - Resolve relation targets against the draft set.
//! - Collapse repeated declarations and synthesize missing inverses.
//! - Keep relation ids unique across the batch.
//! - Report pairs whose declarations contradict each other.
//!
//! # Invariants
//! - One pass over declared relations; pair bookkeeping is per unordered pair.
//! - Unresolvable targets stay as `EdgeTarget::Missing` edges.
//! - Contradictory pairs keep every declared edge, flagged, with no inference.
//! - Output order depends only on input order.

use crate::model::graph::{Edge, EdgeIndex, EdgeTarget, FamilyGraph, NodeIndex};
use crate::model::issue::{Collection, ImportIssue, IssueKind, RecordRef};
use crate::model::person::{PersonDraft, PersonId};
use crate::model::relation::{
    declared_relation_id, inferred_relation_id, EdgeOrigin, EdgeValidity, RelationId,
    RelationType,
};
use log::info;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Resolver output: the graph plus resolver-level issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub graph: FamilyGraph,
    /// `DuplicateIdentifier` for repeated draft ids, `DuplicateRelationId`
    /// for re-keyed relations, then one `ContradictoryRelation` per
    /// conflicting pair.
    pub issues: Vec<ImportIssue>,
}

/// What one declaration says about an unordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairFact {
    ParentOf { parent: NodeIndex, child: NodeIndex },
    Spouses,
}

impl PairFact {
    fn of(source: NodeIndex, target: NodeIndex, kind: RelationType) -> Self {
        match kind {
            RelationType::Parent => Self::ParentOf {
                parent: target,
                child: source,
            },
            RelationType::Child => Self::ParentOf {
                parent: source,
                child: target,
            },
            RelationType::Spouse => Self::Spouses,
        }
    }
}

/// Declared edges between one unordered pair, in declaration order.
#[derive(Debug)]
struct PairRecord {
    low: NodeIndex,
    high: NodeIndex,
    declared: Vec<EdgeIndex>,
}

/// Builds the family graph from normalized drafts.
pub fn resolve(drafts: &[PersonDraft]) -> Resolution {
    let started_at = Instant::now();
    let mut graph = FamilyGraph::new();
    let mut issues = Vec::new();

    let mut accepted: Vec<(NodeIndex, &PersonDraft)> = Vec::with_capacity(drafts.len());
    for draft in drafts {
        match graph.add_person(draft.person.clone()) {
            Ok(node) => accepted.push((node, draft)),
            Err(_) => issues.push(ImportIssue::new(
                IssueKind::DuplicateIdentifier,
                RecordRef::Person {
                    id: draft.id().to_string(),
                },
                format!(
                    "member id `{}` appears more than once; later draft ignored",
                    draft.id()
                ),
            )),
        }
    }

    let mut declared_by_key: HashMap<(NodeIndex, PersonId, RelationType), EdgeIndex> =
        HashMap::new();
    let mut pair_slots: HashMap<(NodeIndex, NodeIndex), usize> = HashMap::new();
    let mut pairs: Vec<PairRecord> = Vec::new();
    let mut used_ids: HashSet<RelationId> = HashSet::new();
    let mut declared_count = 0usize;
    let mut duplicate_count = 0usize;
    let mut rekeyed_count = 0usize;

    for (source, draft) in accepted {
        for (position, relation) in draft.relations.iter().enumerate() {
            let relation_id = if used_ids.insert(relation.id.clone()) {
                relation.id.clone()
            } else {
                let rekeyed =
                    declared_relation_id(draft.id(), position, relation.kind, &relation.target);
                issues.push(ImportIssue::new(
                    IssueKind::DuplicateRelationId,
                    RecordRef::Row {
                        collection: Collection::Members,
                        index: draft.row,
                    },
                    format!(
                        "relation id `{}` is already used; re-keyed as {rekeyed}",
                        relation.id
                    ),
                ));
                used_ids.insert(rekeyed.clone());
                rekeyed_count += 1;
                rekeyed
            };

            let key = (source, relation.target.clone(), relation.kind);
            if let Some(existing) = declared_by_key.get(&key) {
                graph.edge_mut(*existing).duplicate_ids.push(relation_id);
                duplicate_count += 1;
                continue;
            }

            let target = match graph.lookup(&relation.target) {
                Some(node) => EdgeTarget::Node(node),
                None => EdgeTarget::Missing(relation.target.clone()),
            };
            let resolved = match target {
                EdgeTarget::Node(node) => Some(node),
                EdgeTarget::Missing(_) => None,
            };
            let index = graph.push_edge(Edge {
                id: relation_id,
                source,
                target,
                kind: relation.kind,
                origin: EdgeOrigin::Declared,
                validity: EdgeValidity::Valid,
                duplicate_ids: Vec::new(),
            });
            declared_by_key.insert(key, index);
            declared_count += 1;

            if let Some(target) = resolved.filter(|target| *target != source) {
                let pair = (source.min(target), source.max(target));
                let slot = *pair_slots.entry(pair).or_insert_with(|| {
                    pairs.push(PairRecord {
                        low: pair.0,
                        high: pair.1,
                        declared: Vec::new(),
                    });
                    pairs.len() - 1
                });
                pairs[slot].declared.push(index);
            }
        }
    }

    let mut inferred_count = 0usize;
    let mut contradiction_count = 0usize;
    for pair in &pairs {
        let mut facts: Vec<PairFact> = Vec::new();
        for index in &pair.declared {
            let edge = graph.edge(*index);
            let Some(target) = edge.target_node() else {
                continue;
            };
            let fact = PairFact::of(edge.source, target, edge.kind);
            if !facts.contains(&fact) {
                facts.push(fact);
            }
        }

        if facts.len() > 1 {
            issues.push(contradiction_issue(&graph, pair));
            for index in &pair.declared {
                graph.edge_mut(*index).validity = EdgeValidity::Contradictory;
            }
            contradiction_count += 1;
            continue;
        }

        let covers = |graph: &FamilyGraph, from: NodeIndex| {
            pair.declared
                .iter()
                .any(|index| graph.edge(*index).source == from)
        };
        let (low_declared, high_declared) = (covers(&graph, pair.low), covers(&graph, pair.high));
        if low_declared && high_declared {
            continue;
        }

        let Some(first) = pair.declared.first().copied() else {
            continue;
        };
        let declared = graph.edge(first);
        let Some(inverse_source) = declared.target_node() else {
            continue;
        };
        let inverse = Edge {
            id: inferred_relation_id(
                &declared.id,
                &graph.person(inverse_source).id,
                &graph.person(declared.source).id,
            ),
            source: inverse_source,
            target: EdgeTarget::Node(declared.source),
            kind: declared.kind.inverse(),
            origin: EdgeOrigin::Inferred,
            validity: EdgeValidity::Valid,
            duplicate_ids: Vec::new(),
        };
        graph.push_edge(inverse);
        inferred_count += 1;
    }

    info!(
        "event=resolve module=resolve status=ok nodes={} declared={} inferred={} duplicates={} rekeyed={} contradictions={} duration_ms={}",
        graph.node_count(),
        declared_count,
        inferred_count,
        duplicate_count,
        rekeyed_count,
        contradiction_count,
        started_at.elapsed().as_millis()
    );

    Resolution { graph, issues }
}

fn contradiction_issue(graph: &FamilyGraph, pair: &PairRecord) -> ImportIssue {
    let declarations = pair
        .declared
        .iter()
        .map(|index| {
            let edge = graph.edge(*index);
            format!(
                "{} -{}-> {}",
                graph.person(edge.source).id,
                edge.kind,
                graph.target_id(edge)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let first = graph.person(pair.low).id.clone();
    let second = graph.person(pair.high).id.clone();
    ImportIssue::new(
        IssueKind::ContradictoryRelation,
        RecordRef::Pair {
            first: first.clone(),
            second: second.clone(),
        },
        format!("relations between {first} and {second} disagree: {declarations}"),
    )
}

#[cfg(test)]
mod tests {
    use super::resolve;
    use crate::model::person::{Person, PersonDraft};
    use crate::model::relation::{EdgeOrigin, EdgeValidity, Relation, RelationType};

    fn draft(row: usize, id: &str, relations: &[(&str, RelationType, &str)]) -> PersonDraft {
        let mut draft = PersonDraft::new(row, Person::new(id));
        draft.relations = relations
            .iter()
            .map(|(rel_id, kind, target)| Relation::new(*rel_id, *kind, *target))
            .collect();
        draft
    }

    #[test]
    fn spouse_inverse_is_inferred_once() {
        let drafts = vec![
            draft(0, "a", &[("r1", RelationType::Spouse, "b")]),
            draft(1, "b", &[]),
        ];
        let resolution = resolve(&drafts);

        assert!(resolution.issues.is_empty());
        let edges = resolution.graph.edges();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].origin, EdgeOrigin::Inferred);
        assert_eq!(edges[1].kind, RelationType::Spouse);
        assert_eq!(resolution.graph.person(edges[1].source).id, "b");
    }

    #[test]
    fn consistent_declarations_in_both_directions_need_no_inference() {
        let drafts = vec![
            draft(0, "a", &[("r1", RelationType::Child, "b")]),
            draft(1, "b", &[("r2", RelationType::Parent, "a")]),
        ];
        let resolution = resolve(&drafts);

        assert!(resolution.issues.is_empty());
        assert_eq!(resolution.graph.edge_count(), 2);
        assert!(resolution
            .graph
            .edges()
            .iter()
            .all(|edge| edge.origin == EdgeOrigin::Declared));
    }

    #[test]
    fn several_types_in_one_direction_are_contradictory() {
        let drafts = vec![
            draft(
                0,
                "a",
                &[("r1", RelationType::Spouse, "b"), ("r2", RelationType::Parent, "b")],
            ),
            draft(1, "b", &[]),
        ];
        let resolution = resolve(&drafts);

        assert_eq!(resolution.issues.len(), 1);
        assert_eq!(resolution.graph.edge_count(), 2);
        assert!(resolution
            .graph
            .edges()
            .iter()
            .all(|edge| edge.validity == EdgeValidity::Contradictory));
    }

    #[test]
    fn repeated_declarations_collapse() {
        let drafts = vec![
            draft(
                0,
                "a",
                &[("r1", RelationType::Child, "b"), ("r2", RelationType::Child, "b")],
            ),
            draft(1, "b", &[]),
        ];
        let resolution = resolve(&drafts);

        let declared = &resolution.graph.edges()[0];
        assert_eq!(declared.duplicate_ids, vec!["r2".to_string()]);
        assert_eq!(resolution.graph.edge_count(), 2);
    }
}
