//! Integrity checker: graph validation and summary construction.
//!
//! # Responsibility
//! - Report dangling targets, self references, ancestry cycles and
//!   collapsed duplicate declarations.
//! - Merge all stage issues into one ordered report and seal the summary.
//!
//! # Invariants
//! - The graph is never mutated; problems are only reported.
//! - Issue order: normalizer, resolver, then dangling, self, cycle, duplicate.
//! - Same input always yields the same summary.

mod cycle;

use crate::cancel::CancellationFlag;
use crate::model::graph::{Edge, FamilyGraph, NodeIndex};
use crate::model::issue::{ImportIssue, IssueKind, RecordRef};
use crate::model::summary::{ImportSummary, SummaryCounts};
use crate::normalize::NormalizedBatch;
use crate::resolve::Resolution;
use cycle::cycle_closing_edges;
use log::{info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors that abort a check pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// Caller set the cancellation flag; the pass stopped early.
    Cancelled { visited: usize },
}

impl Display for CheckError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled { visited } => {
                write!(f, "integrity check cancelled after {visited} node visits")
            }
        }
    }
}

impl Error for CheckError {}

/// Validates `resolution` and builds the run summary.
///
/// # Errors
/// - Returns `CheckError::Cancelled` when `cancel` is set before the cycle
///   pass finishes.
pub fn check(
    normalized: &NormalizedBatch,
    resolution: &Resolution,
    cancel: &CancellationFlag,
) -> Result<ImportSummary, CheckError> {
    let started_at = Instant::now();
    let graph = &resolution.graph;

    let mut issues: Vec<ImportIssue> = normalized.issues.clone();
    issues.extend(resolution.issues.iter().cloned());

    for edge in graph.edges() {
        if edge.target_node().is_none() {
            issues.push(ImportIssue::new(
                IssueKind::DanglingReference,
                relation_ref(graph, edge),
                format!(
                    "{} -{}-> {} points at a person missing from the batch",
                    graph.person(edge.source).id,
                    edge.kind,
                    graph.target_id(edge)
                ),
            ));
        }
    }
    let story_members = check_story_members(normalized, graph, &mut issues);

    for edge in graph.edges().iter().filter(|edge| edge.is_self_reference()) {
        issues.push(ImportIssue::new(
            IssueKind::SelfReference,
            relation_ref(graph, edge),
            format!(
                "{} lists themselves as {}",
                graph.person(edge.source).id,
                edge.kind
            ),
        ));
    }

    let closing = match cycle_closing_edges(graph, cancel) {
        Ok(closing) => closing,
        Err(err) => {
            warn!(
                "event=integrity_check module=check status=cancelled duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }
    };
    let mut cyclic_pairs: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    for index in &closing {
        let edge = graph.edge(*index);
        if let Some(pair) = logical_pair(edge) {
            cyclic_pairs.insert(pair);
        }
        issues.push(ImportIssue::new(
            IssueKind::CycleDetected,
            relation_ref(graph, edge),
            format!(
                "{} -{}-> {} closes an ancestry loop; a person cannot be their own ancestor",
                graph.person(edge.source).id,
                edge.kind,
                graph.target_id(edge)
            ),
        ));
    }

    for edge in graph.edges().iter().filter(|edge| !edge.duplicate_ids.is_empty()) {
        issues.push(ImportIssue::new(
            IssueKind::DuplicateRelation,
            relation_ref(graph, edge),
            format!(
                "declared again as {}; collapsed into one relation",
                edge.duplicate_ids.join(", ")
            ),
        ));
    }

    let relationships: HashSet<(NodeIndex, NodeIndex)> = graph
        .edges()
        .iter()
        .filter(|edge| edge.is_valid() && !edge.is_self_reference())
        .filter_map(logical_pair)
        .filter(|pair| !cyclic_pairs.contains(pair))
        .collect();

    let counts = SummaryCounts {
        members: graph.node_count(),
        relationships: relationships.len(),
        stories: normalized.stories.len(),
        locations: normalized.locations.len(),
        media: normalized.media.len(),
        artifacts: normalized.artifacts.len(),
        story_members,
    };
    let summary = ImportSummary::new(counts, issues);

    info!(
        "event=integrity_check module=check status=ok members={} relationships={} errors={} fatal={} warnings={} duration_ms={}",
        summary.members(),
        summary.relationships(),
        summary.error_count(),
        summary.fatal_count(),
        summary.warnings().len(),
        started_at.elapsed().as_millis()
    );
    Ok(summary)
}

/// Counts resolvable story links and reports the rest as dangling.
fn check_story_members(
    normalized: &NormalizedBatch,
    graph: &FamilyGraph,
    issues: &mut Vec<ImportIssue>,
) -> usize {
    let mut linked = 0usize;
    for story in &normalized.stories {
        for member in &story.member_ids {
            if graph.contains(member) {
                linked += 1;
                continue;
            }
            issues.push(ImportIssue::new(
                IssueKind::DanglingReference,
                RecordRef::StoryMember {
                    story: story.id.clone(),
                    person: member.clone(),
                },
                format!("story {} mentions unknown person {member}", story.id),
            ));
        }
    }
    linked
}

fn relation_ref(graph: &FamilyGraph, edge: &Edge) -> RecordRef {
    RecordRef::Relation {
        id: edge.id.clone(),
        source: graph.person(edge.source).id.clone(),
        target: graph.target_id(edge).to_string(),
    }
}

fn logical_pair(edge: &Edge) -> Option<(NodeIndex, NodeIndex)> {
    let target = edge.target_node()?;
    Some((edge.source.min(target), edge.source.max(target)))
}
