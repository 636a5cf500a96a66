//! Graph sink contract and in-memory implementation.

use crate::model::graph::FamilyGraph;
use crate::model::summary::ImportSummary;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by graph sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Errors reported by a sink while accepting a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Store refused the graph.
    Rejected(String),
    /// Store could not be reached.
    Unavailable(String),
}

impl Display for SinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "graph rejected by store: {reason}"),
            Self::Unavailable(reason) => write!(f, "graph store unavailable: {reason}"),
        }
    }
}

impl Error for SinkError {}

/// Destination for validated graphs.
pub trait GraphSink {
    /// Takes ownership of one validated graph.
    fn commit(&mut self, graph: FamilyGraph, summary: &ImportSummary) -> SinkResult<()>;
}

/// One graph accepted by `InMemoryGraphSink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedImport {
    pub graph: FamilyGraph,
    pub summary: ImportSummary,
}

/// Sink that keeps committed graphs in memory.
#[derive(Debug, Default)]
pub struct InMemoryGraphSink {
    commits: Vec<CommittedImport>,
}

impl InMemoryGraphSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> &[CommittedImport] {
        &self.commits
    }

    pub fn last(&self) -> Option<&CommittedImport> {
        self.commits.last()
    }
}

impl GraphSink for InMemoryGraphSink {
    fn commit(&mut self, graph: FamilyGraph, summary: &ImportSummary) -> SinkResult<()> {
        self.commits.push(CommittedImport {
            graph,
            summary: summary.clone(),
        });
        Ok(())
    }
}

impl<S: GraphSink + ?Sized> GraphSink for &mut S {
    fn commit(&mut self, graph: FamilyGraph, summary: &ImportSummary) -> SinkResult<()> {
        (**self).commit(graph, summary)
    }
}
