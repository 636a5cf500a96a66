//! Core import pipeline for Lineage family trees.
//! Raw member records go in; a validated relationship graph plus an
//! `ImportSummary` come out. This crate is the single source of truth for
//! graph invariants.

pub mod cancel;
pub mod check;
pub mod config;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod repo;
pub mod resolve;
pub mod service;

pub use cancel::CancellationFlag;
pub use check::{check, CheckError};
pub use config::{CommitPolicy, ImportOptions, SourceFormat};
pub use logging::{
    default_log_level, init_logging, logging_status, ActiveLogging, LogSettings, LoggingError,
};
pub use model::graph::{Edge, EdgeIndex, EdgeTarget, FamilyGraph, NodeIndex, PersonRelation};
pub use model::issue::{Collection, ImportIssue, IssueKind, RecordRef, Severity};
pub use model::person::{Gender, Person, PersonDraft, PersonId};
pub use model::relation::{EdgeOrigin, EdgeValidity, Relation, RelationId, RelationType};
pub use model::summary::{ImportSummary, SummaryCounts};
pub use normalize::{normalize_batch, normalize_records, ImportBatch, NormalizedBatch, RawRecord};
pub use repo::graph_sink::{CommittedImport, GraphSink, InMemoryGraphSink, SinkError, SinkResult};
pub use resolve::{resolve, Resolution};
pub use service::import_run::{CompletionStatus, ImportRun, ImportStage, StageTransitionError};
pub use service::import_service::{
    ImportContext, ImportOutcome, ImportService, ImportServiceError,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
