use lineage_core::{
    normalize_batch, CancellationFlag, CommitPolicy, CompletionStatus, FamilyGraph, GraphSink,
    ImportBatch, ImportContext, ImportOptions, ImportService, ImportServiceError, ImportStage,
    ImportSummary, InMemoryGraphSink, IssueKind, SinkError, SinkResult,
};
use serde_json::{json, Value};

fn batch(raw: Value) -> ImportBatch {
    ImportBatch::from_value(raw).unwrap()
}

fn family() -> ImportBatch {
    batch(json!({
        "members": [
            { "id": "1", "firstName": "Ada", "relations": [{ "type": "child", "personId": "2" }] },
            { "id": "2", "firstName": "Byron", "spouse": "3" },
            { "id": "3", "firstName": "Anne" }
        ],
        "stories": [{ "id": "s1", "memberIds": ["1", "3"] }]
    }))
}

struct RefusingSink;

impl GraphSink for RefusingSink {
    fn commit(&mut self, _graph: FamilyGraph, _summary: &ImportSummary) -> SinkResult<()> {
        Err(SinkError::Unavailable("offline".to_string()))
    }
}

#[test]
fn empty_batch_completes_with_zero_counts() {
    let service = ImportService::new(InMemoryGraphSink::new());
    let outcome = service
        .import(&ImportBatch::default(), &ImportContext::default())
        .unwrap();

    assert_eq!(outcome.stage(), ImportStage::Completed(CompletionStatus::Success));
    let summary = outcome.summary();
    assert_eq!(summary.members(), 0);
    assert_eq!(summary.relationships(), 0);
    assert_eq!(summary.stories(), 0);
    assert_eq!(summary.error_count(), 0);
}

#[test]
fn clean_family_is_committed() {
    let mut service = ImportService::new(InMemoryGraphSink::new());
    let summary = service
        .import_and_commit(&family(), &ImportContext::default())
        .unwrap();

    assert_eq!(summary.members(), 3);
    assert_eq!(summary.relationships(), 2);
    assert_eq!(summary.stories(), 1);
    assert_eq!(summary.story_members(), 2);
    assert_eq!(summary.error_count(), 0);

    let committed = service.sink().last().unwrap();
    assert_eq!(committed.summary, summary);
    assert_eq!(committed.graph.node_count(), 3);
    assert_eq!(committed.graph.edge_count(), 4);
}

#[test]
fn repeated_runs_produce_identical_graphs_and_summaries() {
    let service = ImportService::new(InMemoryGraphSink::new());
    let ctx = ImportContext::default();

    let first = service.import(&family(), &ctx).unwrap();
    let second = service.import(&family(), &ctx).unwrap();

    assert_ne!(first.run_id(), second.run_id());
    assert_eq!(first.graph(), second.graph());
    assert_eq!(first.summary(), second.summary());
}

#[test]
fn normalized_input_can_be_imported_repeatedly() {
    let service = ImportService::new(InMemoryGraphSink::new());
    let ctx = ImportContext::default();
    let normalized = normalize_batch(&family(), &ImportOptions::default());

    let first = service.import_normalized(&normalized, &ctx).unwrap();
    let second = service.import_normalized(&normalized, &ctx).unwrap();

    assert_eq!(first.stage(), ImportStage::Completed(CompletionStatus::Success));
    assert_eq!(first.stage(), second.stage());
    assert_eq!(first.graph(), second.graph());
    assert_eq!(first.summary(), second.summary());
    assert_eq!(first.summary().errors(), second.summary().errors());
    assert_eq!(first.summary().warnings(), second.summary().warnings());
    assert_eq!(first.summary().relationships(), 2);
}

#[test]
fn reused_relation_ids_are_warnings_not_errors() {
    let mut service = ImportService::new(InMemoryGraphSink::new());
    let raw = batch(json!([
        { "id": "1", "relations": [{ "id": "r1", "type": "child", "personId": "2" }] },
        { "id": "2" },
        { "id": "3", "relations": [{ "id": "r1", "type": "spouse", "personId": "2" }] }
    ]));

    let summary = service
        .import_and_commit(&raw, &ImportContext::default())
        .unwrap();

    assert_eq!(summary.error_count(), 0);
    assert_eq!(summary.relationships(), 2);
    let kinds: Vec<IssueKind> = summary.warnings().iter().map(|issue| issue.kind).collect();
    assert_eq!(kinds, vec![IssueKind::DuplicateRelationId]);
    assert_eq!(service.sink().last().unwrap().graph.edge_count(), 4);
}

#[test]
fn fatal_errors_block_commit_by_default() {
    let mut service = ImportService::new(InMemoryGraphSink::new());
    let dangling = batch(json!([
        { "id": "1", "relations": [{ "type": "child", "personId": "99" }] }
    ]));
    let ctx = ImportContext::default();

    let outcome = service.import(&dangling, &ctx).unwrap();
    assert_eq!(
        outcome.stage(),
        ImportStage::Completed(CompletionStatus::WithErrors)
    );
    assert!(!outcome.is_committable(CommitPolicy::RejectFatal));

    let err = service.commit(outcome, CommitPolicy::RejectFatal).unwrap_err();
    assert!(matches!(
        err,
        ImportServiceError::CommitBlocked { fatal_errors: 1 }
    ));
    assert!(service.sink().commits().is_empty());
}

#[test]
fn allow_fatal_commits_the_flagged_graph() {
    let mut service = ImportService::new(InMemoryGraphSink::new());
    let dangling = batch(json!([
        { "id": "1", "relations": [{ "type": "child", "personId": "99" }] }
    ]));
    let mut options = ImportOptions::default();
    options.commit_policy = CommitPolicy::AllowFatal;

    let summary = service
        .import_and_commit(&dangling, &ImportContext::new(options))
        .unwrap();

    assert_eq!(summary.errors()[0].kind, IssueKind::DanglingReference);
    assert_eq!(service.sink().commits().len(), 1);
}

#[test]
fn recovered_errors_do_not_block_commit() {
    let mut service = ImportService::new(InMemoryGraphSink::new());
    let partial = batch(json!([{ "id": "1" }, { "firstName": "anonymous" }]));

    let outcome = service.import(&partial, &ImportContext::default()).unwrap();
    assert_eq!(
        outcome.stage(),
        ImportStage::Completed(CompletionStatus::WithErrors)
    );
    assert!(!outcome.summary().has_fatal_errors());

    let summary = service.commit(outcome, CommitPolicy::RejectFatal).unwrap();
    assert_eq!(summary.error_count(), 1);
    assert_eq!(summary.members(), 1);
}

#[test]
fn cancelled_run_yields_no_outcome() {
    let service = ImportService::new(InMemoryGraphSink::new());
    let cancel = CancellationFlag::new();
    let ctx = ImportContext::default().with_cancellation(cancel.clone());
    cancel.cancel();

    let err = service.import(&family(), &ctx).unwrap_err();
    match err {
        ImportServiceError::Cancelled { stage } => assert_eq!(stage, ImportStage::Normalizing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn sink_failure_is_surfaced() {
    let mut service = ImportService::new(RefusingSink);
    let err = service
        .import_and_commit(&family(), &ImportContext::default())
        .unwrap_err();

    assert!(matches!(err, ImportServiceError::Sink(SinkError::Unavailable(_))));
    assert!(err.to_string().contains("offline"));
}

#[test]
fn borrowed_sink_keeps_commits_with_the_caller() {
    let mut sink = InMemoryGraphSink::new();
    {
        let mut service = ImportService::new(&mut sink);
        service
            .import_and_commit(&family(), &ImportContext::default())
            .unwrap();
    }
    assert_eq!(sink.commits().len(), 1);
}
