//! Import use-case service.
//!
//! # Responsibility
//! - Run normalize -> resolve -> check in strict sequence for one batch.
//! - Gate hand-over of the validated graph to a `GraphSink`.
//!
//! # Invariants
//! - Every run uses explicit context; the pipeline reads no process globals.
//! - Cancellation is honored between stages and inside the cycle pass; a
//!   cancelled run yields no outcome.
//! - A graph with fatal errors reaches the sink only under
//!   `CommitPolicy::AllowFatal`.

use crate::cancel::CancellationFlag;
use crate::check::{check, CheckError};
use crate::config::{CommitPolicy, ImportOptions};
use crate::model::graph::FamilyGraph;
use crate::model::summary::ImportSummary;
use crate::normalize::{normalize_batch, ImportBatch, NormalizedBatch};
use crate::repo::graph_sink::{GraphSink, SinkError};
use crate::resolve::resolve;
use crate::service::import_run::{
    CompletionStatus, ImportRun, ImportStage, StageTransitionError,
};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Caller-supplied context for one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportContext {
    pub options: ImportOptions,
    cancel: CancellationFlag,
}

impl ImportContext {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            cancel: CancellationFlag::new(),
        }
    }

    /// Shares `cancel` with the caller so it can abort the run.
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }
}

/// Errors from import service operations.
#[derive(Debug)]
pub enum ImportServiceError {
    /// Run was cancelled; nothing was produced.
    Cancelled { stage: ImportStage },
    /// Summary holds fatal errors and policy forbids committing.
    CommitBlocked { fatal_errors: usize },
    /// Sink failed while accepting the graph.
    Sink(SinkError),
    /// Internal lifecycle misuse.
    Stage(StageTransitionError),
}

impl Display for ImportServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled { stage } => write!(f, "import cancelled during {stage}"),
            Self::CommitBlocked { fatal_errors } => write!(
                f,
                "commit blocked: import has {fatal_errors} fatal error(s)"
            ),
            Self::Sink(err) => write!(f, "{err}"),
            Self::Stage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sink(err) => Some(err),
            Self::Stage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SinkError> for ImportServiceError {
    fn from(value: SinkError) -> Self {
        Self::Sink(value)
    }
}

impl From<StageTransitionError> for ImportServiceError {
    fn from(value: StageTransitionError) -> Self {
        Self::Stage(value)
    }
}

/// Completed import run awaiting a commit decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    run_id: Uuid,
    stage: ImportStage,
    graph: FamilyGraph,
    summary: ImportSummary,
}

impl ImportOutcome {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Always `ImportStage::Completed(_)`.
    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    pub fn graph(&self) -> &FamilyGraph {
        &self.graph
    }

    pub fn summary(&self) -> &ImportSummary {
        &self.summary
    }

    pub fn is_committable(&self, policy: CommitPolicy) -> bool {
        policy == CommitPolicy::AllowFatal || !self.summary.has_fatal_errors()
    }

    pub fn into_parts(self) -> (FamilyGraph, ImportSummary) {
        (self.graph, self.summary)
    }
}

/// Import service facade over a graph sink.
pub struct ImportService<S: GraphSink> {
    sink: S,
}

impl<S: GraphSink> ImportService<S> {
    /// Creates service from sink implementation.
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs all stages over a raw batch.
    ///
    /// # Errors
    /// - `Cancelled` when the context flag is set before the run completes.
    pub fn import(
        &self,
        batch: &ImportBatch,
        ctx: &ImportContext,
    ) -> Result<ImportOutcome, ImportServiceError> {
        let mut run = ImportRun::new();
        run.advance(ImportStage::Normalizing)?;
        let normalized = normalize_batch(batch, &ctx.options);
        self.finish(run, &normalized, ctx)
    }

    /// Runs resolve and check over already-normalized input.
    pub fn import_normalized(
        &self,
        normalized: &NormalizedBatch,
        ctx: &ImportContext,
    ) -> Result<ImportOutcome, ImportServiceError> {
        let mut run = ImportRun::new();
        run.advance(ImportStage::Normalizing)?;
        self.finish(run, normalized, ctx)
    }

    /// Hands the graph to the sink when `policy` allows it.
    ///
    /// Returns the run summary on success.
    ///
    /// # Errors
    /// - `CommitBlocked` when fatal errors exist under `RejectFatal`.
    /// - `Sink` when the sink refuses the graph.
    pub fn commit(
        &mut self,
        outcome: ImportOutcome,
        policy: CommitPolicy,
    ) -> Result<ImportSummary, ImportServiceError> {
        let run_id = outcome.run_id;
        if !outcome.is_committable(policy) {
            let fatal_errors = outcome.summary.fatal_count();
            warn!(
                "event=import_commit module=import status=blocked run_id={} fatal_errors={}",
                run_id, fatal_errors
            );
            return Err(ImportServiceError::CommitBlocked { fatal_errors });
        }

        let (graph, summary) = outcome.into_parts();
        if let Err(err) = self.sink.commit(graph, &summary) {
            error!(
                "event=import_commit module=import status=error run_id={} error={}",
                run_id, err
            );
            return Err(err.into());
        }
        info!(
            "event=import_commit module=import status=ok run_id={} members={} relationships={} fatal_errors={}",
            run_id,
            summary.members(),
            summary.relationships(),
            summary.fatal_count()
        );
        Ok(summary)
    }

    /// Imports and commits under the context's commit policy.
    pub fn import_and_commit(
        &mut self,
        batch: &ImportBatch,
        ctx: &ImportContext,
    ) -> Result<ImportSummary, ImportServiceError> {
        let outcome = self.import(batch, ctx)?;
        self.commit(outcome, ctx.options.commit_policy)
    }

    fn finish(
        &self,
        mut run: ImportRun,
        normalized: &NormalizedBatch,
        ctx: &ImportContext,
    ) -> Result<ImportOutcome, ImportServiceError> {
        ensure_not_cancelled(&run, ctx)?;

        run.advance(ImportStage::Resolving)?;
        let resolution = resolve(&normalized.members);
        ensure_not_cancelled(&run, ctx)?;

        run.advance(ImportStage::Checking)?;
        let summary = match check(normalized, &resolution, ctx.cancellation()) {
            Ok(summary) => summary,
            Err(CheckError::Cancelled { .. }) => {
                return Err(cancelled(&run));
            }
        };

        let status = if summary.error_count() == 0 {
            CompletionStatus::Success
        } else {
            CompletionStatus::WithErrors
        };
        run.advance(ImportStage::Completed(status))?;

        Ok(ImportOutcome {
            run_id: run.id(),
            stage: run.stage(),
            graph: resolution.graph,
            summary,
        })
    }
}

fn ensure_not_cancelled(run: &ImportRun, ctx: &ImportContext) -> Result<(), ImportServiceError> {
    if ctx.cancellation().is_cancelled() {
        return Err(cancelled(run));
    }
    Ok(())
}

fn cancelled(run: &ImportRun) -> ImportServiceError {
    warn!(
        "event=import_stage module=import status=cancelled run_id={} stage={}",
        run.id(),
        run.stage()
    );
    ImportServiceError::Cancelled { stage: run.stage() }
}
