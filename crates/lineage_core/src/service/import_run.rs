//! Import run lifecycle.
//!
//! # Responsibility
//! - Track the stage of one import run and log every transition.
//!
//! # Invariants
//! - Stages only move forward: `Pending -> Normalizing -> Resolving ->
//!   Checking -> Completed`.
//! - `Completed` is terminal; a run is never retried.

use log::info;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Final verdict of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Success,
    WithErrors,
}

/// Stage of one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Pending,
    Normalizing,
    Resolving,
    Checking,
    Completed(CompletionStatus),
}

impl ImportStage {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Normalizing => 1,
            Self::Resolving => 2,
            Self::Checking => 3,
            Self::Completed(_) => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Normalizing => "normalizing",
            Self::Resolving => "resolving",
            Self::Checking => "checking",
            Self::Completed(CompletionStatus::Success) => "completed_success",
            Self::Completed(CompletionStatus::WithErrors) => "completed_with_errors",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

impl Display for ImportStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected stage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTransitionError {
    pub from: ImportStage,
    pub to: ImportStage,
}

impl Display for StageTransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid import stage transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for StageTransitionError {}

/// One import run.
#[derive(Debug)]
pub struct ImportRun {
    id: Uuid,
    stage: ImportStage,
    started_at: Instant,
}

impl ImportRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: ImportStage::Pending,
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    /// Moves to the next stage.
    ///
    /// # Errors
    /// - Rejects any move that is not exactly one step forward.
    pub fn advance(&mut self, next: ImportStage) -> Result<(), StageTransitionError> {
        if next.rank() != self.stage.rank() + 1 {
            return Err(StageTransitionError {
                from: self.stage,
                to: next,
            });
        }
        info!(
            "event=import_stage module=import status=ok run_id={} from={} to={} elapsed_ms={}",
            self.id,
            self.stage,
            next,
            self.started_at.elapsed().as_millis()
        );
        self.stage = next;
        Ok(())
    }
}

impl Default for ImportRun {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{CompletionStatus, ImportRun, ImportStage};

    #[test]
    fn stages_advance_one_step_at_a_time() {
        let mut run = ImportRun::new();
        assert_eq!(run.stage(), ImportStage::Pending);
        run.advance(ImportStage::Normalizing).unwrap();
        run.advance(ImportStage::Resolving).unwrap();
        run.advance(ImportStage::Checking).unwrap();
        run.advance(ImportStage::Completed(CompletionStatus::Success))
            .unwrap();
        assert!(run.stage().is_terminal());
    }

    #[test]
    fn skipping_or_rewinding_is_rejected() {
        let mut run = ImportRun::new();
        let err = run.advance(ImportStage::Checking).unwrap_err();
        assert_eq!(err.from, ImportStage::Pending);

        run.advance(ImportStage::Normalizing).unwrap();
        assert!(run.advance(ImportStage::Pending).is_err());
        assert!(run.advance(ImportStage::Normalizing).is_err());
    }

    #[test]
    fn completed_is_terminal() {
        let mut run = ImportRun::new();
        for stage in [
            ImportStage::Normalizing,
            ImportStage::Resolving,
            ImportStage::Checking,
            ImportStage::Completed(CompletionStatus::WithErrors),
        ] {
            run.advance(stage).unwrap();
        }
        assert!(run
            .advance(ImportStage::Completed(CompletionStatus::Success))
            .is_err());
    }
}
