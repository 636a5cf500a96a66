//! Per-run import summary.
//!
//! # Invariants
//! - Created once per run by the integrity checker; read-only afterwards.
//! - `error_count == errors.len()`; warnings are listed but not counted.

use crate::model::issue::{ImportIssue, Severity};
use serde::Serialize;

/// Committed-entity counts and diagnostics for one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    members: usize,
    relationships: usize,
    stories: usize,
    locations: usize,
    media: usize,
    artifacts: usize,
    story_members: usize,
    error_count: usize,
    errors: Vec<ImportIssue>,
    warnings: Vec<ImportIssue>,
}

/// Entity counts gathered by the checker before the summary is sealed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryCounts {
    pub members: usize,
    pub relationships: usize,
    pub stories: usize,
    pub locations: usize,
    pub media: usize,
    pub artifacts: usize,
    pub story_members: usize,
}

impl ImportSummary {
    /// Seals counts and issues, splitting warnings from errors in order.
    pub(crate) fn new(counts: SummaryCounts, issues: Vec<ImportIssue>) -> Self {
        let (warnings, errors): (Vec<_>, Vec<_>) = issues
            .into_iter()
            .partition(|issue| issue.severity == Severity::Warning);
        Self {
            members: counts.members,
            relationships: counts.relationships,
            stories: counts.stories,
            locations: counts.locations,
            media: counts.media,
            artifacts: counts.artifacts,
            story_members: counts.story_members,
            error_count: errors.len(),
            errors,
            warnings,
        }
    }

    pub fn members(&self) -> usize {
        self.members
    }

    /// Logical relationships; a symmetric pair counts once.
    pub fn relationships(&self) -> usize {
        self.relationships
    }

    pub fn stories(&self) -> usize {
        self.stories
    }

    pub fn locations(&self) -> usize {
        self.locations
    }

    pub fn media(&self) -> usize {
        self.media
    }

    pub fn artifacts(&self) -> usize {
        self.artifacts
    }

    pub fn story_members(&self) -> usize {
        self.story_members
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Fatal and recovered issues, in report order.
    pub fn errors(&self) -> &[ImportIssue] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ImportIssue] {
        &self.warnings
    }

    pub fn fatal_count(&self) -> usize {
        self.errors.iter().filter(|issue| issue.is_fatal()).count()
    }

    pub fn has_fatal_errors(&self) -> bool {
        self.fatal_count() > 0
    }
}
