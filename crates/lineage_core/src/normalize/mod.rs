//! Record normalizer: untyped import rows to canonical drafts.
//!
//! # Responsibility
//! - Turn raw JSON/CSV/XLSX-derived rows into strict `PersonDraft`s.
//! - Accept auxiliary collections so summary counts are backed by data.
//!
//! # Invariants
//! - A single bad row never aborts the batch.
//! - Issues are emitted in source row order and reference row indices.
//! - Relations are carried as declared; nothing is resolved here.

pub mod collections;
pub(crate) mod fields;
mod member;

use crate::config::{ImportOptions, SourceFormat};
use crate::model::issue::{Collection, ImportIssue, IssueKind, RecordRef};
use crate::model::person::PersonDraft;
use collections::{normalize_entities, normalize_stories, EntityDraft, StoryDraft};
use log::info;
use member::normalize_member;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Instant;

/// One raw record: string keys to untyped values.
pub type RawRecord = serde_json::Map<String, Value>;

/// Raw rows of one import submission, grouped by collection.
///
/// Rows are kept as `Value` so non-object rows surface as row errors
/// instead of failing the whole batch. Unknown top-level keys are rejected,
/// so a misnamed collection is never read as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportBatch {
    pub members: Vec<Value>,
    pub stories: Vec<Value>,
    pub locations: Vec<Value>,
    pub media: Vec<Value>,
    pub artifacts: Vec<Value>,
}

impl ImportBatch {
    /// Batch holding member records only.
    pub fn from_members(members: Vec<Value>) -> Self {
        Self {
            members,
            ..Self::default()
        }
    }

    /// Accepts either a bare member array or an object of collections.
    ///
    /// # Errors
    /// - Objects with keys other than the known collections, or collections
    ///   that are not arrays.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Array(members) => Ok(Self::from_members(members)),
            other => serde_json::from_value(other),
        }
    }

    pub fn row_count(&self) -> usize {
        self.members.len()
            + self.stories.len()
            + self.locations.len()
            + self.media.len()
            + self.artifacts.len()
    }
}

/// Normalizer output for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedBatch {
    pub format: SourceFormat,
    pub members: Vec<PersonDraft>,
    pub stories: Vec<StoryDraft>,
    pub locations: Vec<EntityDraft>,
    pub media: Vec<EntityDraft>,
    pub artifacts: Vec<EntityDraft>,
    /// Row-level errors and warnings in row order, members first.
    pub issues: Vec<ImportIssue>,
}

impl NormalizedBatch {
    /// Wraps already-normalized drafts, e.g. for re-running later stages.
    pub fn from_drafts(members: Vec<PersonDraft>) -> Self {
        Self {
            members,
            ..Self::default()
        }
    }
}

/// Normalizes every collection of `batch`.
pub fn normalize_batch(batch: &ImportBatch, options: &ImportOptions) -> NormalizedBatch {
    let started_at = Instant::now();
    let mut normalized = normalize_records(&batch.members, options);

    let mut issues = Vec::new();
    normalized.stories = normalize_stories(&batch.stories, &mut issues);
    normalized.locations = normalize_entities(Collection::Locations, &batch.locations, &mut issues);
    normalized.media = normalize_entities(Collection::Media, &batch.media, &mut issues);
    normalized.artifacts = normalize_entities(Collection::Artifacts, &batch.artifacts, &mut issues);
    normalized.issues.extend(issues);

    info!(
        "event=normalize module=normalize status=ok format={} rows={} members={} stories={} issues={} duration_ms={}",
        options.format.as_str(),
        batch.row_count(),
        normalized.members.len(),
        normalized.stories.len(),
        normalized.issues.len(),
        started_at.elapsed().as_millis()
    );
    normalized
}

/// Normalizes member rows declared with `options.format`.
///
/// Rows without an id, or repeating an earlier id, are skipped and reported
/// with their row index; all other rows continue.
pub fn normalize_records(records: &[Value], options: &ImportOptions) -> NormalizedBatch {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    let mut members = Vec::with_capacity(records.len());

    for (row, value) in records.iter().enumerate() {
        let Some(draft) = normalize_member(row, value, options, &mut issues) else {
            continue;
        };
        if !seen.insert(draft.id().to_string()) {
            issues.push(ImportIssue::new(
                IssueKind::DuplicateIdentifier,
                RecordRef::Row {
                    collection: Collection::Members,
                    index: row,
                },
                format!("member id `{}` already imported; skipped", draft.person.id),
            ));
            continue;
        }
        members.push(draft);
    }

    NormalizedBatch {
        format: options.format,
        members,
        issues,
        ..NormalizedBatch::default()
    }
}
