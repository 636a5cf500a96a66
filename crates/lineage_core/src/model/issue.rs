//! Import diagnostics.
//!
//! # Responsibility
//! - Describe every problem found during one import run.
//! - Classify problems into fatal, recovered and informational severities.
//!
//! # Invariants
//! - Severity is a pure function of `IssueKind`.
//! - Issues reference source records by stable ids or original row index.

use crate::model::person::PersonId;
use crate::model::relation::RelationId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Kind of problem found while importing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Record has no usable identifier; it was skipped.
    MissingIdentifier,
    /// Record repeats an identifier already seen in the batch; it was skipped.
    DuplicateIdentifier,
    /// A field value could not be mapped; the field was left empty.
    InvalidField,
    /// Record carries fields with no canonical counterpart.
    UnmappedField,
    /// Relation or story link targets a person absent from the batch.
    DanglingReference,
    /// Relation targets its own owner.
    SelfReference,
    /// Declarations between one pair of persons disagree.
    ContradictoryRelation,
    /// Same relation declared more than once; collapsed to one.
    DuplicateRelation,
    /// Relation id already used by another relation; re-keyed.
    DuplicateRelationId,
    /// Parent/child links form an ancestry loop.
    CycleDetected,
}

impl IssueKind {
    pub fn severity(self) -> Severity {
        match self {
            Self::DanglingReference
            | Self::SelfReference
            | Self::ContradictoryRelation
            | Self::CycleDetected => Severity::Fatal,
            Self::MissingIdentifier | Self::DuplicateIdentifier => Severity::Recovered,
            Self::InvalidField
            | Self::UnmappedField
            | Self::DuplicateRelation
            | Self::DuplicateRelationId => Severity::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingIdentifier => "missing_identifier",
            Self::DuplicateIdentifier => "duplicate_identifier",
            Self::InvalidField => "invalid_field",
            Self::UnmappedField => "unmapped_field",
            Self::DanglingReference => "dangling_reference",
            Self::SelfReference => "self_reference",
            Self::ContradictoryRelation => "contradictory_relation",
            Self::DuplicateRelation => "duplicate_relation",
            Self::DuplicateRelationId => "duplicate_relation_id",
            Self::CycleDetected => "cycle_detected",
        }
    }
}

/// How an issue affects the commit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    /// Row-level error; the record was excluded and the batch continued.
    Recovered,
    /// Blocks commit unless the caller overrides.
    Fatal,
}

/// Source record collection of a raw row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Members,
    Stories,
    Locations,
    Media,
    Artifacts,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::Stories => "stories",
            Self::Locations => "locations",
            Self::Media => "media",
            Self::Artifacts => "artifacts",
        }
    }
}

/// Pointer to the record an issue is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ref", rename_all = "snake_case")]
pub enum RecordRef {
    Row {
        collection: Collection,
        index: usize,
    },
    Person {
        id: PersonId,
    },
    Relation {
        id: RelationId,
        source: PersonId,
        target: PersonId,
    },
    Pair {
        first: PersonId,
        second: PersonId,
    },
    StoryMember {
        story: String,
        person: PersonId,
    },
}

impl Display for RecordRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Row { collection, index } => write!(f, "{}[{index}]", collection.as_str()),
            Self::Person { id } => write!(f, "person {id}"),
            Self::Relation { id, source, target } => {
                write!(f, "relation {id} ({source} -> {target})")
            }
            Self::Pair { first, second } => write!(f, "pair ({first}, {second})"),
            Self::StoryMember { story, person } => {
                write!(f, "story {story} member {person}")
            }
        }
    }
}

/// One diagnostic emitted during an import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub record: RecordRef,
    pub message: String,
}

impl ImportIssue {
    pub fn new(kind: IssueKind, record: RecordRef, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            record,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl Display for ImportIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}: {}", self.kind.as_str(), self.record, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::{Collection, ImportIssue, IssueKind, RecordRef, Severity};

    #[test]
    fn severity_follows_kind() {
        assert_eq!(IssueKind::CycleDetected.severity(), Severity::Fatal);
        assert_eq!(IssueKind::MissingIdentifier.severity(), Severity::Recovered);
        assert_eq!(IssueKind::DuplicateRelation.severity(), Severity::Warning);
        assert_eq!(IssueKind::DuplicateRelationId.severity(), Severity::Warning);
    }

    #[test]
    fn display_includes_kind_and_record() {
        let issue = ImportIssue::new(
            IssueKind::MissingIdentifier,
            RecordRef::Row {
                collection: Collection::Members,
                index: 3,
            },
            "record has no id",
        );
        assert_eq!(
            issue.to_string(),
            "missing_identifier at members[3]: record has no id"
        );
        assert!(!issue.is_fatal());
    }
}
