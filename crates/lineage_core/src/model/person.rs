//! Person domain model.
//!
//! # Responsibility
//! - Define the canonical person node and its unvalidated draft form.
//!
//! # Invariants
//! - `id` is non-empty after trim and unique within one import batch.
//! - A draft carries relations exactly as declared; nothing is resolved yet.

use crate::model::relation::Relation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable person identifier as supplied by the source data.
pub type PersonId = String;

/// Gender as recorded in the source.
///
/// Well-known values are normalized; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other(String),
}

impl Gender {
    /// Parses free-text gender values.
    ///
    /// Returns `None` for blank input.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "m" | "male" | "man" | "boy" => Some(Self::Male),
            "f" | "female" | "woman" | "girl" => Some(Self::Female),
            _ => Some(Self::Other(trimmed.to_string())),
        }
    }
}

/// Canonical person node stored in the family graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    /// Serialized as ISO `YYYY-MM-DD`.
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    /// Avatar URI, passed through untouched.
    pub avatar: Option<String>,
}

impl Person {
    /// Creates a person with only an id set.
    pub fn new(id: impl Into<PersonId>) -> Self {
        Self {
            id: id.into(),
            first_name: String::new(),
            last_name: String::new(),
            birth_date: None,
            gender: None,
            avatar: None,
        }
    }
}

/// Normalized-but-unvalidated person record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonDraft {
    /// Zero-based index of the source row this draft came from.
    pub row: usize,
    pub person: Person,
    /// Relations in declaration order.
    pub relations: Vec<Relation>,
}

impl PersonDraft {
    pub fn new(row: usize, person: Person) -> Self {
        Self {
            row,
            person,
            relations: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.person.id.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::{Gender, Person, PersonDraft};

    #[test]
    fn gender_parse_normalizes_known_values() {
        assert_eq!(Gender::parse(" F "), Some(Gender::Female));
        assert_eq!(Gender::parse("Male"), Some(Gender::Male));
        assert_eq!(
            Gender::parse("non-binary"),
            Some(Gender::Other("non-binary".to_string()))
        );
        assert_eq!(Gender::parse("   "), None);
    }

    #[test]
    fn draft_starts_without_relations() {
        let draft = PersonDraft::new(4, Person::new("p-4"));
        assert_eq!(draft.id(), "p-4");
        assert_eq!(draft.row, 4);
        assert!(draft.relations.is_empty());
        assert!(draft.person.birth_date.is_none());
    }
}
