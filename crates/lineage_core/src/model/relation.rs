//! Relation domain model.
//!
//! # Responsibility
//! - Define relation kinds and their symmetric inverses.
//! - Derive stable relation ids for records that do not carry one.
//!
//! # Invariants
//! - `A -kind-> B` reads as "B is A's `kind`".
//! - `Parent` and `Child` are inverses; `Spouse` is its own inverse.
//! - Generated ids are pure functions of their inputs.

use crate::model::person::PersonId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable relation identifier.
pub type RelationId = String;

/// Namespace for ids derived from relation content.
const RELATION_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_4a2e_93d0_4b7c_8e55_0d2a_71c9_b3e4);

/// Relation kind between two persons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Parent,
    Child,
    Spouse,
}

impl RelationType {
    /// Returns the kind the target must hold back toward the owner.
    pub fn inverse(self) -> Self {
        match self {
            Self::Parent => Self::Child,
            Self::Child => Self::Parent,
            Self::Spouse => Self::Spouse,
        }
    }

    /// Parses canonical names and common kinship synonyms.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "parent" | "father" | "mother" => Some(Self::Parent),
            "child" | "son" | "daughter" => Some(Self::Child),
            "spouse" | "husband" | "wife" | "partner" => Some(Self::Spouse),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
            Self::Spouse => "spouse",
        }
    }
}

impl Display for RelationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One relation as declared on a person draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: RelationId,
    #[serde(rename = "type")]
    pub kind: RelationType,
    #[serde(rename = "personId")]
    pub target: PersonId,
}

impl Relation {
    pub fn new(id: impl Into<RelationId>, kind: RelationType, target: impl Into<PersonId>) -> Self {
        Self {
            id: id.into(),
            kind,
            target: target.into(),
        }
    }
}

/// Whether an edge was present in the input or synthesized for symmetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOrigin {
    Declared,
    Inferred,
}

/// Resolver verdict attached to an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeValidity {
    Valid,
    /// Conflicts with the declarations made in the opposite direction.
    Contradictory,
}

/// Derives an id for a declared relation that arrived without one.
pub fn declared_relation_id(
    owner: &str,
    position: usize,
    kind: RelationType,
    target: &str,
) -> RelationId {
    let name = format!("declared:{owner}:{position}:{kind}:{target}");
    Uuid::new_v5(&RELATION_ID_NAMESPACE, name.as_bytes()).to_string()
}

/// Derives the id of the inverse edge `source -> target` synthesized for
/// `declared_id`.
pub fn inferred_relation_id(declared_id: &str, source: &str, target: &str) -> RelationId {
    let name = format!("inferred:{declared_id}:{source}:{target}");
    Uuid::new_v5(&RELATION_ID_NAMESPACE, name.as_bytes()).to_string()
}
