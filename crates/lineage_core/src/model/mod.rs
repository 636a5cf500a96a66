//! Canonical family data model shared by import stages.
//!
//! # Responsibility
//! - Define the strict person/relation shapes produced by normalization.
//! - Hold the arena-backed family graph and the per-run import report types.
//!
//! # Invariants
//! - Every person is identified by a stable, unique `PersonId`.
//! - Graph edges reference nodes by arena index, never by owned pointers.

pub mod graph;
pub mod issue;
pub mod person;
pub mod relation;
pub mod summary;
