//! Commit-side contracts toward the external family store.
//!
//! # Responsibility
//! - Define the seam a validated graph is handed across.
//! - Keep storage mechanics out of the import pipeline.
//!
//! # Invariants
//! - A sink receives graph ownership only after the commit gate passed.

pub mod graph_sink;
