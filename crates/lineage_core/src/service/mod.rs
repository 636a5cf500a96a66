//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate normalizer, resolver and checker into one import run.
//! - Keep CLI/UI layers decoupled from pipeline internals and storage.

pub mod import_run;
pub mod import_service;
