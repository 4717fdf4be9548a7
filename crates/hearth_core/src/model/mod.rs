//! Schedule domain model shared by every household tool.
//!
//! # Responsibility
//! - Define the canonical definition/one-off shapes every tool maps onto.
//! - Keep tool-specific storage out of the materialization core.
//!
//! # Invariants
//! - Every definition is identified by a stable `DefinitionId`.
//! - Deactivation is a visibility state, never a delete.
//!
//! # See also
//! - docs/architecture/schedule-model.md

pub mod schedule;
pub mod visibility;
