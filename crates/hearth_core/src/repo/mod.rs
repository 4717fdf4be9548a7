//! Read-only repositories over tool-owned schedule storage.
//!
//! # Responsibility
//! - Define the collaborator contracts the materialization core reads from.
//! - Provide SQLite implementations, one table per tool.
//!
//! # Invariants
//! - Nothing in this layer writes; definition CRUD belongs to each tool.
//! - Read paths reject invalid persisted state instead of masking it, except
//!   for unknown frequencies which read as `AsNeeded`.
//! - Implementations are `Send + Sync` so reads can fan out across threads.

pub mod definition_repo;
pub mod one_off_repo;
