//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository reads into materialized feeds and calendars.
//! - Keep transport layers (CLI, HTTP) decoupled from storage details.
//!
//! # See also
//! - docs/architecture/schedule-model.md

pub mod materialize;
