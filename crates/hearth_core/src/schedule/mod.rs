//! Materialization engine: definitions in, ordered action items out.
//!
//! # Responsibility
//! - Expand recurrence rules into concrete dates (`expander`).
//! - Choose the minimal window per definition before expanding (`planner`).
//! - Merge, dedupe and order items across tools (`aggregator`).
//!
//! # Invariants
//! - Every function here is pure; nothing reads storage or the clock.
//! - Occurrences never fall outside `[start_date, end_date]` of their
//!   definition nor outside the requested window.

pub mod aggregator;
pub mod expander;
pub mod planner;
pub mod window;
