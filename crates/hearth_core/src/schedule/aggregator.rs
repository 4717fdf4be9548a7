//! Cross-tool action aggregation.
//!
//! # Responsibility
//! - Merge recurring occurrences with one-off entries into one feed.
//! - Derive `is_overdue` without touching tool-owned status.
//!
//! # Invariants
//! - At most one item per `(definition_id, due_date)`.
//! - Order: `due_date ASC, priority DESC, title ASC, definition_id ASC`.
//! - `limit` applies after filtering and sorting.

use crate::model::schedule::{
    DefinitionId, ItemStatus, Occurrence, OneOffEntry, Priority, SourceTool,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Where an action item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Recurring,
    OneOff,
}

/// One row of the dashboard feed or the monthly calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub definition_id: DefinitionId,
    pub source_tool: SourceTool,
    pub kind: ItemKind,
    pub title: String,
    pub notes: Option<String>,
    pub due_date: NaiveDate,
    pub priority: Priority,
    pub status: ItemStatus,
    pub is_overdue: bool,
}

/// Optional post-merge filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateFilter {
    pub status: Option<ItemStatus>,
    pub limit: Option<usize>,
}

/// Merges, dedupes, filters and orders items. Read-only projection.
pub fn aggregate(
    occurrences: Vec<Occurrence>,
    one_offs: Vec<OneOffEntry>,
    today: NaiveDate,
    filter: &AggregateFilter,
) -> Vec<ActionItem> {
    let recurring = occurrences
        .into_iter()
        .map(|occurrence| from_occurrence(occurrence, today));
    let dated = one_offs
        .into_iter()
        .map(|entry| from_one_off(entry, today));

    let mut seen = HashSet::new();
    let mut items = recurring
        .chain(dated)
        .filter(|item| seen.insert((item.definition_id, item.due_date)))
        .filter(|item| filter.status.map_or(true, |status| item.status == status))
        .collect::<Vec<_>>();

    items.sort_by(compare_items);
    if let Some(limit) = filter.limit {
        items.truncate(limit);
    }
    items
}

fn compare_items(left: &ActionItem, right: &ActionItem) -> Ordering {
    left.due_date
        .cmp(&right.due_date)
        .then_with(|| right.priority.cmp(&left.priority))
        .then_with(|| left.title.cmp(&right.title))
        .then_with(|| left.definition_id.cmp(&right.definition_id))
}

fn is_overdue(due_date: NaiveDate, status: ItemStatus, today: NaiveDate) -> bool {
    due_date < today && status == ItemStatus::Pending
}

fn from_occurrence(occurrence: Occurrence, today: NaiveDate) -> ActionItem {
    ActionItem {
        is_overdue: is_overdue(occurrence.due_date, occurrence.status, today),
        definition_id: occurrence.definition_id,
        source_tool: occurrence.source_tool,
        kind: ItemKind::Recurring,
        title: occurrence.title,
        notes: occurrence.notes,
        due_date: occurrence.due_date,
        priority: occurrence.priority,
        status: occurrence.status,
    }
}

fn from_one_off(entry: OneOffEntry, today: NaiveDate) -> ActionItem {
    ActionItem {
        is_overdue: is_overdue(entry.due_date, entry.status, today),
        definition_id: entry.id,
        source_tool: entry.source_tool,
        kind: ItemKind::OneOff,
        title: entry.title,
        notes: entry.notes,
        due_date: entry.due_date,
        priority: entry.priority,
        status: entry.status,
    }
}
