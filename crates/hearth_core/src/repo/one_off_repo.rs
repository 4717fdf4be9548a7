//! One-off entry repository contract and SQLite implementation.

use super::definition_repo::{
    parse_date, parse_id, parse_priority, parse_status, RepoError, RepoResult,
};
use crate::db::open_db_read_only;
use crate::model::schedule::{OneOffEntry, SourceTool};
use crate::schedule::window::DateWindow;
use log::debug;
use rusqlite::{params, Row};
use std::path::PathBuf;
use std::time::Instant;

/// Per-tool source of single dated entries.
pub trait OneOffRepository: Send + Sync {
    fn source_tool(&self) -> SourceTool;

    /// Entries of `owner_id` whose due date lies inside `window`.
    fn fetch_by_owner_and_window(
        &self,
        owner_id: &str,
        window: DateWindow,
    ) -> RepoResult<Vec<OneOffEntry>>;
}

/// Table holding one-off entries for `tool`.
pub fn one_off_table(tool: SourceTool) -> Option<&'static str> {
    match tool {
        SourceTool::Appointment => Some("appointments"),
        SourceTool::Todo => Some("todo_tasks"),
        SourceTool::CarePlan | SourceTool::CalendarEvent => None,
    }
}

/// SQLite-backed one-off repository for one tool.
#[derive(Debug, Clone)]
pub struct SqliteOneOffRepository {
    db_path: PathBuf,
    source_tool: SourceTool,
}

impl SqliteOneOffRepository {
    pub fn new(db_path: impl Into<PathBuf>, source_tool: SourceTool) -> Self {
        Self {
            db_path: db_path.into(),
            source_tool,
        }
    }
}

impl OneOffRepository for SqliteOneOffRepository {
    fn source_tool(&self) -> SourceTool {
        self.source_tool
    }

    fn fetch_by_owner_and_window(
        &self,
        owner_id: &str,
        window: DateWindow,
    ) -> RepoResult<Vec<OneOffEntry>> {
        let table =
            one_off_table(self.source_tool).ok_or(RepoError::UnsupportedTool(self.source_tool))?;
        let started_at = Instant::now();

        let conn = open_db_read_only(&self.db_path)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, owner_id, title, notes, due_date, priority, status
             FROM {table}
             WHERE owner_id = ?1
               AND due_date BETWEEN ?2 AND ?3
             ORDER BY due_date ASC, id ASC;"
        ))?;

        let mut rows = stmt.query(params![
            owner_id,
            window.start().to_string(),
            window.end().to_string()
        ])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_one_off_row(row, self.source_tool, table)?);
        }

        debug!(
            "event=one_offs_fetch module=repo status=ok tool={} rows={} duration_ms={}",
            self.source_tool,
            entries.len(),
            started_at.elapsed().as_millis()
        );
        Ok(entries)
    }
}

fn parse_one_off_row(
    row: &Row<'_>,
    source_tool: SourceTool,
    table: &str,
) -> RepoResult<OneOffEntry> {
    let entry = OneOffEntry {
        id: parse_id(row, table)?,
        owner_id: row.get("owner_id")?,
        source_tool,
        title: row.get("title")?,
        notes: row.get("notes")?,
        due_date: parse_date(&row.get::<_, String>("due_date")?, table, "due_date")?,
        priority: parse_priority(row, table)?,
        status: parse_status(row, table)?,
    };
    entry.validate()?;
    Ok(entry)
}
