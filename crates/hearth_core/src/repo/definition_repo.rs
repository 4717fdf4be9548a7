//! Definition repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Fetch the recurring definitions of one owner for one tool, either the
//!   active ones (feed) or all of them (calendar history).
//! - Map per-tool tables onto `ScheduleDefinition`.
//!
//! # Invariants
//! - Every read opens its own read-only connection.
//! - Rows failing `ScheduleDefinition::validate()` are reported, not skipped.

use crate::db::{open_db_read_only, DbError};
use crate::model::schedule::{
    Frequency, ItemStatus, ModelValidationError, Priority, ScheduleDefinition, SourceTool,
};
use crate::model::visibility::Visibility;
use chrono::{NaiveDate, Weekday};
use log::{debug, warn};
use rusqlite::{params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

const DEFINITION_COLUMNS: &str = "
    id,
    owner_id,
    title,
    notes,
    frequency,
    days_of_week,
    day_of_month,
    start_date,
    end_date,
    is_active,
    date_inactivated,
    date_reactivated,
    include_in_feed,
    priority,
    status";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for schedule reads.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Validation(ModelValidationError),
    InvalidData(String),
    /// The tool has no storage of the requested kind.
    UnsupportedTool(SourceTool),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "invalid persisted schedule row: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted schedule data: {message}"),
            Self::UnsupportedTool(tool) => write!(f, "tool `{tool}` has no such storage"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::InvalidData(_) | Self::UnsupportedTool(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Per-tool source of recurring definitions.
pub trait DefinitionRepository: Send + Sync {
    /// Tool this repository serves; used to label degraded contributions.
    fn source_tool(&self) -> SourceTool;

    fn fetch_active_by_owner(
        &self,
        owner_id: &str,
        source_tool: SourceTool,
    ) -> RepoResult<Vec<ScheduleDefinition>>;

    /// Active and inactive definitions; inactive ones still carry history.
    fn fetch_by_owner(
        &self,
        owner_id: &str,
        source_tool: SourceTool,
    ) -> RepoResult<Vec<ScheduleDefinition>>;
}

/// Table holding recurring definitions for `tool`.
pub fn definition_table(tool: SourceTool) -> Option<&'static str> {
    match tool {
        SourceTool::CarePlan => Some("care_plan_items"),
        SourceTool::Todo => Some("todo_routines"),
        SourceTool::CalendarEvent => Some("calendar_series"),
        SourceTool::Appointment => None,
    }
}

/// SQLite-backed definition repository for one tool.
#[derive(Debug, Clone)]
pub struct SqliteDefinitionRepository {
    db_path: PathBuf,
    source_tool: SourceTool,
}

impl SqliteDefinitionRepository {
    pub fn new(db_path: impl Into<PathBuf>, source_tool: SourceTool) -> Self {
        Self {
            db_path: db_path.into(),
            source_tool,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn fetch(
        &self,
        owner_id: &str,
        source_tool: SourceTool,
        active_only: bool,
    ) -> RepoResult<Vec<ScheduleDefinition>> {
        let table = definition_table(source_tool).ok_or(RepoError::UnsupportedTool(source_tool))?;
        let started_at = Instant::now();

        let active_filter = if active_only { "AND is_active = 1" } else { "" };
        let conn = open_db_read_only(&self.db_path)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DEFINITION_COLUMNS}
             FROM {table}
             WHERE owner_id = ?1
               {active_filter}
             ORDER BY start_date ASC, id ASC;"
        ))?;

        let mut rows = stmt.query(params![owner_id])?;
        let mut definitions = Vec::new();
        while let Some(row) = rows.next()? {
            definitions.push(parse_definition_row(row, source_tool, table)?);
        }

        debug!(
            "event=definitions_fetch module=repo status=ok tool={} active_only={} rows={} duration_ms={}",
            source_tool,
            active_only,
            definitions.len(),
            started_at.elapsed().as_millis()
        );
        Ok(definitions)
    }
}

impl DefinitionRepository for SqliteDefinitionRepository {
    fn source_tool(&self) -> SourceTool {
        self.source_tool
    }

    fn fetch_active_by_owner(
        &self,
        owner_id: &str,
        source_tool: SourceTool,
    ) -> RepoResult<Vec<ScheduleDefinition>> {
        self.fetch(owner_id, source_tool, true)
    }

    fn fetch_by_owner(
        &self,
        owner_id: &str,
        source_tool: SourceTool,
    ) -> RepoResult<Vec<ScheduleDefinition>> {
        self.fetch(owner_id, source_tool, false)
    }
}

fn parse_definition_row(
    row: &Row<'_>,
    source_tool: SourceTool,
    table: &str,
) -> RepoResult<ScheduleDefinition> {
    let id = parse_id(row, table)?;

    let frequency_text: String = row.get("frequency")?;
    let frequency = Frequency::parse(&frequency_text).unwrap_or_else(|| {
        warn!(
            "event=definition_parse module=repo status=degraded table={table} id={id} reason=unknown_frequency value={frequency_text}"
        );
        Frequency::AsNeeded
    });

    let days_of_week = match row.get::<_, Option<String>>("days_of_week")? {
        Some(text) => parse_days_of_week(&text).map_err(|message| {
            RepoError::InvalidData(format!("{message} in {table}.days_of_week"))
        })?,
        None => Vec::new(),
    };

    let start_date = parse_date(&row.get::<_, String>("start_date")?, table, "start_date")?;
    let end_date = parse_optional_date(row.get("end_date")?, table, "end_date")?;

    let is_active = parse_flag(row.get("is_active")?, table, "is_active")?;
    let inactivated = parse_optional_date(row.get("date_inactivated")?, table, "date_inactivated")?;
    let visibility = if is_active {
        let reactivated =
            parse_optional_date(row.get("date_reactivated")?, table, "date_reactivated")?;
        if let (Some(from), Some(until)) = (inactivated, reactivated) {
            if until < from {
                return Err(RepoError::InvalidData(format!(
                    "row `{id}` reactivated on {until} before its inactivation on {from} in {table}"
                )));
            }
        }
        Visibility::Active {
            since: reactivated,
            paused_from: inactivated,
        }
    } else {
        let since = inactivated.ok_or_else(|| {
            RepoError::InvalidData(format!("inactive row `{id}` without {table}.date_inactivated"))
        })?;
        Visibility::Inactive { since }
    };

    let definition = ScheduleDefinition {
        id,
        owner_id: row.get("owner_id")?,
        source_tool,
        title: row.get("title")?,
        notes: row.get("notes")?,
        frequency,
        days_of_week,
        day_of_month: row.get("day_of_month")?,
        start_date,
        end_date,
        visibility,
        include_in_feed: parse_flag(row.get("include_in_feed")?, table, "include_in_feed")?,
        priority: parse_priority(row, table)?,
        status: parse_status(row, table)?,
    };
    definition.validate()?;
    Ok(definition)
}

pub(crate) fn parse_id(row: &Row<'_>, table: &str) -> RepoResult<Uuid> {
    let text: String = row.get("id")?;
    Uuid::parse_str(&text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {table}.id")))
}

pub(crate) fn parse_date(text: &str, table: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{text}` in {table}.{column}")))
}

fn parse_optional_date(
    text: Option<String>,
    table: &str,
    column: &str,
) -> RepoResult<Option<NaiveDate>> {
    text.map(|text| parse_date(&text, table, column)).transpose()
}

pub(crate) fn parse_priority(row: &Row<'_>, table: &str) -> RepoResult<Priority> {
    let text: String = row.get("priority")?;
    Priority::parse(&text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid priority `{text}` in {table}.priority"))
    })
}

pub(crate) fn parse_status(row: &Row<'_>, table: &str) -> RepoResult<ItemStatus> {
    let text: String = row.get("status")?;
    ItemStatus::parse(&text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{text}` in {table}.status"))
    })
}

fn parse_flag(value: i64, table: &str, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in {table}.{column}"
        ))),
    }
}

/// Parses stored weekday indices (`0 = Sunday` .. `6 = Saturday`).
pub fn parse_days_of_week(text: &str) -> Result<Vec<Weekday>, String> {
    let mut days = Vec::new();
    for part in text.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let day = match part {
            "0" => Weekday::Sun,
            "1" => Weekday::Mon,
            "2" => Weekday::Tue,
            "3" => Weekday::Wed,
            "4" => Weekday::Thu,
            "5" => Weekday::Fri,
            "6" => Weekday::Sat,
            other => return Err(format!("invalid weekday index `{other}`")),
        };
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

/// Inverse of `parse_days_of_week`.
pub fn format_days_of_week(days: &[Weekday]) -> String {
    days.iter()
        .map(|day| day.num_days_from_sunday().to_string())
        .collect::<Vec<_>>()
        .join(",")
}
