#![allow(dead_code)]

use chrono::NaiveDate;
use hearth_core::db::open_db;
use hearth_core::repo::definition_repo::format_days_of_week;
use hearth_core::{OneOffEntry, ScheduleDefinition};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use tempfile::TempDir;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Creates a migrated database file; keep the `TempDir` alive for the test.
pub fn migrated_db() -> (TempDir, PathBuf, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hearth.db");
    let conn = open_db(&path).unwrap();
    (dir, path, conn)
}

pub fn insert_definition(conn: &Connection, table: &str, def: &ScheduleDefinition) {
    let days = if def.days_of_week.is_empty() {
        None
    } else {
        Some(format_days_of_week(&def.days_of_week))
    };
    conn.execute(
        &format!(
            "INSERT INTO {table} (
                id, owner_id, title, notes, frequency, days_of_week, day_of_month,
                start_date, end_date, is_active, date_inactivated, date_reactivated,
                include_in_feed, priority, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);"
        ),
        params![
            def.id.to_string(),
            def.owner_id,
            def.title,
            def.notes,
            def.frequency.as_str(),
            days,
            def.day_of_month,
            def.start_date.to_string(),
            def.end_date.map(|d| d.to_string()),
            i64::from(def.is_active()),
            def.visibility.date_inactivated().map(|d| d.to_string()),
            def.visibility.date_reactivated().map(|d| d.to_string()),
            i64::from(def.include_in_feed),
            def.priority.as_str(),
            def.status.as_str(),
        ],
    )
    .unwrap();
}

pub fn insert_one_off(conn: &Connection, table: &str, entry: &OneOffEntry) {
    conn.execute(
        &format!(
            "INSERT INTO {table} (id, owner_id, title, notes, due_date, priority, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);"
        ),
        params![
            entry.id.to_string(),
            entry.owner_id,
            entry.title,
            entry.notes,
            entry.due_date.to_string(),
            entry.priority.as_str(),
            entry.status.as_str(),
        ],
    )
    .unwrap();
}
