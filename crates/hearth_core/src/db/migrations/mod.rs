//! Schedule store migrations.
//!
//! # Responsibility
//! - Declare, per schema version, the tool tables each step creates.
//! - Apply pending steps in one transaction and verify their tables exist
//!   before committing.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - A step that does not leave its declared tables behind rolls the whole
//!   upgrade back with `DbError::SchemaMismatch`.
//!
//! # See also
//! - docs/architecture/schedule-model.md
//! - docs/architecture/logging.md

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, Transaction};
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    /// Tables the step must leave behind.
    tables: &'static [&'static str],
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "schedule_definitions",
        tables: &["care_plan_items", "todo_routines", "calendar_series"],
        sql: include_str!("0001_schedule_definitions.sql"),
    },
    Migration {
        version: 2,
        name: "one_off_entries",
        tables: &["appointments", "todo_tasks"],
        sql: include_str!("0002_one_off_entries.sql"),
    },
];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Every tool table a fully migrated store holds, in creation order.
pub fn schedule_tables() -> impl Iterator<Item = &'static str> {
    MIGRATIONS
        .iter()
        .flat_map(|migration| migration.tables.iter().copied())
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    apply(conn, MIGRATIONS)
}

fn apply(conn: &mut Connection, migrations: &[Migration]) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = migrations.last().map_or(0, |migration| migration.version);

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        debug!("event=db_migrate module=db status=skipped version={current_version}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in migrations {
        if migration.version <= current_version {
            continue;
        }

        let started_at = Instant::now();
        tx.execute_batch(migration.sql)?;
        verify_tables(&tx, migration)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
        info!(
            "event=db_migrate module=db status=ok version={} name={} tables={} duration_ms={}",
            migration.version,
            migration.name,
            migration.tables.join(","),
            started_at.elapsed().as_millis()
        );
    }
    tx.commit()?;

    Ok(())
}

fn verify_tables(tx: &Transaction<'_>, migration: &Migration) -> DbResult<()> {
    for &table in migration.tables {
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(DbError::SchemaMismatch {
                version: migration.version,
                table,
            });
        }
    }
    Ok(())
}

/// Reads `PRAGMA user_version` without modifying it.
pub(crate) fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::{apply, current_user_version, schedule_tables, Migration};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn step_missing_a_declared_table_rolls_back() {
        let steps = [
            Migration {
                version: 1,
                name: "appointments",
                tables: &["appointments"],
                sql: "CREATE TABLE appointments (id TEXT PRIMARY KEY);",
            },
            Migration {
                version: 2,
                name: "todo_tasks",
                tables: &["todo_tasks"],
                sql: "CREATE TABLE todo_task (id TEXT PRIMARY KEY);",
            },
        ];
        let mut conn = Connection::open_in_memory().unwrap();

        match apply(&mut conn, &steps).unwrap_err() {
            DbError::SchemaMismatch { version, table } => {
                assert_eq!(version, 2);
                assert_eq!(table, "todo_tasks");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(current_user_version(&conn).unwrap(), 0);
        let tables: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table';", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn every_tool_table_is_declared_once() {
        let mut tables = schedule_tables().collect::<Vec<_>>();
        assert_eq!(tables.len(), 5);
        tables.sort_unstable();
        tables.dedup();
        assert_eq!(tables.len(), 5);
    }
}
