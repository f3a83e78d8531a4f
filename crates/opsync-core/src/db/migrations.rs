//! Database migrations

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version.unwrap_or(0))
}

/// Migration to version 1: projects, work packages, time entries
fn migrate_v1(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            openproject_id INTEGER,
            identifier TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            public INTEGER NOT NULL DEFAULT 1,
            description TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_projects_openproject_id ON projects(openproject_id);

        CREATE TABLE IF NOT EXISTS work_packages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            openproject_id INTEGER,
            project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            subject TEXT NOT NULL,
            description TEXT,
            start_date TEXT,
            due_date TEXT,
            derived_start_date TEXT,
            derived_due_date TEXT,
            spent_time TEXT,
            estimated_time TEXT,
            derived_estimated_time TEXT,
            derived_remaining_time TEXT,
            duration TEXT,
            labor_costs TEXT,
            material_costs TEXT,
            overall_costs TEXT,
            schedule_manually INTEGER NOT NULL DEFAULT 0,
            ignore_non_working_days INTEGER NOT NULL DEFAULT 0,
            percentage_done INTEGER,
            derived_percentage_done INTEGER,
            lock_version INTEGER,
            created_at TEXT,
            updated_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_work_packages_openproject_id ON work_packages(openproject_id);
        CREATE INDEX IF NOT EXISTS idx_work_packages_project ON work_packages(project_id);

        CREATE TABLE IF NOT EXISTS time_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            openproject_id INTEGER,
            work_package_id INTEGER NOT NULL REFERENCES work_packages(id) ON DELETE CASCADE,
            ongoing INTEGER NOT NULL DEFAULT 0,
            comment TEXT,
            spent_on TEXT,
            hours TEXT,
            created_at TEXT,
            updated_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_time_entries_openproject_id ON time_entries(openproject_id);
        CREATE INDEX IF NOT EXISTS idx_time_entries_work_package ON time_entries(work_package_id);

        INSERT INTO schema_version (version) VALUES (1);",
    )?;

    tx.commit()?;
    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
