//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use super::classify_sqlite_error;
use crate::error::Result;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!("Migrating schema from v{} to v{}", current_version, SCHEMA_VERSION);
        migrate_schema(conn, current_version)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    ).map_err(|e| classify_sqlite_error("Failed to create schema_version table", e))?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| classify_sqlite_error("Failed to clear schema_version", e))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .map_err(|e| classify_sqlite_error("Failed to set schema_version", e))?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(ACTORS_SCHEMA)
        .map_err(|e| classify_sqlite_error("Failed to create actor tables", e))?;

    conn.execute_batch(ASSIGNMENTS_SCHEMA)
        .map_err(|e| classify_sqlite_error("Failed to create assignment tables", e))?;

    conn.execute_batch(PORTFOLIOS_SCHEMA)
        .map_err(|e| classify_sqlite_error("Failed to create portfolio tables", e))?;

    conn.execute_batch(INDEXES_SCHEMA)
        .map_err(|e| classify_sqlite_error("Failed to create indexes", e))?;

    Ok(())
}

fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
    info!(from_version, "No migration steps registered");
    set_schema_version(conn, SCHEMA_VERSION)
}

const ACTORS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS actors (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    tagline TEXT,
    role TEXT NOT NULL CHECK (role IN ('advisor', 'client')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Role is fixed at account creation
CREATE TRIGGER IF NOT EXISTS actors_role_immutable
BEFORE UPDATE OF role ON actors
WHEN NEW.role <> OLD.role
BEGIN
    SELECT RAISE(ABORT, 'actor role is immutable');
END;
"#;

const ASSIGNMENTS_SCHEMA: &str = r#"
-- A client has zero or one advisor. UNIQUE(client_id) is the only
-- guard against two concurrent selections both committing.
CREATE TABLE IF NOT EXISTS assignments (
    id TEXT PRIMARY KEY NOT NULL,
    advisor_id TEXT NOT NULL REFERENCES actors(id),
    client_id TEXT NOT NULL UNIQUE REFERENCES actors(id),
    created_at TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS assignments_immutable
BEFORE UPDATE ON assignments
BEGIN
    SELECT RAISE(ABORT, 'assignments are immutable');
END;
"#;

const PORTFOLIOS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS portfolios (
    id TEXT PRIMARY KEY NOT NULL,
    advisor_id TEXT NOT NULL REFERENCES actors(id),
    client_id TEXT NOT NULL REFERENCES actors(id),
    status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'published')),
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS portfolios_no_unpublish
BEFORE UPDATE OF status ON portfolios
WHEN OLD.status = 'published' AND NEW.status = 'draft'
BEGIN
    SELECT RAISE(ABORT, 'published portfolios cannot return to draft');
END;
"#;

const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_actors_role ON actors(role, created_at);
CREATE INDEX IF NOT EXISTS idx_assignments_advisor ON assignments(advisor_id, created_at);
CREATE INDEX IF NOT EXISTS idx_portfolios_client ON portfolios(client_id, status);
CREATE INDEX IF NOT EXISTS idx_portfolios_advisor ON portfolios(advisor_id, created_at);
"#;
