//! SQLite record store
//!
//! Durable storage for actors, assignments and portfolios.
//!
//! ## Tables
//!
//! - `actors` - registered users, role fixed by trigger
//! - `assignments` - one row per client (`UNIQUE(client_id)`), immutable
//! - `portfolios` - advisor-owned recommendations, one-way publish
//!
//! The one-advisor-per-client rule lives in the schema, so two racing
//! inserts for the same client cannot both commit no matter how the
//! callers interleave.

pub mod schema;
pub mod actors;
pub mod assignments;
pub mod portfolios;

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, ErrorCode};
use tracing::{debug, info, warn};

use crate::error::{PairError, Result};
use crate::models::{
    Actor, ActorId, Assignment, NewActor, NewPortfolio, Portfolio, PortfolioStatus,
    PortfolioUpdate, ProfileUpdate, Role,
};
use crate::store::{PortfolioQuery, RecordStore};

/// Database file name inside the storage directory
pub const DB_FILE: &str = "portfolio-pair.db";

/// SQLite-backed record store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database under `storage_dir`
    pub fn open(storage_dir: &Path, busy_timeout: Duration) -> Result<Self> {
        let db_path = storage_dir.join(DB_FILE);
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(&db_path)
            .map_err(|e| PairError::Unavailable(format!("Failed to open SQLite: {}", e)))?;

        // WAL for concurrent readers across processes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| classify_sqlite_error("Failed to set PRAGMA", e))?;
        conn.busy_timeout(busy_timeout)
            .map_err(|e| classify_sqlite_error("Failed to set busy timeout", e))?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| PairError::Unavailable(format!("Failed to open in-memory SQLite: {}", e)))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| classify_sqlite_error("Failed to enable foreign keys", e))?;

        schema::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a read against the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock()
            .map_err(|e| PairError::Unavailable(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a write operation with exclusive access
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock()
            .map_err(|e| PairError::Unavailable(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<u64> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get::<_, i64>(0))
                    .map(|n| n as u64)
                    .map_err(|e| classify_sqlite_error("Query failed", e))
            };

            Ok(DbStats {
                actor_count: count("actors")?,
                assignment_count: count("assignments")?,
                portfolio_count: count("portfolios")?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub actor_count: u64,
    pub assignment_count: u64,
    pub portfolio_count: u64,
}

/// Map a rusqlite failure onto the core's error taxonomy.
///
/// Unique and primary-key violations are conflicts; anything that means the
/// database could not be reached or written right now is `Unavailable`.
pub fn classify_sqlite_error(context: &str, err: rusqlite::Error) -> PairError {
    let message = format!("{}: {}", context, err);

    match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::ConstraintViolation
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                PairError::Conflict(message)
            }
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure
            | ErrorCode::DiskFull
            | ErrorCode::FileLockingProtocolFailed => {
                warn!(error = %err, "Record store unavailable");
                PairError::Unavailable(message)
            }
            _ => PairError::Internal(message),
        },
        _ => PairError::Internal(message),
    }
}

// ============================================================================
// Column conversions
// ============================================================================

impl FromSql for ActorId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        String::column_result(value).map(ActorId::from)
    }
}

impl ToSql for ActorId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|e: PairError| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PortfolioStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|e: PairError| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for PortfolioStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

// ============================================================================
// RecordStore
// ============================================================================

impl RecordStore for SqliteStore {
    fn insert_actor_if_absent(&self, actor: &NewActor) -> Result<Actor> {
        self.with_conn_mut(|conn| actors::insert_actor_if_absent(conn, actor))
    }

    fn get_actor(&self, id: &ActorId) -> Result<Option<Actor>> {
        self.with_conn(|conn| actors::get_actor(conn, id))
    }

    fn list_actors_by_role(&self, role: Role) -> Result<Vec<Actor>> {
        self.with_conn(|conn| actors::list_actors_by_role(conn, role))
    }

    fn update_actor_profile(&self, id: &ActorId, update: &ProfileUpdate) -> Result<Option<Actor>> {
        self.with_conn_mut(|conn| actors::update_profile(conn, id, update))
    }

    fn insert_assignment(&self, advisor_id: &ActorId, client_id: &ActorId) -> Result<Assignment> {
        self.with_conn_mut(|conn| assignments::insert_assignment(conn, advisor_id, client_id))
    }

    fn assignment_for_client(&self, client_id: &ActorId) -> Result<Option<Assignment>> {
        self.with_conn(|conn| assignments::get_for_client(conn, client_id))
    }

    fn assignments_for_advisor(&self, advisor_id: &ActorId) -> Result<Vec<Assignment>> {
        self.with_conn(|conn| assignments::list_for_advisor(conn, advisor_id))
    }

    fn insert_portfolio(&self, advisor_id: &ActorId, input: &NewPortfolio) -> Result<Portfolio> {
        self.with_conn_mut(|conn| portfolios::insert_portfolio(conn, advisor_id, input))
    }

    fn get_portfolio(&self, id: &str) -> Result<Option<Portfolio>> {
        self.with_conn(|conn| portfolios::get_portfolio(conn, id))
    }

    fn update_portfolio(
        &self,
        id: &str,
        owner: &ActorId,
        update: &PortfolioUpdate,
    ) -> Result<Option<Portfolio>> {
        self.with_conn_mut(|conn| portfolios::update_portfolio(conn, id, owner, update))
    }

    fn list_portfolios(&self, query: &PortfolioQuery) -> Result<Vec<Portfolio>> {
        self.with_conn(|conn| portfolios::list_portfolios(conn, query))
    }

    fn count_portfolios(&self, query: &PortfolioQuery) -> Result<u64> {
        self.with_conn(|conn| portfolios::count_portfolios(conn, query))
    }
}
