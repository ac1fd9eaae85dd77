//! Assignment rows
//!
//! Insert is a single statement against `UNIQUE(client_id)`. There is no
//! read-before-write here: the constraint decides which of two racing
//! inserts wins.

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::classify_sqlite_error;
use crate::error::{PairError, Result, ALREADY_ASSIGNED};
use crate::models::{current_timestamp, ActorId, Assignment};

const ASSIGNMENT_COLUMNS: &str = "id, advisor_id, client_id, created_at";

fn map_assignment(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        advisor_id: row.get(1)?,
        client_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Insert the pairing; a second row for the same client is `Conflict`
pub fn insert_assignment(
    conn: &mut Connection,
    advisor_id: &ActorId,
    client_id: &ActorId,
) -> Result<Assignment> {
    let assignment = Assignment {
        id: Uuid::new_v4().to_string(),
        advisor_id: advisor_id.clone(),
        client_id: client_id.clone(),
        created_at: current_timestamp(),
    };

    conn.execute(
        "INSERT INTO assignments (id, advisor_id, client_id, created_at) VALUES (?, ?, ?, ?)",
        params![
            assignment.id,
            assignment.advisor_id,
            assignment.client_id,
            assignment.created_at,
        ],
    ).map_err(|e| match classify_sqlite_error("Failed to insert assignment", e) {
        PairError::Conflict(_) => PairError::Conflict(ALREADY_ASSIGNED.to_string()),
        other => other,
    })?;

    Ok(assignment)
}

/// The client's assignment, if they have chosen an advisor
pub fn get_for_client(conn: &Connection, client_id: &ActorId) -> Result<Option<Assignment>> {
    let sql = format!("SELECT {} FROM assignments WHERE client_id = ?", ASSIGNMENT_COLUMNS);

    conn.query_row(&sql, params![client_id], map_assignment)
        .optional()
        .map_err(|e| classify_sqlite_error("Failed to get assignment", e))
}

/// An advisor's roster in the order clients joined
pub fn list_for_advisor(conn: &Connection, advisor_id: &ActorId) -> Result<Vec<Assignment>> {
    let sql = format!(
        "SELECT {} FROM assignments WHERE advisor_id = ? ORDER BY created_at ASC, rowid ASC",
        ASSIGNMENT_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)
        .map_err(|e| classify_sqlite_error("Failed to prepare statement", e))?;

    let rows = stmt.query_map(params![advisor_id], map_assignment)
        .map_err(|e| classify_sqlite_error("Failed to query assignments", e))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| classify_sqlite_error("Failed to read row", e))?);
    }

    Ok(results)
}
