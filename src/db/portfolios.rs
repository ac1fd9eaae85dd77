//! Portfolio rows

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::classify_sqlite_error;
use crate::error::{PairError, Result};
use crate::models::{current_timestamp, ActorId, NewPortfolio, Portfolio, PortfolioStatus, PortfolioUpdate};
use crate::store::PortfolioQuery;

const PORTFOLIO_COLUMNS: &str =
    "id, advisor_id, client_id, status, name, description, created_at, updated_at";

fn map_portfolio(row: &Row<'_>) -> rusqlite::Result<Portfolio> {
    Ok(Portfolio {
        id: row.get(0)?,
        advisor_id: row.get(1)?,
        client_id: row.get(2)?,
        status: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Get a portfolio by ID
pub fn get_portfolio(conn: &Connection, id: &str) -> Result<Option<Portfolio>> {
    let sql = format!("SELECT {} FROM portfolios WHERE id = ?", PORTFOLIO_COLUMNS);

    conn.query_row(&sql, params![id], map_portfolio)
        .optional()
        .map_err(|e| classify_sqlite_error("Failed to get portfolio", e))
}

/// Insert a new draft owned by `advisor_id`
pub fn insert_portfolio(
    conn: &mut Connection,
    advisor_id: &ActorId,
    input: &NewPortfolio,
) -> Result<Portfolio> {
    let id = Uuid::new_v4().to_string();
    let now = current_timestamp();

    conn.execute(
        "INSERT INTO portfolios (id, advisor_id, client_id, status, name, description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            advisor_id,
            input.client_id,
            PortfolioStatus::Draft,
            input.name,
            input.description,
            now,
            now,
        ],
    ).map_err(|e| classify_sqlite_error("Failed to insert portfolio", e))?;

    get_portfolio(conn, &id)?
        .ok_or_else(|| PairError::Internal("Failed to retrieve created portfolio".into()))
}

/// Apply an edit if `owner` owns the portfolio; `None` when no row matched
pub fn update_portfolio(
    conn: &mut Connection,
    id: &str,
    owner: &ActorId,
    update: &PortfolioUpdate,
) -> Result<Option<Portfolio>> {
    let rows = conn.execute(
        "UPDATE portfolios SET
             name = COALESCE(?1, name),
             description = CASE WHEN ?2 IS NULL THEN description ELSE NULLIF(?2, '') END,
             status = COALESCE(?3, status),
             updated_at = ?4
         WHERE id = ?5 AND advisor_id = ?6",
        params![
            update.name,
            update.description,
            update.status,
            current_timestamp(),
            id,
            owner,
        ],
    ).map_err(|e| classify_sqlite_error("Failed to update portfolio", e))?;

    if rows == 0 {
        return Ok(None);
    }

    get_portfolio(conn, id)
}

fn build_filter(query: &PortfolioQuery) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(advisor_id) = &query.advisor_id {
        sql.push_str(" AND advisor_id = ?");
        params_vec.push(Box::new(advisor_id.clone()));
    }

    if let Some(client_id) = &query.client_id {
        sql.push_str(" AND client_id = ?");
        params_vec.push(Box::new(client_id.clone()));
    }

    if let Some(status) = query.status {
        sql.push_str(" AND status = ?");
        params_vec.push(Box::new(status));
    }

    (sql, params_vec)
}

/// List portfolios with filtering, newest first
pub fn list_portfolios(conn: &Connection, query: &PortfolioQuery) -> Result<Vec<Portfolio>> {
    let (filter, params_vec) = build_filter(query);
    let sql = format!(
        "SELECT {} FROM portfolios{} ORDER BY created_at DESC, rowid DESC",
        PORTFOLIO_COLUMNS, filter
    );

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)
        .map_err(|e| classify_sqlite_error("Failed to prepare statement", e))?;

    let rows = stmt.query_map(params_refs.as_slice(), map_portfolio)
        .map_err(|e| classify_sqlite_error("Failed to query portfolios", e))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| classify_sqlite_error("Failed to read row", e))?);
    }

    Ok(results)
}

/// Count portfolios matching the filter
pub fn count_portfolios(conn: &Connection, query: &PortfolioQuery) -> Result<u64> {
    let (filter, params_vec) = build_filter(query);
    let sql = format!("SELECT COUNT(*) FROM portfolios{}", filter);

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

    let count: i64 = conn
        .query_row(&sql, params_refs.as_slice(), |row| row.get(0))
        .map_err(|e| classify_sqlite_error("Count query failed", e))?;

    Ok(count as u64)
}
