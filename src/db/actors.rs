//! Actor rows
//!
//! Actors are created on first authentication and never deleted here.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::classify_sqlite_error;
use crate::error::{PairError, Result};
use crate::models::{current_timestamp, Actor, ActorId, NewActor, ProfileUpdate, Role};

const ACTOR_COLUMNS: &str = "id, name, tagline, role, created_at, updated_at";

fn map_actor(row: &Row<'_>) -> rusqlite::Result<Actor> {
    Ok(Actor {
        id: row.get(0)?,
        name: row.get(1)?,
        tagline: row.get(2)?,
        role: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Get an actor by identity
pub fn get_actor(conn: &Connection, id: &ActorId) -> Result<Option<Actor>> {
    let sql = format!("SELECT {} FROM actors WHERE id = ?", ACTOR_COLUMNS);

    conn.query_row(&sql, params![id], map_actor)
        .optional()
        .map_err(|e| classify_sqlite_error("Failed to get actor", e))
}

/// Insert an actor if the identity is new, returning whatever row is stored.
///
/// An existing row is never overwritten, so a later token carrying a
/// different role claim cannot change the stored role.
pub fn insert_actor_if_absent(conn: &mut Connection, input: &NewActor) -> Result<Actor> {
    let now = current_timestamp();

    conn.execute(
        "INSERT INTO actors (id, name, tagline, role, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        params![input.id, input.name, input.tagline, input.role, now, now],
    ).map_err(|e| classify_sqlite_error("Failed to insert actor", e))?;

    get_actor(conn, &input.id)?
        .ok_or_else(|| PairError::Internal("Failed to retrieve inserted actor".into()))
}

/// List actors holding a role, most recently joined first
pub fn list_actors_by_role(conn: &Connection, role: Role) -> Result<Vec<Actor>> {
    let sql = format!(
        "SELECT {} FROM actors WHERE role = ? ORDER BY created_at DESC, rowid DESC",
        ACTOR_COLUMNS
    );

    let mut stmt = conn.prepare(&sql)
        .map_err(|e| classify_sqlite_error("Failed to prepare statement", e))?;

    let rows = stmt.query_map(params![role], map_actor)
        .map_err(|e| classify_sqlite_error("Failed to query actors", e))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(|e| classify_sqlite_error("Failed to read row", e))?);
    }

    Ok(results)
}

/// Update name and/or tagline; `None` if the actor does not exist
pub fn update_profile(
    conn: &mut Connection,
    id: &ActorId,
    update: &ProfileUpdate,
) -> Result<Option<Actor>> {
    let rows = conn.execute(
        "UPDATE actors SET
             name = COALESCE(?1, name),
             tagline = CASE WHEN ?2 IS NULL THEN tagline ELSE NULLIF(?2, '') END,
             updated_at = ?3
         WHERE id = ?4",
        params![update.name, update.tagline, current_timestamp(), id],
    ).map_err(|e| classify_sqlite_error("Failed to update actor", e))?;

    if rows == 0 {
        return Ok(None);
    }

    get_actor(conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn new_actor(id: &str, role: Role) -> NewActor {
        NewActor {
            id: ActorId::from(id),
            name: format!("Actor {}", id),
            tagline: None,
            role,
        }
    }

    #[test]
    fn test_insert_is_idempotent_and_keeps_role() {
        let mut conn = conn();
        let first = insert_actor_if_absent(&mut conn, &new_actor("a1", Role::Client)).unwrap();
        let again = insert_actor_if_absent(&mut conn, &new_actor("a1", Role::Advisor)).unwrap();

        assert_eq!(first.role, Role::Client);
        assert_eq!(again.role, Role::Client);
        assert_eq!(first.created_at, again.created_at);
    }

    #[test]
    fn test_list_by_role_newest_first() {
        let mut conn = conn();
        insert_actor_if_absent(&mut conn, &new_actor("adv-old", Role::Advisor)).unwrap();
        insert_actor_if_absent(&mut conn, &new_actor("cli", Role::Client)).unwrap();
        insert_actor_if_absent(&mut conn, &new_actor("adv-new", Role::Advisor)).unwrap();

        let advisors = list_actors_by_role(&conn, Role::Advisor).unwrap();
        let ids: Vec<&str> = advisors.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["adv-new", "adv-old"]);
    }

    #[test]
    fn test_update_profile_partial() {
        let mut conn = conn();
        insert_actor_if_absent(&mut conn, &new_actor("a1", Role::Advisor)).unwrap();

        let updated = update_profile(
            &mut conn,
            &ActorId::from("a1"),
            &ProfileUpdate { name: None, tagline: Some("Retirement planning".into()) },
        )
        .unwrap()
        .unwrap();

        assert_eq!(updated.name, "Actor a1");
        assert_eq!(updated.tagline.as_deref(), Some("Retirement planning"));
    }

    #[test]
    fn test_empty_tagline_clears_it() {
        let mut conn = conn();
        let id = ActorId::from("a1");
        insert_actor_if_absent(&mut conn, &new_actor("a1", Role::Advisor)).unwrap();
        let set = ProfileUpdate { name: None, tagline: Some("Tax".into()) };
        update_profile(&mut conn, &id, &set).unwrap();

        let kept = update_profile(&mut conn, &id, &ProfileUpdate::default()).unwrap().unwrap();
        assert_eq!(kept.tagline.as_deref(), Some("Tax"));

        let clear = ProfileUpdate { name: None, tagline: Some(String::new()) };
        let cleared = update_profile(&mut conn, &id, &clear).unwrap().unwrap();
        assert_eq!(cleared.tagline, None);
    }

    #[test]
    fn test_update_missing_actor() {
        let mut conn = conn();
        let result = update_profile(&mut conn, &ActorId::from("ghost"), &ProfileUpdate::default()).unwrap();
        assert!(result.is_none());
    }
}
