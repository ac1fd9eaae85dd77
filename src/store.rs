//! Record store interface
//!
//! The core consumes durable storage through this trait only. An
//! implementation must provide:
//!
//! - a uniqueness constraint on the assignment's client identity, with
//!   atomic insert-if-absent semantics (`insert_assignment` fails with
//!   `Conflict` for the second insert, never succeeds twice)
//! - equality filters on role, status and identity
//! - ordering by creation time
//!
//! [`crate::db::SqliteStore`] is the shipped implementation.

use crate::error::Result;
use crate::models::{
    Actor, ActorId, Assignment, NewActor, NewPortfolio, Portfolio, PortfolioStatus,
    PortfolioUpdate, ProfileUpdate, Role,
};

/// Filter for portfolio listings. Every set field must match.
#[derive(Debug, Clone, Default)]
pub struct PortfolioQuery {
    pub advisor_id: Option<ActorId>,
    pub client_id: Option<ActorId>,
    pub status: Option<PortfolioStatus>,
}

impl PortfolioQuery {
    pub fn owned_by(advisor_id: &ActorId) -> Self {
        Self {
            advisor_id: Some(advisor_id.clone()),
            ..Default::default()
        }
    }

    pub fn published_for(client_id: &ActorId) -> Self {
        Self {
            client_id: Some(client_id.clone()),
            status: Some(PortfolioStatus::Published),
            ..Default::default()
        }
    }
}

pub trait RecordStore: Send + Sync {
    // =========================================================================
    // Actors
    // =========================================================================

    /// Insert the actor unless the identity already exists; return the stored row
    fn insert_actor_if_absent(&self, actor: &NewActor) -> Result<Actor>;

    fn get_actor(&self, id: &ActorId) -> Result<Option<Actor>>;

    /// Actors holding `role`, newest first
    fn list_actors_by_role(&self, role: Role) -> Result<Vec<Actor>>;

    /// Apply a profile edit; `None` when the actor does not exist
    fn update_actor_profile(&self, id: &ActorId, update: &ProfileUpdate) -> Result<Option<Actor>>;

    // =========================================================================
    // Assignments
    // =========================================================================

    /// Atomic insert-if-absent keyed on `client_id`
    fn insert_assignment(&self, advisor_id: &ActorId, client_id: &ActorId) -> Result<Assignment>;

    fn assignment_for_client(&self, client_id: &ActorId) -> Result<Option<Assignment>>;

    /// Roster for one advisor, oldest first
    fn assignments_for_advisor(&self, advisor_id: &ActorId) -> Result<Vec<Assignment>>;

    // =========================================================================
    // Portfolios
    // =========================================================================

    /// Insert a draft owned by `advisor_id`
    fn insert_portfolio(&self, advisor_id: &ActorId, input: &NewPortfolio) -> Result<Portfolio>;

    fn get_portfolio(&self, id: &str) -> Result<Option<Portfolio>>;

    /// Update a portfolio only if `owner` still owns it; `None` otherwise
    fn update_portfolio(
        &self,
        id: &str,
        owner: &ActorId,
        update: &PortfolioUpdate,
    ) -> Result<Option<Portfolio>>;

    /// Matching portfolios, newest first
    fn list_portfolios(&self, query: &PortfolioQuery) -> Result<Vec<Portfolio>>;

    fn count_portfolios(&self, query: &PortfolioQuery) -> Result<u64>;
}
