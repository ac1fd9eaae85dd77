//! Assignment service - clients choosing an advisor, advisors reading rosters
//!
//! A client holds at most one assignment. The store's unique constraint on
//! `client_id` decides concurrent races; this service never checks for an
//! existing row before inserting.

use std::sync::Arc;

use tracing::info;

use crate::auth::CallerContext;
use crate::error::{PairError, Result};
use crate::gate::{self, Operation};
use crate::models::{Actor, ActorId, Assignment};
use crate::store::RecordStore;

use super::events::{EventBus, PairEvent};
use super::resolve_caller;

pub struct AssignmentService {
    store: Arc<dyn RecordStore>,
    events: Arc<EventBus>,
}

impl AssignmentService {
    pub fn new(store: Arc<dyn RecordStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// The assignment for `client_id`, if the caller may see it.
    ///
    /// An advisor asking about a client paired with someone else gets `None`,
    /// the same answer as for an unpaired client.
    pub fn get_assignment_for_client(
        &self,
        ctx: &CallerContext,
        client_id: &ActorId,
    ) -> Result<Option<Assignment>> {
        let caller = resolve_caller(self.store.as_ref(), ctx)?;

        if caller.is_client() && caller.id != *client_id {
            return Err(PairError::Forbidden("not your assignment".into()));
        }

        let row = self.store.assignment_for_client(client_id)?;
        Ok(row.filter(|a| gate::evaluate(&caller, &Operation::ReadAssignment(a)).is_allowed()))
    }

    /// Roster for `advisor_id`, oldest first
    pub fn list_assignments_for_advisor(
        &self,
        ctx: &CallerContext,
        advisor_id: &ActorId,
    ) -> Result<Vec<Assignment>> {
        let caller = resolve_caller(self.store.as_ref(), ctx)?;
        gate::authorize(&caller, &Operation::ListRoster { advisor_id })?;

        self.store.assignments_for_advisor(advisor_id)
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Pair `client_id` with `advisor_id`.
    ///
    /// Errors, in the order they are checked: `Unauthenticated`, `Forbidden`
    /// (caller is not that client), `InvalidTarget` (no such advisor),
    /// `Conflict` (client already paired).
    pub fn create_assignment(
        &self,
        ctx: &CallerContext,
        client_id: &ActorId,
        advisor_id: &ActorId,
    ) -> Result<Assignment> {
        let caller = resolve_caller(self.store.as_ref(), ctx)?;
        gate::authorize(&caller, &Operation::CreateAssignment { client_id })?;

        let advisor = self
            .store
            .get_actor(advisor_id)?
            .filter(Actor::is_advisor)
            .ok_or_else(|| PairError::InvalidTarget(format!("{} is not an advisor", advisor_id)))?;

        let assignment = match self.store.insert_assignment(&advisor.id, client_id) {
            Ok(assignment) => assignment,
            Err(e @ PairError::Conflict(_)) => {
                info!(client = %client_id, advisor = %advisor.id, "Client already has an advisor");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        self.events.emit(PairEvent::AssignmentCreated {
            id: assignment.id.clone(),
            advisor_id: assignment.advisor_id.clone(),
            client_id: assignment.client_id.clone(),
        });

        Ok(assignment)
    }
}
