//! Directory service - the advisor listing shown to clients choosing an advisor

use std::sync::Arc;

use crate::auth::CallerContext;
use crate::error::{PairError, Result};
use crate::models::{Actor, ActorId, Role};
use crate::store::RecordStore;

use super::resolve_caller;

pub struct DirectoryService {
    store: Arc<dyn RecordStore>,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// All advisors, newest first. Any registered caller may browse.
    pub fn list_advisors(&self, ctx: &CallerContext) -> Result<Vec<Actor>> {
        resolve_caller(self.store.as_ref(), ctx)?;
        self.store.list_actors_by_role(Role::Advisor)
    }

    /// One directory entry.
    ///
    /// Unknown ids and non-advisor ids get the same error.
    pub fn get_advisor(&self, ctx: &CallerContext, advisor_id: &ActorId) -> Result<Actor> {
        resolve_caller(self.store.as_ref(), ctx)?;
        self.store
            .get_actor(advisor_id)?
            .filter(Actor::is_advisor)
            .ok_or_else(|| PairError::InvalidTarget(format!("{} is not an advisor", advisor_id)))
    }
}
