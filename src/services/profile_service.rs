//! Profile service - actor registration and self-service profile edits

use std::sync::Arc;

use tracing::warn;

use crate::auth::CallerContext;
use crate::error::{PairError, Result};
use crate::models::{Actor, NewActor, ProfileUpdate};
use crate::store::RecordStore;

use super::events::{EventBus, PairEvent};
use super::resolve_caller;

pub const MAX_NAME_LEN: usize = 120;
pub const MAX_TAGLINE_LEN: usize = 280;

pub struct ProfileService {
    store: Arc<dyn RecordStore>,
    events: Arc<EventBus>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn RecordStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    /// Create the caller's actor on first authentication.
    ///
    /// Idempotent. An existing actor is returned as stored; its role is
    /// never changed by a later claim.
    pub fn register(&self, ctx: &CallerContext) -> Result<Actor> {
        let identity = ctx.identity()?;

        if let Some(existing) = self.store.get_actor(&identity.id)? {
            if existing.role != identity.role {
                warn!(
                    actor = %existing.id,
                    stored = %existing.role,
                    claimed = %identity.role,
                    "Role claim differs from stored role; keeping stored role"
                );
            }
            return Ok(existing);
        }

        let name = validate_name(&identity.name)?;
        let actor = self.store.insert_actor_if_absent(&NewActor {
            id: identity.id.clone(),
            name,
            tagline: None,
            role: identity.role,
        })?;

        self.events.emit(PairEvent::ActorRegistered {
            id: actor.id.clone(),
            role: actor.role,
        });

        Ok(actor)
    }

    /// The caller's own profile
    pub fn get_me(&self, ctx: &CallerContext) -> Result<Actor> {
        resolve_caller(self.store.as_ref(), ctx)
    }

    /// Edit the caller's own name and tagline
    pub fn update_me(&self, ctx: &CallerContext, update: ProfileUpdate) -> Result<Actor> {
        let caller = resolve_caller(self.store.as_ref(), ctx)?;

        let update = ProfileUpdate {
            name: update.name.as_deref().map(validate_name).transpose()?,
            tagline: update.tagline.as_deref().map(validate_tagline).transpose()?,
        };

        let actor = self
            .store
            .update_actor_profile(&caller.id, &update)?
            .ok_or_else(|| PairError::Unauthenticated(format!("actor {} is not registered", caller.id)))?;

        self.events.emit(PairEvent::ProfileUpdated { id: actor.id.clone() });

        Ok(actor)
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PairError::InvalidInput("name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(PairError::InvalidInput(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn validate_tagline(tagline: &str) -> Result<String> {
    let tagline = tagline.trim();
    if tagline.chars().count() > MAX_TAGLINE_LEN {
        return Err(PairError::InvalidInput(format!(
            "tagline must be at most {} characters",
            MAX_TAGLINE_LEN
        )));
    }
    Ok(tagline.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedIdentity;
    use crate::db::SqliteStore;
    use crate::models::Role;

    fn service() -> ProfileService {
        let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        ProfileService::new(store, Arc::new(EventBus::new()))
    }

    fn ctx(id: &str, name: &str, role: Role) -> CallerContext {
        CallerContext::authenticated(AuthenticatedIdentity::new(id, name, role))
    }

    #[test]
    fn test_register_then_get_me() {
        let svc = service();
        let actor = svc.register(&ctx("cli-1", "  Casey  ", Role::Client)).unwrap();
        assert_eq!(actor.name, "Casey");
        assert_eq!(actor.role, Role::Client);

        let me = svc.get_me(&ctx("cli-1", "Casey", Role::Client)).unwrap();
        assert_eq!(me, actor);
    }

    #[test]
    fn test_register_keeps_original_role() {
        let svc = service();
        svc.register(&ctx("a", "A", Role::Client)).unwrap();
        let again = svc.register(&ctx("a", "A", Role::Advisor)).unwrap();
        assert_eq!(again.role, Role::Client);
    }

    #[test]
    fn test_unregistered_and_anonymous_callers() {
        let svc = service();
        assert!(matches!(
            svc.get_me(&CallerContext::anonymous()),
            Err(PairError::Unauthenticated(_))
        ));
        assert!(matches!(
            svc.get_me(&ctx("ghost", "G", Role::Client)),
            Err(PairError::Unauthenticated(_))
        ));
        assert!(matches!(
            svc.register(&CallerContext::anonymous()),
            Err(PairError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_update_me_validates() {
        let svc = service();
        let caller = ctx("adv-1", "Ada", Role::Advisor);
        svc.register(&caller).unwrap();

        let err = svc
            .update_me(&caller, ProfileUpdate { name: Some("   ".into()), tagline: None })
            .unwrap_err();
        assert!(matches!(err, PairError::InvalidInput(_)));

        let long = "x".repeat(MAX_TAGLINE_LEN + 1);
        assert!(svc.update_me(&caller, ProfileUpdate { name: None, tagline: Some(long) }).is_err());

        let updated = svc
            .update_me(&caller, ProfileUpdate { name: None, tagline: Some("Fee-only planner".into()) })
            .unwrap();
        assert_eq!(updated.tagline.as_deref(), Some("Fee-only planner"));
        assert_eq!(updated.role, Role::Advisor);
    }

    #[test]
    fn test_blank_tagline_clears_it() {
        let svc = service();
        let caller = ctx("adv-1", "Ada", Role::Advisor);
        svc.register(&caller).unwrap();
        svc.update_me(&caller, ProfileUpdate { name: None, tagline: Some("Fee-only planner".into()) })
            .unwrap();

        let cleared = svc
            .update_me(&caller, ProfileUpdate { name: None, tagline: Some("   ".into()) })
            .unwrap();
        assert_eq!(cleared.tagline, None);
        assert_eq!(svc.get_me(&caller).unwrap().tagline, None);
    }
}
