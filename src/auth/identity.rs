//! Caller identity
//!
//! The identity provider turns a request credential into an identity (or
//! nothing). The result is wrapped in a [`CallerContext`] that every core
//! operation takes as an explicit argument; there is no ambient session.

use serde::Serialize;
use tracing::debug;

use super::jwt::{bearer_token, JwtValidator};
use crate::error::{PairError, Result};
use crate::models::{ActorId, Role};

/// Identity and claims vouched for by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedIdentity {
    pub id: ActorId,
    pub name: String,
    pub role: Role,
}

impl AuthenticatedIdentity {
    pub fn new(id: impl Into<ActorId>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }
}

/// Source of caller identities
pub trait IdentityProvider: Send + Sync {
    /// Resolve a credential (e.g. an Authorization header value).
    /// `None` means the caller is unauthenticated.
    fn current_actor_identity(&self, credential: Option<&str>) -> Option<AuthenticatedIdentity>;
}

/// Identity provider backed by HS256 bearer tokens
#[derive(Clone)]
pub struct JwtIdentityProvider {
    validator: JwtValidator,
}

impl JwtIdentityProvider {
    pub fn new(validator: JwtValidator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &JwtValidator {
        &self.validator
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn current_actor_identity(&self, credential: Option<&str>) -> Option<AuthenticatedIdentity> {
        let token = bearer_token(credential)?;
        match self.validator.verify_token(token) {
            Ok(claims) => Some(AuthenticatedIdentity {
                id: ActorId::from(claims.sub),
                name: claims.name,
                role: claims.role,
            }),
            Err(e) => {
                debug!(error = %e, "Rejected bearer token");
                None
            }
        }
    }
}

/// Per-request caller, passed explicitly into every operation
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    identity: Option<AuthenticatedIdentity>,
}

impl CallerContext {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn authenticated(identity: AuthenticatedIdentity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    /// Resolve the caller for one request
    pub fn from_provider(provider: &dyn IdentityProvider, credential: Option<&str>) -> Self {
        Self {
            identity: provider.current_actor_identity(credential),
        }
    }

    /// The caller's identity, or `Unauthenticated`
    pub fn identity(&self) -> Result<&AuthenticatedIdentity> {
        self.identity
            .as_ref()
            .ok_or_else(|| PairError::Unauthenticated("no valid caller identity".into()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}
