//! Service layer for portfolio-pair
//!
//! Services sit between the HTTP handlers and the record store. Each one:
//! - resolves the caller from the explicit [`CallerContext`]
//! - asks the visibility gate before touching a row
//! - emits an event after each successful write
//!
//! ## Architecture
//!
//! ```text
//! HTTP Handlers (thin)
//!     ↓
//! Service Layer (authorization + validation)
//!     ↓
//! RecordStore (db/*.rs)
//!     ↓
//! SQLite Database
//! ```

pub mod response;
pub mod events;
pub mod profile_service;
pub mod directory;
pub mod assignment_service;
pub mod portfolio_service;
pub mod dashboard;

pub use response::*;
pub use events::{EventBus, EventListener, PairEvent};
pub use profile_service::ProfileService;
pub use directory::DirectoryService;
pub use assignment_service::AssignmentService;
pub use portfolio_service::PortfolioService;
pub use dashboard::{Dashboard, DashboardService};

use std::sync::Arc;

use crate::auth::CallerContext;
use crate::error::{PairError, Result};
use crate::models::Actor;
use crate::store::RecordStore;

/// Load the caller's stored actor row.
///
/// A valid identity without a registered actor is treated as
/// unauthenticated: the account must be created through `register` first.
pub(crate) fn resolve_caller(store: &dyn RecordStore, ctx: &CallerContext) -> Result<Actor> {
    let identity = ctx.identity()?;

    store
        .get_actor(&identity.id)?
        .ok_or_else(|| PairError::Unauthenticated(format!("actor {} is not registered", identity.id)))
}

/// Service container for dependency injection
///
/// Holds all services over one shared record store.
pub struct Services {
    pub profiles: Arc<ProfileService>,
    pub directory: Arc<DirectoryService>,
    pub assignments: Arc<AssignmentService>,
    pub portfolios: Arc<PortfolioService>,
    pub dashboard: Arc<DashboardService>,
    pub events: Arc<EventBus>,
}

impl Services {
    /// Create all services with a fresh event bus
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_events(store, Arc::new(EventBus::new()))
    }

    /// Create all services publishing to an existing event bus
    pub fn with_events(store: Arc<dyn RecordStore>, events: Arc<EventBus>) -> Self {
        let assignments = Arc::new(AssignmentService::new(store.clone(), events.clone()));
        let portfolios = Arc::new(PortfolioService::new(store.clone(), events.clone()));

        Self {
            profiles: Arc::new(ProfileService::new(store.clone(), events.clone())),
            directory: Arc::new(DirectoryService::new(store.clone())),
            dashboard: Arc::new(DashboardService::new(
                store,
                assignments.clone(),
                portfolios.clone(),
            )),
            assignments,
            portfolios,
            events,
        }
    }
}
