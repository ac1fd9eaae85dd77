//! Dashboard - the landing view for each role
//!
//! Composed from the assignment and portfolio services so every row passes
//! the same gate checks as the individual endpoints.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::auth::CallerContext;
use crate::error::Result;
use crate::models::{Actor, ActorSummary, Assignment, Portfolio, PortfolioStatus, Role};
use crate::store::{PortfolioQuery, RecordStore};

use super::assignment_service::AssignmentService;
use super::portfolio_service::PortfolioService;
use super::resolve_caller;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Client(ClientDashboard),
    Advisor(AdvisorDashboard),
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientDashboard {
    pub profile: Actor,
    /// `None` until the client picks an advisor
    pub advisor: Option<AssignedAdvisor>,
    pub portfolios: Vec<Portfolio>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignedAdvisor {
    pub assignment: Assignment,
    pub advisor: ActorSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvisorDashboard {
    pub profile: Actor,
    pub clients: Vec<RosterEntry>,
    pub portfolio_count: u64,
    pub published_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub assignment: Assignment,
    pub client: ActorSummary,
}

pub struct DashboardService {
    store: Arc<dyn RecordStore>,
    assignments: Arc<AssignmentService>,
    portfolios: Arc<PortfolioService>,
}

impl DashboardService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        assignments: Arc<AssignmentService>,
        portfolios: Arc<PortfolioService>,
    ) -> Self {
        Self { store, assignments, portfolios }
    }

    pub fn load(&self, ctx: &CallerContext) -> Result<Dashboard> {
        let caller = resolve_caller(self.store.as_ref(), ctx)?;
        match caller.role {
            Role::Client => self.client_view(ctx, caller).map(Dashboard::Client),
            Role::Advisor => self.advisor_view(ctx, caller).map(Dashboard::Advisor),
        }
    }

    fn client_view(&self, ctx: &CallerContext, profile: Actor) -> Result<ClientDashboard> {
        let assignment = self.assignments.get_assignment_for_client(ctx, &profile.id)?;

        let Some(assignment) = assignment else {
            return Ok(ClientDashboard { profile, advisor: None, portfolios: Vec::new() });
        };

        let advisor = match self.store.get_actor(&assignment.advisor_id)? {
            Some(actor) => actor.summary(),
            None => {
                warn!(assignment = %assignment.id, advisor = %assignment.advisor_id, "Assigned advisor has no actor row");
                return Ok(ClientDashboard { profile, advisor: None, portfolios: Vec::new() });
            }
        };

        let portfolios = self.portfolios.list_visible_portfolios(ctx)?;

        Ok(ClientDashboard {
            profile,
            advisor: Some(AssignedAdvisor { assignment, advisor }),
            portfolios,
        })
    }

    fn advisor_view(&self, ctx: &CallerContext, profile: Actor) -> Result<AdvisorDashboard> {
        let roster = self.assignments.list_assignments_for_advisor(ctx, &profile.id)?;

        let mut clients = Vec::with_capacity(roster.len());
        for assignment in roster {
            match self.store.get_actor(&assignment.client_id)? {
                Some(client) => clients.push(RosterEntry { assignment, client: client.summary() }),
                None => {
                    warn!(assignment = %assignment.id, client = %assignment.client_id, "Assigned client has no actor row");
                }
            }
        }

        let owned = PortfolioQuery::owned_by(&profile.id);
        let portfolio_count = self.store.count_portfolios(&owned)?;
        let published_count = self.store.count_portfolios(&PortfolioQuery {
            status: Some(PortfolioStatus::Published),
            ..owned
        })?;

        Ok(AdvisorDashboard { profile, clients, portfolio_count, published_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedIdentity;
    use crate::db::SqliteStore;
    use crate::models::{NewActor, NewPortfolio};
    use crate::services::Services;

    fn ctx(id: &str, role: Role) -> CallerContext {
        CallerContext::authenticated(AuthenticatedIdentity::new(id, id, role))
    }

    fn services() -> Services {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        for (id, role) in [("adv-y", Role::Advisor), ("cli-x", Role::Client), ("cli-w", Role::Client)] {
            store
                .insert_actor_if_absent(&NewActor { id: id.into(), name: id.into(), tagline: Some("hi".into()), role })
                .unwrap();
        }
        Services::new(store)
    }

    #[test]
    fn test_unassigned_client_dashboard_is_empty() {
        let services = services();
        match services.dashboard.load(&ctx("cli-x", Role::Client)).unwrap() {
            Dashboard::Client(view) => {
                assert!(view.advisor.is_none());
                assert!(view.portfolios.is_empty());
            }
            other => panic!("unexpected dashboard: {:?}", other),
        }
    }

    #[test]
    fn test_dashboards_after_pairing() {
        let services = services();
        let x = ctx("cli-x", Role::Client);
        let y = ctx("adv-y", Role::Advisor);

        services.assignments.create_assignment(&x, &"cli-x".into(), &"adv-y".into()).unwrap();
        services.assignments.create_assignment(&ctx("cli-w", Role::Client), &"cli-w".into(), &"adv-y".into()).unwrap();

        let draft = services
            .portfolios
            .create_portfolio(&y, NewPortfolio { client_id: "cli-x".into(), name: "A".into(), description: None })
            .unwrap();
        services
            .portfolios
            .create_portfolio(&y, NewPortfolio { client_id: "cli-x".into(), name: "B".into(), description: None })
            .unwrap();
        services.portfolios.publish_portfolio(&y, &draft.id).unwrap();

        match services.dashboard.load(&x).unwrap() {
            Dashboard::Client(view) => {
                let advisor = view.advisor.unwrap();
                assert_eq!(advisor.advisor.id.as_str(), "adv-y");
                assert_eq!(view.portfolios.len(), 1);
                assert_eq!(view.portfolios[0].id, draft.id);
            }
            other => panic!("unexpected dashboard: {:?}", other),
        }

        match services.dashboard.load(&y).unwrap() {
            Dashboard::Advisor(view) => {
                assert_eq!(view.clients.len(), 2);
                assert_eq!(view.clients[0].client.id.as_str(), "cli-x");
                assert_eq!(view.portfolio_count, 2);
                assert_eq!(view.published_count, 1);
            }
            other => panic!("unexpected dashboard: {:?}", other),
        }
    }

    #[test]
    fn test_dashboard_serializes_with_role_tag() {
        let services = services();
        let view = services.dashboard.load(&ctx("cli-x", Role::Client)).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["role"], "client");
        assert_eq!(json["profile"]["id"], "cli-x");
    }
}
