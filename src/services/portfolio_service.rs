//! Portfolio service - advisor-authored recommendations and their lifecycle
//!
//! Drafts are visible to the owning advisor only. Publishing makes a
//! portfolio visible to its target client; there is no way back.

use std::sync::Arc;

use crate::auth::CallerContext;
use crate::error::{PairError, Result};
use crate::gate::{self, Operation};
use crate::models::{ActorId, NewPortfolio, Portfolio, PortfolioStatus, PortfolioUpdate, Role};
use crate::store::{PortfolioQuery, RecordStore};

use super::events::{EventBus, PairEvent};
use super::resolve_caller;

pub const MAX_PORTFOLIO_NAME_LEN: usize = 200;

pub struct PortfolioService {
    store: Arc<dyn RecordStore>,
    events: Arc<EventBus>,
}

impl PortfolioService {
    pub fn new(store: Arc<dyn RecordStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Get one portfolio. Missing and hidden look the same to the caller.
    pub fn get_portfolio(&self, ctx: &CallerContext, id: &str) -> Result<Portfolio> {
        let caller = resolve_caller(self.store.as_ref(), ctx)?;
        let portfolio = self.store.get_portfolio(id)?.ok_or_else(|| hidden(id))?;

        gate::authorize(&caller, &Operation::ReadPortfolio(&portfolio))?;
        Ok(portfolio)
    }

    /// Everything the caller may read, newest first.
    ///
    /// Clients see published portfolios addressed to them; advisors see
    /// everything they own, drafts included.
    pub fn list_visible_portfolios(&self, ctx: &CallerContext) -> Result<Vec<Portfolio>> {
        let caller = resolve_caller(self.store.as_ref(), ctx)?;

        let query = match caller.role {
            Role::Client => PortfolioQuery::published_for(&caller.id),
            Role::Advisor => PortfolioQuery::owned_by(&caller.id),
        };

        let mut rows = self.store.list_portfolios(&query)?;
        rows.retain(|p| gate::can_read_portfolio(&caller, p));
        Ok(rows)
    }

    /// Portfolios for one client, as seen by the caller
    pub fn list_portfolios_for_client(
        &self,
        ctx: &CallerContext,
        client_id: &ActorId,
    ) -> Result<Vec<Portfolio>> {
        let caller = resolve_caller(self.store.as_ref(), ctx)?;

        let query = match caller.role {
            Role::Client if caller.id == *client_id => PortfolioQuery::published_for(client_id),
            Role::Client => return Err(PairError::Forbidden("portfolios of another client".into())),
            Role::Advisor => PortfolioQuery {
                client_id: Some(client_id.clone()),
                ..PortfolioQuery::owned_by(&caller.id)
            },
        };

        let mut rows = self.store.list_portfolios(&query)?;
        rows.retain(|p| gate::can_read_portfolio(&caller, p));
        Ok(rows)
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Create a draft for a client the caller is assigned to
    pub fn create_portfolio(&self, ctx: &CallerContext, input: NewPortfolio) -> Result<Portfolio> {
        let caller = resolve_caller(self.store.as_ref(), ctx)?;

        let assignment = self.store.assignment_for_client(&input.client_id)?;
        gate::authorize(
            &caller,
            &Operation::CreatePortfolio {
                client_id: &input.client_id,
                assignment: assignment.as_ref(),
            },
        )?;

        let input = NewPortfolio {
            name: validate_name(&input.name)?,
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            ..input
        };

        let portfolio = self.store.insert_portfolio(&caller.id, &input)?;

        self.events.emit(PairEvent::PortfolioCreated {
            id: portfolio.id.clone(),
            advisor_id: portfolio.advisor_id.clone(),
            client_id: portfolio.client_id.clone(),
        });

        Ok(portfolio)
    }

    /// Edit content and/or status of an owned portfolio
    pub fn update_portfolio(
        &self,
        ctx: &CallerContext,
        id: &str,
        update: PortfolioUpdate,
    ) -> Result<Portfolio> {
        let caller = resolve_caller(self.store.as_ref(), ctx)?;
        let current = self.store.get_portfolio(id)?.ok_or_else(|| hidden(id))?;

        gate::authorize(&caller, &Operation::UpdatePortfolio(&current))?;

        if let Some(next) = update.status {
            if !current.status.can_transition_to(next) {
                return Err(PairError::InvalidInput(format!(
                    "portfolio cannot move from {} to {}",
                    current.status, next
                )));
            }
        }

        // A blank description is kept as `Some("")`, which clears the stored one
        let update = PortfolioUpdate {
            name: update.name.as_deref().map(validate_name).transpose()?,
            description: update.description.map(|d| d.trim().to_string()),
            ..update
        };

        if update.is_empty() {
            return Ok(current);
        }

        let updated = self
            .store
            .update_portfolio(id, &caller.id, &update)?
            .ok_or_else(|| hidden(id))?;

        self.events.emit(PairEvent::PortfolioUpdated { id: updated.id.clone() });
        if current.status == PortfolioStatus::Draft && updated.status == PortfolioStatus::Published {
            self.events.emit(PairEvent::PortfolioPublished {
                id: updated.id.clone(),
                client_id: updated.client_id.clone(),
            });
        }

        Ok(updated)
    }

    /// Make a draft visible to its client
    pub fn publish_portfolio(&self, ctx: &CallerContext, id: &str) -> Result<Portfolio> {
        self.update_portfolio(ctx, id, PortfolioUpdate::publish())
    }
}

fn hidden(id: &str) -> PairError {
    PairError::Forbidden(format!("portfolio {} is not visible", id))
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PairError::InvalidInput("portfolio name is required".into()));
    }
    if name.chars().count() > MAX_PORTFOLIO_NAME_LEN {
        return Err(PairError::InvalidInput(format!(
            "portfolio name must be at most {} characters",
            MAX_PORTFOLIO_NAME_LEN
        )));
    }
    Ok(name.to_string())
}
