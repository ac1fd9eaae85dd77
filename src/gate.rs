//! Visibility gate: who may read or write which assignment and portfolio rows
//!
//! Pure functions of (caller, operation, target). Nothing is cached; every
//! call site re-reads the records it passes in, so a relationship created
//! one request ago is honoured on the next.
//!
//! | Operation | Role | Allowed when |
//! |---|---|---|
//! | read assignment | client | it is their own assignment |
//! | read assignment | advisor | they are the advisor on it |
//! | create assignment | client | they are assigning themselves |
//! | list roster | advisor | it is their own roster |
//! | read portfolio | client | it targets them and is published |
//! | read portfolio | advisor | they own it (drafts included) |
//! | create portfolio | advisor | they are the target client's assigned advisor |
//! | update portfolio | advisor | they own it |
//!
//! Any other combination is denied.

use tracing::debug;

use crate::error::{PairError, Result};
use crate::models::{Actor, ActorId, Assignment, Portfolio, PortfolioStatus, Role};

/// An access attempt, carrying the record it targets
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    ReadAssignment(&'a Assignment),
    CreateAssignment { client_id: &'a ActorId },
    ListRoster { advisor_id: &'a ActorId },
    ReadPortfolio(&'a Portfolio),
    /// `assignment` is the row currently stored for `client_id`, if any
    CreatePortfolio {
        client_id: &'a ActorId,
        assignment: Option<&'a Assignment>,
    },
    UpdatePortfolio(&'a Portfolio),
}

impl Operation<'_> {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ReadAssignment(_) => "read_assignment",
            Operation::CreateAssignment { .. } => "create_assignment",
            Operation::ListRoster { .. } => "list_roster",
            Operation::ReadPortfolio(_) => "read_portfolio",
            Operation::CreatePortfolio { .. } => "create_portfolio",
            Operation::UpdatePortfolio(_) => "update_portfolio",
        }
    }
}

/// Gate decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    fn deny(reason: impl Into<String>) -> Self {
        Decision::Deny { reason: reason.into() }
    }

    fn allow_if(condition: bool, reason: &str) -> Self {
        if condition {
            Decision::Allow
        } else {
            Decision::deny(reason)
        }
    }
}

/// Evaluate an operation for `actor`
pub fn evaluate(actor: &Actor, op: &Operation<'_>) -> Decision {
    match (actor.role, op) {
        (Role::Client, Operation::ReadAssignment(target)) => {
            Decision::allow_if(target.client_id == actor.id, "not your assignment")
        }
        (Role::Advisor, Operation::ReadAssignment(target)) => {
            Decision::allow_if(target.advisor_id == actor.id, "not your client")
        }

        (Role::Client, Operation::CreateAssignment { client_id }) => {
            Decision::allow_if(**client_id == actor.id, "clients may only assign themselves")
        }

        (Role::Advisor, Operation::ListRoster { advisor_id }) => {
            Decision::allow_if(**advisor_id == actor.id, "not your roster")
        }

        (Role::Client, Operation::ReadPortfolio(target)) => {
            if target.client_id != actor.id {
                Decision::deny("portfolio targets another client")
            } else {
                Decision::allow_if(
                    target.status == PortfolioStatus::Published,
                    "portfolio is not published",
                )
            }
        }
        (Role::Advisor, Operation::ReadPortfolio(target)) => {
            Decision::allow_if(target.advisor_id == actor.id, "portfolio owned by another advisor")
        }

        (Role::Advisor, Operation::CreatePortfolio { client_id, assignment }) => {
            let assigned = assignment
                .map(|a| a.advisor_id == actor.id && a.client_id == **client_id)
                .unwrap_or(false);
            Decision::allow_if(assigned, "not the assigned advisor for this client")
        }

        (Role::Advisor, Operation::UpdatePortfolio(target)) => {
            Decision::allow_if(target.advisor_id == actor.id, "portfolio owned by another advisor")
        }

        (role, op) => Decision::deny(format!("{} may not {}", role, op.name())),
    }
}

/// Evaluate and convert a denial into `Forbidden`
pub fn authorize(actor: &Actor, op: &Operation<'_>) -> Result<()> {
    match evaluate(actor, op) {
        Decision::Allow => Ok(()),
        Decision::Deny { reason } => {
            debug!(actor = %actor.id, role = %actor.role, operation = op.name(), reason = %reason, "Gate denied");
            Err(PairError::Forbidden(reason))
        }
    }
}

/// Shorthand for filtering listings
pub fn can_read_portfolio(actor: &Actor, portfolio: &Portfolio) -> bool {
    evaluate(actor, &Operation::ReadPortfolio(portfolio)).is_allowed()
}
