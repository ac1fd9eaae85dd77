//! Domain records shared by the store, the gate and the services
//!
//! Records reference each other by identity only. Nothing here holds a
//! pointer to another record; every relationship is re-resolved through
//! the record store on each request.

use std::fmt;
use std::str::FromStr;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::error::PairError;

// ============================================================================
// Timestamp Helpers (SQLite stores timestamps as TEXT)
// ============================================================================

/// Current UTC time as RFC 3339 with microseconds, sortable as text
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ============================================================================
// Identity
// ============================================================================

/// Opaque identity issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Role fixed at account creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Advisor,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Advisor => "advisor",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "advisor" => Ok(Role::Advisor),
            "client" => Ok(Role::Client),
            other => Err(PairError::InvalidInput(format!(
                "Invalid role: {}. Valid roles: advisor, client",
                other
            ))),
        }
    }
}

// ============================================================================
// Actor
// ============================================================================

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub tagline: Option<String>,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl Actor {
    pub fn is_advisor(&self) -> bool {
        self.role == Role::Advisor
    }

    pub fn is_client(&self) -> bool {
        self.role == Role::Client
    }

    /// Public directory card for this actor
    pub fn summary(&self) -> ActorSummary {
        ActorSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            tagline: self.tagline.clone(),
        }
    }
}

/// Name and tagline only, for embedding in another actor's view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSummary {
    pub id: ActorId,
    pub name: String,
    pub tagline: Option<String>,
}

/// Input for creating an actor on first authentication
#[derive(Debug, Clone)]
pub struct NewActor {
    pub id: ActorId,
    pub name: String,
    pub tagline: Option<String>,
    pub role: Role,
}

/// Self-service profile edit. Role is deliberately absent; an empty
/// tagline clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
}

// ============================================================================
// Assignment
// ============================================================================

/// Exclusive pairing of one client to one advisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub advisor_id: ActorId,
    pub client_id: ActorId,
    pub created_at: String,
}

// ============================================================================
// Portfolio
// ============================================================================

/// Portfolio lifecycle. Draft is advisor-private.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortfolioStatus {
    Draft,
    Published,
}

impl PortfolioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortfolioStatus::Draft => "draft",
            PortfolioStatus::Published => "published",
        }
    }

    /// `published -> draft` is not a supported transition
    pub fn can_transition_to(&self, next: PortfolioStatus) -> bool {
        !matches!((self, next), (PortfolioStatus::Published, PortfolioStatus::Draft))
    }
}

impl fmt::Display for PortfolioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortfolioStatus {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PortfolioStatus::Draft),
            "published" => Ok(PortfolioStatus::Published),
            other => Err(PairError::InvalidInput(format!(
                "Invalid portfolio status: {}. Valid statuses: draft, published",
                other
            ))),
        }
    }
}

/// Advisor-authored recommendation for one client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: String,
    pub advisor_id: ActorId,
    pub client_id: ActorId,
    pub status: PortfolioStatus,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a portfolio. The owner is always the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPortfolio {
    pub client_id: ActorId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial portfolio edit; `None` leaves a field untouched and an empty
/// description clears it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortfolioUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<PortfolioStatus>,
}

impl PortfolioUpdate {
    pub fn publish() -> Self {
        Self {
            status: Some(PortfolioStatus::Published),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("advisor".parse::<Role>().unwrap(), Role::Advisor);
        assert_eq!(Role::Client.as_str(), "client");
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_unpublish_is_rejected() {
        assert!(PortfolioStatus::Draft.can_transition_to(PortfolioStatus::Published));
        assert!(PortfolioStatus::Draft.can_transition_to(PortfolioStatus::Draft));
        assert!(PortfolioStatus::Published.can_transition_to(PortfolioStatus::Published));
        assert!(!PortfolioStatus::Published.can_transition_to(PortfolioStatus::Draft));
    }

    #[test]
    fn test_timestamps_sort_lexically() {
        let a = current_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = current_timestamp();
        assert!(a < b);
        assert!(a.ends_with('Z'));
    }

    #[test]
    fn test_portfolio_update_deserializes_partial() {
        let update: PortfolioUpdate = serde_json::from_str(r#"{"status":"published"}"#).unwrap();
        assert_eq!(update.status, Some(PortfolioStatus::Published));
        assert!(update.name.is_none());
        assert!(!update.is_empty());
    }
}
