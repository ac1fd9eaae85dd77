//! Portfolio Pair - advisor matching and portfolio visibility
//!
//! Clients pick exactly one advisor from a directory. Advisors author
//! portfolios for their assigned clients; a portfolio stays private to its
//! advisor until it is published, after which its target client can read it.
//!
//! ## Architecture
//!
//! - **Record store** (`store`, `db`): SQLite behind the [`RecordStore`] trait.
//!   The one-advisor-per-client rule is a `UNIQUE` constraint, so concurrent
//!   picks resolve to exactly one winner.
//! - **Visibility gate** (`gate`): pure allow/deny decisions over
//!   (caller, operation, target record), re-evaluated on every request.
//! - **Services** (`services`): directory, assignments, portfolios, profiles
//!   and dashboards. Each takes an explicit [`CallerContext`].
//! - **HTTP** (`http`): JSON API with bearer-token identities.
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/portfolio-pair/
//! ├── portfolio-pair.db      # SQLite database (WAL mode)
//! └── config.toml            # Configuration
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod http;
pub mod models;
pub mod services;
pub mod store;

// Re-exports
pub use auth::{AuthenticatedIdentity, CallerContext, IdentityProvider, JwtIdentityProvider, JwtValidator};
pub use config::Config;
pub use db::SqliteStore;
pub use error::{ErrorKind, PairError, Result};
pub use gate::{Decision, Operation};
pub use http::HttpServer;
pub use models::{Actor, ActorId, Assignment, Portfolio, PortfolioStatus, Role};
pub use services::Services;
pub use store::{PortfolioQuery, RecordStore};
