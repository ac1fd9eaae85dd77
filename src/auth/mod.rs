//! Authentication for portfolio-pair
//!
//! Provides:
//! - JWT token generation and validation
//! - The identity provider seam consumed by the core
//! - The explicit per-request caller context

pub mod identity;
pub mod jwt;

pub use identity::{AuthenticatedIdentity, CallerContext, IdentityProvider, JwtIdentityProvider};
pub use jwt::{bearer_token, Claims, JwtValidator, TokenInput};
