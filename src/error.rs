//! Error types for portfolio-pair
//!
//! Every operation in the core returns [`PairError`]. Callers branch on
//! [`PairError::kind`] rather than on message text.

use serde::Serialize;
use thiserror::Error;

/// Message shown when a client tries to pick a second advisor
pub const ALREADY_ASSIGNED: &str = "you already have an advisor";

#[derive(Error, Debug)]
pub enum PairError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Caller-visible error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    InvalidTarget,
    Conflict,
    Unavailable,
    InvalidInput,
    Internal,
}

impl PairError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidTarget(_) => ErrorKind::InvalidTarget,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Only a store outage may be retried; every other kind is deterministic
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Message safe to hand to the presentation layer.
    ///
    /// Forbidden and InvalidTarget collapse to fixed strings so a caller
    /// cannot tell which identities exist.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated(_) => "sign in required".to_string(),
            Self::Forbidden(_) => "access denied".to_string(),
            Self::InvalidTarget(_) => "access denied".to_string(),
            Self::Conflict(msg) => msg.clone(),
            Self::Unavailable(_) => "service temporarily unavailable, try again".to_string(),
            Self::InvalidInput(msg) => msg.clone(),
            Self::Config(_) | Self::Internal(_) => "internal error".to_string(),
        }
    }
}

impl From<std::io::Error> for PairError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for PairError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON error: {}", err))
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, PairError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(PairError::Unavailable("db down".into()).is_retryable());
        assert!(!PairError::Conflict(ALREADY_ASSIGNED.into()).is_retryable());
        assert!(!PairError::Forbidden("x".into()).is_retryable());
        assert!(!PairError::InvalidTarget("x".into()).is_retryable());
        assert!(!PairError::Unauthenticated("x".into()).is_retryable());
    }

    #[test]
    fn test_denials_do_not_leak_detail() {
        let forbidden = PairError::Forbidden("portfolio p-1 belongs to advisor a-2".into());
        let invalid = PairError::InvalidTarget("actor c-9 is a client".into());
        assert_eq!(forbidden.user_message(), invalid.user_message());
        assert!(!invalid.user_message().contains("c-9"));
    }

    #[test]
    fn test_conflict_message_passes_through() {
        let err = PairError::Conflict(ALREADY_ASSIGNED.into());
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.user_message(), "you already have an advisor");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InvalidTarget).unwrap();
        assert_eq!(json, "\"invalid_target\"");
    }
}
