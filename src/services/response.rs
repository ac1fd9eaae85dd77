//! HTTP response building helpers
//!
//! Every handler answers with JSON. Errors use the body
//! `{"error": <message>, "kind": <kind>}` where the message comes from
//! [`PairError::user_message`].

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::warn;

use crate::error::{ErrorKind, PairError};

pub type HttpResponse = Response<Full<Bytes>>;

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    let json = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Build a JSON response with 200 OK status
pub fn ok<T: Serialize>(body: &T) -> HttpResponse {
    json_response(StatusCode::OK, body)
}

/// Build a JSON response with 201 Created status
pub fn created<T: Serialize>(body: &T) -> HttpResponse {
    json_response(StatusCode::CREATED, body)
}

pub fn not_found(message: &str) -> HttpResponse {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": message, "kind": "not_found" }),
    )
}

pub fn method_not_allowed() -> HttpResponse {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "Method not allowed", "kind": "method_not_allowed" }),
    )
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden | ErrorKind::InvalidTarget => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert a PairError to an appropriate HTTP response
pub fn error_response(error: PairError) -> HttpResponse {
    let kind = error.kind();
    if kind == ErrorKind::Internal {
        warn!(error = %error, "Request failed");
    }

    let mut response = json_response(
        status_for(kind),
        &serde_json::json!({ "error": error.user_message(), "kind": kind }),
    );
    if error.is_retryable() {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
    }
    response
}

/// Wrap a service result into an HTTP response
pub fn from_result<T: Serialize>(result: Result<T, PairError>) -> HttpResponse {
    match result {
        Ok(value) => ok(&value),
        Err(e) => error_response(e),
    }
}

/// Wrap a create result into an HTTP response with 201 Created
pub fn from_create_result<T: Serialize>(result: Result<T, PairError>) -> HttpResponse {
    match result {
        Ok(value) => created(&value),
        Err(e) => error_response(e),
    }
}
