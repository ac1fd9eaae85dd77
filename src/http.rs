//! HTTP API for advisor matching and portfolio visibility
//!
//! JSON over HTTP/1.1. Every route except `/health` expects an
//! `Authorization: Bearer <jwt>` header; the token is resolved by the
//! configured [`IdentityProvider`] into a [`CallerContext`] per request.
//!
//! ## Profiles
//! - `POST /session` - register the caller on first sign-in (idempotent)
//! - `GET /me`, `PUT /me` - read or edit own profile
//! - `GET /dashboard` - role-specific landing view
//!
//! ## Matching
//! - `GET /advisors` - advisor directory, newest first
//! - `GET /advisors/{id}` - one directory entry
//! - `POST /assignments` - `{"advisor_id": "..."}` pick an advisor
//! - `GET /assignments/client/{id}` - a client's assignment or `null`
//! - `GET /assignments/advisor/{id}` - an advisor's roster
//!
//! ## Portfolios
//! - `GET /portfolios`, `POST /portfolios` - visible list / create draft
//! - `GET /portfolios/{id}`, `PATCH /portfolios/{id}` - read / edit
//! - `POST /portfolios/{id}/publish` - publish a draft
//! - `GET /clients/{id}/portfolios` - portfolios for one client
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST -H "Authorization: Bearer $TOKEN" \
//!      -d '{"advisor_id": "adv-123"}' \
//!      http://localhost:8095/assignments
//! ```

use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::auth::{CallerContext, IdentityProvider};
use crate::error::{PairError, Result};
use crate::models::{ActorId, Assignment, NewPortfolio, PortfolioUpdate, ProfileUpdate};
use crate::services::{
    error_response, from_create_result, from_result, method_not_allowed, not_found, ok,
    HttpResponse, Services,
};

/// Request bodies larger than this are rejected
pub const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct CreateAssignmentRequest {
    advisor_id: ActorId,
    /// Defaults to the caller
    #[serde(default)]
    client_id: Option<ActorId>,
}

/// HTTP server state
pub struct HttpServer {
    services: Arc<Services>,
    identity: Arc<dyn IdentityProvider>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    pub fn new(
        services: Arc<Services>,
        identity: Arc<dyn IdentityProvider>,
        bind_addr: SocketAddr,
    ) -> Self {
        Self { services, identity, bind_addr }
    }

    /// Run the HTTP server
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { Ok::<_, Infallible>(server.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    /// Route one request. Never fails; errors become JSON error responses.
    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let path = req.uri().path().to_string();
        let method = req.method().clone();
        debug!(method = %method, path = %path, "Incoming request");

        let credential = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let ctx = CallerContext::from_provider(self.identity.as_ref(), credential);

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let services = &self.services;

        match (&method, segments.as_slice()) {
            (&Method::GET, ["health"]) => ok(&serde_json::json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
            })),

            // Profiles
            (&Method::POST, ["session"]) => from_result(services.profiles.register(&ctx)),
            (&Method::GET, ["me"]) => from_result(services.profiles.get_me(&ctx)),
            (&Method::PUT, ["me"]) => match read_authenticated::<ProfileUpdate, _>(&ctx, req).await {
                Ok(update) => from_result(services.profiles.update_me(&ctx, update)),
                Err(e) => error_response(e),
            },
            (&Method::GET, ["dashboard"]) => from_result(services.dashboard.load(&ctx)),

            // Directory
            (&Method::GET, ["advisors"]) => from_result(services.directory.list_advisors(&ctx)),
            (&Method::GET, ["advisors", id]) => {
                from_result(services.directory.get_advisor(&ctx, &ActorId::from(*id)))
            }

            // Assignments
            (&Method::POST, ["assignments"]) => {
                from_create_result(self.create_assignment(&ctx, req).await)
            }
            (&Method::GET, ["assignments", "client", id]) => from_result(
                services
                    .assignments
                    .get_assignment_for_client(&ctx, &ActorId::from(*id)),
            ),
            (&Method::GET, ["assignments", "advisor", id]) => from_result(
                services
                    .assignments
                    .list_assignments_for_advisor(&ctx, &ActorId::from(*id)),
            ),

            // Portfolios
            (&Method::GET, ["portfolios"]) => {
                from_result(services.portfolios.list_visible_portfolios(&ctx))
            }
            (&Method::POST, ["portfolios"]) => match read_authenticated::<NewPortfolio, _>(&ctx, req).await {
                Ok(input) => from_create_result(services.portfolios.create_portfolio(&ctx, input)),
                Err(e) => error_response(e),
            },
            (&Method::GET, ["portfolios", id]) => {
                from_result(services.portfolios.get_portfolio(&ctx, id))
            }
            (&Method::PATCH, ["portfolios", id]) => {
                let id = id.to_string();
                match read_authenticated::<PortfolioUpdate, _>(&ctx, req).await {
                    Ok(update) => from_result(services.portfolios.update_portfolio(&ctx, &id, update)),
                    Err(e) => error_response(e),
                }
            }
            (&Method::POST, ["portfolios", id, "publish"]) => {
                from_result(services.portfolios.publish_portfolio(&ctx, id))
            }
            (&Method::GET, ["clients", id, "portfolios"]) => from_result(
                services
                    .portfolios
                    .list_portfolios_for_client(&ctx, &ActorId::from(*id)),
            ),

            // Known paths, wrong method
            (_, ["health" | "session" | "me" | "dashboard" | "advisors" | "assignments" | "portfolios", ..])
            | (_, ["clients", _, "portfolios"]) => method_not_allowed(),

            _ => not_found("Not found"),
        }
    }

    /// POST /assignments
    async fn create_assignment<B>(&self, ctx: &CallerContext, req: Request<B>) -> Result<Assignment>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let caller = ctx.identity()?.id.clone();
        let body: CreateAssignmentRequest = read_json(req).await?;
        let client_id = body.client_id.unwrap_or(caller);

        self.services
            .assignments
            .create_assignment(ctx, &client_id, &body.advisor_id)
    }
}

/// Reject anonymous callers before touching the body, then decode it
async fn read_authenticated<T, B>(ctx: &CallerContext, req: Request<B>) -> Result<T>
where
    T: DeserializeOwned,
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    ctx.identity()?;
    read_json(req).await
}

/// Read and decode a JSON request body
async fn read_json<T, B>(req: Request<B>) -> Result<T>
where
    T: DeserializeOwned,
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| PairError::InvalidInput(format!("Failed to read body: {}", e)))?
        .to_bytes();

    Ok(serde_json::from_slice(&body)?)
}
