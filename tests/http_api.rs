//! HTTP routing tests driven through `HttpServer::handle` without a socket

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{header, Method, Request, StatusCode};
use portfolio_pair::auth::TokenInput;
use portfolio_pair::{HttpServer, JwtIdentityProvider, JwtValidator, Role, Services, SqliteStore};
use serde_json::{json, Value};

struct Harness {
    server: HttpServer,
    validator: JwtValidator,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let validator = JwtValidator::new_dev();
        let identity = Arc::new(JwtIdentityProvider::new(validator.clone()));
        let server = HttpServer::new(
            Arc::new(Services::new(store)),
            identity,
            "127.0.0.1:0".parse().unwrap(),
        );
        Self { server, validator }
    }

    fn token(&self, id: &str, name: &str, role: Role) -> String {
        self.validator
            .generate_token(TokenInput { sub: id.into(), name: name.into(), role })
            .unwrap()
    }

    async fn send(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let req = builder.body(Full::new(Bytes::from(body))).unwrap();

        let resp = self.server.handle(req).await;
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let h = Harness::new();
    let (status, body) = h.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_401() {
    let h = Harness::new();
    let (status, body) = h.send(Method::GET, "/advisors", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthenticated");

    let (status, _) = h.send(Method::GET, "/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_anonymous_body_routes_are_401_before_parsing() {
    let h = Harness::new();
    let routes = [
        (Method::PUT, "/me"),
        (Method::POST, "/assignments"),
        (Method::POST, "/portfolios"),
        (Method::PATCH, "/portfolios/pf-1"),
    ];

    for (method, path) in routes {
        // Empty body: would be a JSON error if it were parsed first
        let (status, body) = h.send(method.clone(), path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, path);
        assert_eq!(body["kind"], "unauthenticated");

        let (status, _) = h.send(method.clone(), path, Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {} with bad token", method, path);
    }
}

#[tokio::test]
async fn test_full_matching_flow_over_http() {
    let h = Harness::new();
    let adv = h.token("adv-y", "Yolanda", Role::Advisor);
    let other = h.token("adv-z", "Zed", Role::Advisor);
    let cli = h.token("cli-x", "Xavier", Role::Client);

    for token in [&adv, &other, &cli] {
        let (status, _) = h.send(Method::POST, "/session", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = h.send(Method::GET, "/advisors", Some(&cli), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = h
        .send(Method::POST, "/assignments", Some(&cli), Some(json!({ "advisor_id": "adv-y" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["client_id"], "cli-x");

    let (status, body) = h
        .send(Method::POST, "/assignments", Some(&cli), Some(json!({ "advisor_id": "adv-z" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "you already have an advisor");

    let (status, body) = h
        .send(
            Method::POST,
            "/portfolios",
            Some(&adv),
            Some(json!({ "client_id": "cli-x", "name": "Income", "description": "Dividend tilt" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "draft");
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = h.send(Method::GET, "/portfolios", Some(&cli), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = h.send(Method::GET, &format!("/portfolios/{}", id), Some(&cli), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = h
        .send(Method::POST, &format!("/portfolios/{}/publish", id), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = h
        .send(Method::POST, &format!("/portfolios/{}/publish", id), Some(&adv), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "published");

    let (status, body) = h.send(Method::GET, "/clients/cli-x/portfolios", Some(&cli), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], id.as_str());

    let (status, body) = h.send(Method::GET, "/dashboard", Some(&adv), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "advisor");
    assert_eq!(body["clients"][0]["client"]["name"], "Xavier");
    assert_eq!(body["published_count"], 1);
}

#[tokio::test]
async fn test_unpublish_and_bad_bodies_are_400() {
    let h = Harness::new();
    let adv = h.token("adv-y", "Yolanda", Role::Advisor);
    let cli = h.token("cli-x", "Xavier", Role::Client);
    h.send(Method::POST, "/session", Some(&adv), None).await;
    h.send(Method::POST, "/session", Some(&cli), None).await;
    h.send(Method::POST, "/assignments", Some(&cli), Some(json!({ "advisor_id": "adv-y" })))
        .await;

    let (_, body) = h
        .send(Method::POST, "/portfolios", Some(&adv), Some(json!({ "client_id": "cli-x", "name": "A" })))
        .await;
    let path = format!("/portfolios/{}", body["id"].as_str().unwrap());
    h.send(Method::POST, &format!("{}/publish", path), Some(&adv), None).await;

    let (status, body) = h
        .send(Method::PATCH, &path, Some(&adv), Some(json!({ "status": "draft" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");

    let (status, _) = h.send(Method::PUT, "/me", Some(&cli), Some(json!({ "name": 42 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_target_does_not_leak_existence() {
    let h = Harness::new();
    let cli = h.token("cli-x", "Xavier", Role::Client);
    let peer = h.token("cli-w", "Wen", Role::Client);
    h.send(Method::POST, "/session", Some(&cli), None).await;
    h.send(Method::POST, "/session", Some(&peer), None).await;

    let (s1, b1) = h
        .send(Method::POST, "/assignments", Some(&cli), Some(json!({ "advisor_id": "cli-w" })))
        .await;
    let (s2, b2) = h
        .send(Method::POST, "/assignments", Some(&cli), Some(json!({ "advisor_id": "nobody" })))
        .await;
    assert_eq!(s1, StatusCode::FORBIDDEN);
    assert_eq!((s1, b1), (s2, b2));
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let h = Harness::new();
    let (status, _) = h.send(Method::GET, "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = h.send(Method::DELETE, "/assignments", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
