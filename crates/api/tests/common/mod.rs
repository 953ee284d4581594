#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use fieldmark_api::config::{LogFormat, ServerConfig};
use fieldmark_api::router::build_app_router;
use fieldmark_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        db_max_connections: 5,
        log_format: LogFormat::Pretty,
    }
}

/// Build the full application router, with every middleware layer, over the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Acting user sent with a request: `(id, role)`.
pub type As<'a> = Option<(&'a str, &'a str)>;

fn request(method: Method, uri: &str, actor: As<'_>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = actor {
        builder = builder.header("x-user-id", id).header("x-user-role", role);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read the response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn send(app: Router, req: Request<Body>) -> Response<Body> {
    app.oneshot(req).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, request(Method::GET, uri, None, None)).await
}

pub async fn get_as(app: Router, uri: &str, actor: As<'_>) -> Response<Body> {
    send(app, request(Method::GET, uri, actor, None)).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, request(Method::POST, uri, None, Some(body))).await
}

pub async fn post_json_as(
    app: Router,
    uri: &str,
    actor: As<'_>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, request(Method::POST, uri, actor, Some(body))).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, request(Method::PUT, uri, None, Some(body))).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, request(Method::DELETE, uri, None, None)).await
}

pub async fn delete_as(app: Router, uri: &str, actor: As<'_>) -> Response<Body> {
    send(app, request(Method::DELETE, uri, actor, None)).await
}
