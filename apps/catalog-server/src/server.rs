//! HTTP host: health endpoints, the catalog routes and the middleware stack.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Request, Response, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use data_catalog::Catalog;
use serde_json::{Value, json};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use crate::config::{AppConfig, ServerConfig};
use crate::signals;

const REQUEST_ID: &str = "x-request-id";

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

fn apply_trace_layer(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<Body>| {
                let rid = req
                    .headers()
                    .get(REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    request_id = %rid,
                    status = Empty,
                    latency_ms = Empty,
                )
            })
            .on_response(|res: &Response<Body>, latency: Duration, span: &tracing::Span| {
                span.record("status", res.status().as_u16());
                span.record("latency_ms", latency.as_millis());
                tracing::debug!("Request finished");
            }),
    )
}

/// Catalog routes wrapped in the middleware stack.
///
/// Runtime order, outermost first: `SetRequestId`, `PropagateRequestId`,
/// Trace, Timeout, `BodyLimit`, Router.
pub fn build_router(catalog: &Catalog, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(|| async { "ok" }))
        .merge(catalog.router());

    router = router
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(DefaultBodyLimit::max(config.body_limit_bytes));

    router = router.layer(TimeoutLayer::with_status_code(
        StatusCode::GATEWAY_TIMEOUT,
        Duration::from_secs(config.request_timeout_secs),
    ));

    router = apply_trace_layer(router);

    let x_request_id = HeaderName::from_static(REQUEST_ID);
    router
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
}

/// Opens storage, binds the listener and serves until a shutdown signal.
///
/// # Errors
/// Fails when the bind address is invalid, storage cannot be initialized,
/// or the listener cannot be bound.
pub async fn run(config: AppConfig) -> Result<()> {
    let addr = config.server.socket_addr()?;

    let catalog = Catalog::from_config(&config.catalog)
        .await
        .context("failed to initialize data catalog")?;
    let router = build_router(&catalog, &config.server);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server bound");

    let shutdown = async {
        if let Err(e) = signals::wait_for_shutdown().await {
            tracing::error!(error = %e, "Signal handling failed; shutting down");
        }
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::http::header;
    use data_catalog::infra::storage::InMemoryEngine;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn router(config: &ServerConfig) -> Router {
        let catalog = Catalog::bootstrap(Arc::new(InMemoryEngine::new()))
            .await
            .unwrap();
        build_router(&catalog, config)
    }

    #[tokio::test]
    async fn health_endpoints_answer() {
        let app = router(&ServerConfig::default()).await;

        let res = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({"status": "ok"}));

        let res = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn request_id_is_generated_or_propagated() {
        let app = router(&ServerConfig::default()).await;

        let res = app
            .clone()
            .oneshot(Request::get("/surveyarea").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(REQUEST_ID));

        let res = app
            .oneshot(
                Request::get("/healthz")
                    .header(REQUEST_ID, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers()[REQUEST_ID], "req-42");
    }

    #[tokio::test]
    async fn oversized_bodies_are_rejected() {
        let config = ServerConfig {
            body_limit_bytes: 16,
            ..ServerConfig::default()
        };
        let app = router(&config).await;
        let payload = json!({"name": "a name well past sixteen bytes"}).to_string();

        let res = app
            .oneshot(
                Request::post("/dataset")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, payload.len())
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
