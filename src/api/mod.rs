//! HTTP surface: router assembly and server startup.

use crate::config::Config;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    routing::{any, get},
    Extension, Router,
};
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod error;
pub mod handlers;
pub mod state;

pub use self::state::GatewayState;

/// Build the gateway router around shared state.
///
/// Three known routes; everything else is 403 with no body.
#[must_use]
pub fn app(gateway: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/", get(handlers::login))
        .route("/callback", get(handlers::callback))
        .route("/auth", any(handlers::auth_gate))
        .fallback(forbidden)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &Request<Body>| {
                        HeaderValue::from_str(Ulid::new().to_string().as_str()).ok()
                    },
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(CompressionLayer::new())
                .layer(Extension(gateway)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(config: Config, storage_path: &Path) -> Result<()> {
    let gateway = Arc::new(GatewayState::from_config(&config, storage_path)?);

    let listener = TcpListener::bind(config.listen_address())
        .await
        .with_context(|| format!("Unable to listen on {}", config.listen_address()))?;

    info!("Listening on {}", config.listen_address());

    axum::serve(listener, app(gateway).into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// Explicit deny-by-default for unrecognized routes, any method.
async fn forbidden() -> StatusCode {
    StatusCode::FORBIDDEN
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
