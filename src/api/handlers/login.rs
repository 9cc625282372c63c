//! Login initiation: answer with a redirect into the provider's
//! authorization endpoint.

use crate::api::{error::GatewayError, handlers::temporary_redirect, state::GatewayState};
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct LoginParams {
    #[serde(default)]
    origin: Option<String>,
}

/// `GET /`: issue the authorization redirect.
///
/// The target `origin` comes from the query or the configured default; with
/// neither there is nowhere to send the user back to, which is a hard 403.
/// Nothing is persisted between this redirect and the callback; the
/// machine's only memory is the round-tripped `state` parameter.
pub async fn login(
    Extension(gateway): Extension<Arc<GatewayState>>,
    Query(params): Query<LoginParams>,
) -> Result<Response, GatewayError> {
    let origin = params
        .origin
        .filter(|origin| !origin.is_empty())
        .or_else(|| {
            let fallback = gateway.default_redirect_url();
            (!fallback.is_empty()).then(|| fallback.to_string())
        });

    let Some(origin) = origin else {
        debug!("Login attempt without an origin and no configured default");
        return Ok(StatusCode::FORBIDDEN.into_response());
    };

    let location = gateway.provider().authorize_redirect(&origin)?;
    temporary_redirect(&location)
}
