//! Error taxonomy and the JSON envelopes of the HTTP surface.
//!
//! The callback path reports everything except an allow-list miss as a 500
//! carrying `{"error": "<message>"}`. The allow-list miss is a bare 403.
//! The gate path never goes through this type at all; it answers 401
//! without a reason, deliberately.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The round-tripped `state` parameter did not yield an origin.
    #[error("Malformed state parameter: {0:?}")]
    MalformedState(String),
    /// The provider answered with something other than JSON; carries the
    /// raw body verbatim.
    #[error("{0}")]
    UpstreamProtocol(String),
    /// The provider answered JSON with an error field; carries the
    /// provider's message verbatim.
    #[error("{0}")]
    UpstreamRejection(String),
    /// Identity confirmed but not on the allow-list.
    #[error("not authorized")]
    NotAuthorized,
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ApiFailure {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ApiSuccess<T: Serialize> {
    pub result: T,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            // No body: the caller learns nothing beyond the status.
            Self::NotAuthorized => StatusCode::FORBIDDEN.into_response(),
            err => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiFailure {
                    error: err.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
