//! Request-time verification probe, built for a reverse proxy's
//! auth-request directive: any method, no body, 200 or 401.

use crate::api::{handlers::extract_cookie, state::GatewayState};
use axum::{extract::Extension, http::HeaderMap, http::StatusCode};
use std::sync::Arc;

/// `{ANY} /auth`: verify the session cookie.
///
/// The cached outcome short-circuits the codec entirely. On a miss the
/// strategy runs a full validation and the outcome is memoized under the
/// raw cookie value, whichever path produced it. The response never
/// distinguishes a missing cookie from a bad signature, an expired token
/// or an allow-list miss.
pub async fn auth_gate(
    Extension(gateway): Extension<Arc<GatewayState>>,
    headers: HeaderMap,
) -> StatusCode {
    let Some(raw) = extract_cookie(&headers, gateway.cookie_key()) else {
        return StatusCode::UNAUTHORIZED;
    };

    let ok = match gateway.cache().get(&raw).await {
        Some(cached) => cached,
        None => {
            let outcome = gateway
                .strategy()
                .validate(&raw, gateway.cookie_max_age(), gateway.logins())
                .await;
            gateway.cache().put(raw, outcome).await;
            outcome
        }
    };

    if ok {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}
