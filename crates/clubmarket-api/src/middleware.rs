//! API middleware
//!
//! The gateway in front of this service authenticates requests and forwards
//! the verified identity in `X-User-Id` / `X-User-Role` headers.
//! `identity_middleware` lifts those into an `Identity` extension for the
//! extractors; absent or malformed headers simply leave the request
//! anonymous.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use uuid::Uuid;

use crate::extractors::{Identity, UserRole};

/// Populate request extensions with the gateway-asserted identity
pub async fn identity_middleware(mut req: Request, next: Next) -> Response {
    let user_id = req
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok());

    if let Some(user_id) = user_id {
        let role = req
            .headers()
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .and_then(UserRole::parse)
            .unwrap_or(UserRole::User);

        req.extensions_mut().insert(Identity { user_id, role });
    }

    next.run(req).await
}

/// Request timing middleware
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let response = next.run(req).await;

    let elapsed = start.elapsed();
    if elapsed.as_millis() > 1000 {
        tracing::warn!(
            method = %method,
            uri = %uri,
            elapsed_ms = elapsed.as_millis(),
            "Slow request detected"
        );
    } else {
        tracing::debug!(
            method = %method,
            uri = %uri,
            elapsed_ms = elapsed.as_millis(),
            status = response.status().as_u16(),
            "Request completed"
        );
    }

    response
}
