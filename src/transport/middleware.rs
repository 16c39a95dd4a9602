use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{common::errors::ApiError, server::AppState};

/// Rejects REST requests whose `Authorization` header is not the password.
pub async fn check_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = req
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok());

    let reason = match authorization {
        Some(password) if password == state.config.server.password => {
            return Ok(next.run(req).await);
        },
        Some(_) => "Authorization failed.",
        None => "Missing \"Authorization\" header.",
    };

    warn!("Rejected {} {}: {}", req.method(), req.uri().path(), reason);
    Err(ApiError::unauthorized(reason))
}
