use axum::{
    Extension,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use pitchpoint_gateway::session::{self, Identity};
use pitchpoint_types::models::Role;

use crate::error::ApiError;
use crate::state::{AppState, db_call};

/// Resolve the bearer token to a live session and attach it to the request.
/// A token whose session row is gone is treated like a missing token.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = session::decode_token(&state.jwt_secret, token).ok_or(ApiError::Unauthorized)?;

    let identity = db_call(&state, move |db| session::resolve(db, &claims))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Refuse callers whose role is not `expected` before the handler runs.
/// Layer this inside `require_session`.
pub async fn require_role(
    State(expected): State<Role>,
    Extension(identity): Extension<Identity>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if identity.role != Some(expected) {
        warn!(
            "{} ({:?}) refused from {} route {}",
            identity.user_id,
            identity.role,
            expected,
            req.uri().path()
        );
        return Err(ApiError::Forbidden(format!(
            "This dashboard is only for {}",
            expected.plural()
        )));
    }
    Ok(next.run(req).await)
}
