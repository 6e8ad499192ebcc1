use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::info;

use pitchpoint_gateway::session::Identity;
use pitchpoint_types::models::PlatformSettings;

use crate::error::ApiError;
use crate::forms;
use crate::state::{AppState, db_call};

pub async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(db_call(&state, |db| db.get_settings()).await?))
}

/// Replaces the whole document. Omitted fields fall back to their defaults.
pub async fn put_settings(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(settings): Json<PlatformSettings>,
) -> Result<impl IntoResponse, ApiError> {
    forms::settings(&settings)?;

    let stored = settings.clone();
    db_call(&state, move |db| db.put_settings(&stored)).await?;

    info!("Platform settings updated by {}", identity.email);
    Ok(Json(settings))
}
