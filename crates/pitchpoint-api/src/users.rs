use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use pitchpoint_types::api::{SearchQuery, UserList};

use crate::error::ApiError;
use crate::state::{AppState, db_call};

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let users = db_call(&state, move |db| db.list_users(query.search.as_deref())).await?;
    Ok(Json(UserList { users }))
}
