use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use pitchpoint_gateway::session::Identity;
use pitchpoint_types::api::{
    ContentCounts, ContentList, ContentQuery, CreateContentRequest, UpdateContentRequest,
};
use pitchpoint_types::events::ChangeEvent;
use pitchpoint_types::models::{ContentStatus, Table};

use crate::error::ApiError;
use crate::forms;
use crate::state::{AppState, db_call};

/// Counts cover the whole library; the item list honours the filters.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ContentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (all, items) = db_call(&state, move |db| {
        let all = db.list_content(None, None)?;
        let items = db.list_content(query.search.as_deref(), query.status)?;
        Ok((all, items))
    })
    .await?;

    Ok(Json(ContentList {
        counts: ContentCounts::tally(&all),
        items,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    forms::required("title", &req.title, "Title is required")?;

    let author = identity.user_id.to_string();
    let status = req.status.unwrap_or(ContentStatus::Draft);
    let item = db_call(&state, move |db| {
        db.insert_content(req.title.trim(), req.kind, status, &req.body, Some(author.as_str()))
    })
    .await?;

    info!("Content {} created as {}", item.id, item.status);
    state
        .dispatcher
        .publish(ChangeEvent::insert(Table::Content, &item));
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = db_call(&state, move |db| db.get_content(&id.to_string()))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(item))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(title) = &req.title {
        forms::required("title", title, "Title is required")?;
    }

    let (old, new) = db_call(&state, move |db| {
        db.update_content(
            &id.to_string(),
            req.title.as_deref().map(str::trim),
            req.kind,
            req.body.as_deref(),
        )
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    state
        .dispatcher
        .publish(ChangeEvent::update(Table::Content, &old, &new));
    Ok(Json(new))
}

pub async fn toggle_publish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (old, new) = db_call(&state, move |db| db.toggle_publish(&id.to_string()))
        .await?
        .ok_or(ApiError::NotFound)?;

    info!("Content {} {} -> {}", id, old.status, new.status);
    state
        .dispatcher
        .publish(ChangeEvent::update(Table::Content, &old, &new));
    Ok(Json(new))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let old = db_call(&state, move |db| db.delete_content(&id.to_string()))
        .await?
        .ok_or(ApiError::NotFound)?;

    state
        .dispatcher
        .publish(ChangeEvent::delete(Table::Content, &old));
    Ok(StatusCode::NO_CONTENT)
}
