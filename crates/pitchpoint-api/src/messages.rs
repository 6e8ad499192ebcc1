use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use pitchpoint_db::{Database, MessageFlag};
use pitchpoint_gateway::session::Identity;
use pitchpoint_types::api::{MessageList, MessageQuery, ReplyRequest, SendMessageRequest};
use pitchpoint_types::events::ChangeEvent;
use pitchpoint_types::models::{Message, Table, reply_subject};

use crate::error::ApiError;
use crate::forms;
use crate::state::{AppState, db_call};

fn sender_name(db: &Database, user_id: &str) -> anyhow::Result<String> {
    Ok(db.get_profile(user_id)?.map(|p| p.full_name).unwrap_or_default())
}

/// The caller's inbox. Used by both the admin page and the user inbox.
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = identity.user_id.to_string();
    let (unread, messages) = db_call(&state, move |db| {
        let unread = db.count_unread(&user_id)?;
        let messages = db.list_messages(&user_id, query.archived, query.search.as_deref())?;
        Ok((unread, messages))
    })
    .await?;

    Ok(Json(MessageList { unread, messages }))
}

/// Admins may only write to users holding an approved verification.
pub async fn send(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    forms::required("subject", &req.subject, "Subject is required")?;
    forms::required("body", &req.body, "Message body is required")?;

    let sender_id = identity.user_id.to_string();
    let recipient_id = req.recipient_id.to_string();
    let sent = db_call(&state, move |db| {
        if !db.has_approved_verification(&recipient_id)? {
            return Ok(None);
        }
        let name = sender_name(db, &sender_id)?;
        db.insert_message(&sender_id, &recipient_id, &name, req.subject.trim(), &req.body)
            .map(Some)
    })
    .await?;

    let message = sent.ok_or_else(|| {
        ApiError::validation("recipient_id", "Messages can only be sent to verified users")
    })?;
    publish_new(&state, &message);
    Ok((StatusCode::CREATED, Json(message)))
}

/// Answer a received message. The reply goes back to the original sender.
pub async fn reply(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    forms::required("body", &req.body, "Message body is required")?;

    let me = identity.user_id;
    let sent = db_call(&state, move |db| {
        let Some(original) = db.get_message(&id.to_string())? else {
            return Ok(None);
        };
        if original.recipient_id != me {
            return Ok(None);
        }
        let name = sender_name(db, &me.to_string())?;
        db.insert_message(
            &me.to_string(),
            &original.sender_id.to_string(),
            &name,
            &reply_subject(&original.subject),
            &req.body,
        )
        .map(Some)
    })
    .await?;

    let message = sent.ok_or(ApiError::NotFound)?;
    info!("{} replied to message {}", identity.email, id);
    publish_new(&state, &message);
    Ok((StatusCode::CREATED, Json(message)))
}

fn publish_new(state: &AppState, message: &Message) {
    state
        .dispatcher
        .publish(ChangeEvent::insert(Table::Messages, message));
}

/// Read state belongs to the recipient. Other flags apply to messages the
/// caller sent or received. Anything else reads as not found.
fn may_flag(message: &Message, user_id: Uuid, flag: MessageFlag) -> bool {
    match flag {
        MessageFlag::MarkRead => message.recipient_id == user_id,
        MessageFlag::ToggleStar | MessageFlag::Archive => message.involves(user_id),
    }
}

async fn flag(
    state: AppState,
    identity: Identity,
    id: Uuid,
    flag: MessageFlag,
) -> Result<Json<Message>, ApiError> {
    let me = identity.user_id;
    let changed = db_call(&state, move |db| {
        match db.get_message(&id.to_string())? {
            Some(m) if may_flag(&m, me, flag) => db.flag_message(&id.to_string(), flag),
            _ => Ok(None),
        }
    })
    .await?;

    let (old, new) = changed.ok_or(ApiError::NotFound)?;
    state
        .dispatcher
        .publish(ChangeEvent::update(Table::Messages, &old, &new));
    Ok(Json(new))
}

pub async fn star(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    flag(state, identity, id, MessageFlag::ToggleStar).await
}

pub async fn archive(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    flag(state, identity, id, MessageFlag::Archive).await
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    flag(state, identity, id, MessageFlag::MarkRead).await
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let me = identity.user_id;
    let deleted = db_call(&state, move |db| {
        match db.get_message(&id.to_string())? {
            Some(m) if m.involves(me) => db.delete_message(&id.to_string()),
            _ => Ok(None),
        }
    })
    .await?;

    let old = deleted.ok_or(ApiError::NotFound)?;
    state
        .dispatcher
        .publish(ChangeEvent::delete(Table::Messages, &old));
    Ok(StatusCode::NO_CONTENT)
}
