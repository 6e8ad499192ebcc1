use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use pitchpoint_db::Transition;
use pitchpoint_gateway::session::Identity;
use pitchpoint_types::api::{
    SubmitVerificationRequest, VerificationCounts, VerificationList, VerificationQuery,
    VerificationView,
};
use pitchpoint_types::events::ChangeEvent;
use pitchpoint_types::models::{Table, VerificationAction};

use crate::error::ApiError;
use crate::state::{AppState, db_call};

/// A user asks to be verified. The request type follows from their role.
pub async fn submit(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SubmitVerificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = identity
        .role
        .and_then(|role| role.verification_type())
        .ok_or_else(|| ApiError::Forbidden("Only entrepreneurs and investors are verified".into()))?;
    if req.documents < 0 {
        return Err(ApiError::validation(
            "documents",
            "Document count cannot be negative",
        ));
    }

    let user_id = identity.user_id.to_string();
    let created = db_call(&state, move |db| {
        if db.has_open_verification(&user_id)? {
            return Ok(None);
        }
        let profile = db.get_profile(&user_id)?;
        let subject = profile
            .map(|p| p.company_name.filter(|c| !c.is_empty()).unwrap_or(p.full_name))
            .unwrap_or_default();
        db.insert_verification(&user_id, &subject, kind, req.documents)
            .map(Some)
    })
    .await?;

    let verification = created.ok_or_else(|| {
        ApiError::Conflict("A verification request is already pending".into())
    })?;
    state
        .dispatcher
        .publish(ChangeEvent::insert(Table::Verifications, &verification));

    Ok((StatusCode::CREATED, Json(VerificationView::from(verification))))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<VerificationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let all = db_call(&state, |db| db.list_verifications()).await?;
    let counts = VerificationCounts::tally(&all);

    let verifications = all
        .into_iter()
        .filter(|v| query.status.matches(v.status))
        .map(VerificationView::from)
        .collect();

    Ok(Json(VerificationList {
        counts,
        verifications,
    }))
}

async fn review(
    state: AppState,
    identity: Identity,
    id: Uuid,
    action: VerificationAction,
) -> Result<Json<VerificationView>, ApiError> {
    let vid = id.to_string();
    let reviewer = identity.user_id.to_string();
    let outcome = db_call(&state, move |db| db.review_verification(&vid, action, &reviewer)).await?;

    match outcome {
        Transition::Applied { old, new } => {
            info!("Verification {} {} by {}", id, new.status, identity.email);
            state
                .dispatcher
                .publish(ChangeEvent::update(Table::Verifications, &old, &new));
            Ok(Json(VerificationView::from(new)))
        }
        Transition::Rejected(status) => Err(ApiError::Conflict(format!(
            "Verification is already {}",
            status
        ))),
        Transition::NotFound => Err(ApiError::NotFound),
    }
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    review(state, identity, id, VerificationAction::Approve).await
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    review(state, identity, id, VerificationAction::Reject).await
}
