use axum::{Extension, Json, extract::State, response::IntoResponse};
use tracing::debug;

use pitchpoint_db::ProfilePatch;
use pitchpoint_gateway::session::Identity;
use pitchpoint_types::api::{EntrepreneurDashboard, InvestorDashboard, UpdateProfileRequest};
use pitchpoint_types::events::ChangeEvent;
use pitchpoint_types::models::{Profile, Table};

use crate::analytics;
use crate::error::ApiError;
use crate::forms;
use crate::state::{AppState, db_call};

/// Startups shown on the investor dashboard.
const STARTUP_FEED_LIMIT: u32 = 10;

async fn own_profile(state: &AppState, identity: &Identity) -> Result<Profile, ApiError> {
    let id = identity.user_id.to_string();
    db_call(state, move |db| db.get_profile(&id))
        .await?
        .ok_or(ApiError::NotFound)
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(own_profile(&state, &identity).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current = own_profile(&state, &identity).await?;
    forms::profile_update(&req, current.ticket_size_min, current.ticket_size_max)?;

    let patch = ProfilePatch {
        full_name: req.full_name.map(|v| v.trim().to_string()),
        company_name: req.company_name,
        industry: req.industry,
        founding_year: req.founding_year,
        location: req.location,
        funding_stage: req.funding_stage,
        funding_amount_needed: req.funding_amount_needed,
        pitch_summary: req.pitch_summary,
        website: req.website,
        bio: req.bio,
        portfolio_count: req.portfolio_count,
        ticket_size_min: req.ticket_size_min,
        ticket_size_max: req.ticket_size_max,
        investment_focus: req.investment_focus,
        preferred_stages: req.preferred_stages,
    };

    let id = identity.user_id.to_string();
    let (old, new) = db_call(&state, move |db| db.update_profile(&id, &patch))
        .await?
        .ok_or(ApiError::NotFound)?;

    state
        .dispatcher
        .publish(ChangeEvent::update(Table::Profiles, &old, &new));
    Ok(Json(new))
}

pub async fn entrepreneur_dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = own_profile(&state, &identity).await?;
    let profile_completion = profile.completion();
    debug!("{} profile {}% complete", identity.user_id, profile_completion);

    Ok(Json(EntrepreneurDashboard {
        profile,
        profile_completion,
    }))
}

pub async fn investor_dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let id = identity.user_id.to_string();
    let (profile, startups) = db_call(&state, move |db| {
        let profile = db.get_profile(&id)?;
        let startups = db.list_startups(STARTUP_FEED_LIMIT)?;
        Ok((profile, startups))
    })
    .await?;

    Ok(Json(InvestorDashboard {
        profile: profile.ok_or(ApiError::NotFound)?,
        startups,
    }))
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(analytics::collect(&state, &identity).await?))
}
