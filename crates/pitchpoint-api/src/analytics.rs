use axum::{Extension, Json, extract::State, response::IntoResponse};

use pitchpoint_gateway::session::Identity;
use pitchpoint_types::api::{
    ContentCounts, PlatformAnalytics, ReportStats, RoleCounts, VerificationCounts,
};
use pitchpoint_types::models::Role;

use crate::error::ApiError;
use crate::state::{AppState, db_call};

/// Platform-wide figures. Unread messages are the calling admin's.
pub async fn collect(state: &AppState, identity: &Identity) -> Result<PlatformAnalytics, ApiError> {
    let admin_id = identity.user_id.to_string();
    db_call(state, move |db| {
        let mut roles = RoleCounts::default();
        for (role, count) in db.role_counts()? {
            match role {
                Role::Admin => roles.admins = count,
                Role::Entrepreneur => roles.entrepreneurs = count,
                Role::Investor => roles.investors = count,
            }
        }

        Ok(PlatformAnalytics {
            total_users: db.count_users()?,
            roles,
            verifications: VerificationCounts::tally(&db.list_verifications()?),
            reports: ReportStats::tally(&db.list_reports()?),
            content: ContentCounts::tally(&db.list_content(None, None)?),
            unread_messages: db.count_unread(&admin_id)?,
        })
    })
    .await
}

pub async fn get_analytics(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(collect(&state, &identity).await?))
}
