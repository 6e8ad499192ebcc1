use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use pitchpoint_db::{NewReport, Transition};
use pitchpoint_gateway::session::Identity;
use pitchpoint_types::api::{
    FileReportRequest, ReportList, ReportQuery, ReportStats, ReportView, UpdateReportStatusRequest,
};
use pitchpoint_types::events::ChangeEvent;
use pitchpoint_types::models::Table;

use crate::error::ApiError;
use crate::forms;
use crate::state::{AppState, db_call};

pub async fn file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<FileReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    forms::required("reported_entity", &req.reported_entity, "Reported entity is required")?;
    forms::required("type", &req.kind, "Report type is required")?;

    let reporter_id = identity.user_id.to_string();
    let report = db_call(&state, move |db| {
        let reporter_name = db
            .get_profile(&reporter_id)?
            .map(|p| p.full_name)
            .unwrap_or_default();
        let reported_user_id = req.reported_user_id.map(|id| id.to_string());

        db.insert_report(&NewReport {
            reporter_id: &reporter_id,
            reporter_name: &reporter_name,
            reported_entity: req.reported_entity.trim(),
            reported_user_id: reported_user_id.as_deref(),
            kind: req.kind.trim(),
            severity: req.severity,
            description: req.description.as_deref(),
        })
    })
    .await?;

    info!("{} report filed against {}", report.severity, report.reported_entity);
    state
        .dispatcher
        .publish(ChangeEvent::insert(Table::Reports, &report));

    Ok((StatusCode::CREATED, Json(ReportView::from(report))))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let all = db_call(&state, |db| db.list_reports()).await?;
    let stats = ReportStats::tally(&all);

    let reports = all
        .into_iter()
        .filter(|r| query.status.matches(r.status))
        .map(ReportView::from)
        .collect();

    Ok(Json(ReportList { stats, reports }))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReportStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let next = req.status;
    let rid = id.to_string();
    let actor = identity.user_id.to_string();
    let outcome = db_call(&state, move |db| {
        db.transition_report(&rid, next, req.resolution_notes.as_deref(), &actor)
    })
    .await?;

    match outcome {
        Transition::Applied { old, new } => {
            info!("Report {} {} -> {} by {}", id, old.status, new.status, identity.email);
            state
                .dispatcher
                .publish(ChangeEvent::update(Table::Reports, &old, &new));
            Ok(Json(ReportView::from(new)))
        }
        Transition::Rejected(current) => Err(ApiError::Conflict(format!(
            "Cannot move a {} report to {}",
            current, next
        ))),
        Transition::NotFound => Err(ApiError::NotFound),
    }
}
