use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use pitchpoint_types::models::{Report, ReportSeverity, ReportStatus};

use super::{OptionalExt, Transition};
use crate::Database;
use crate::models::{ReportRow, now_timestamp};

const REPORT_COLUMNS: &str = "id, reporter_id, reporter_name, reported_entity, reported_user_id, \
    type, severity, status, description, resolution_notes, resolved_at, resolved_by, \
    created_at, updated_at";

pub struct NewReport<'a> {
    pub reporter_id: &'a str,
    pub reporter_name: &'a str,
    pub reported_entity: &'a str,
    pub reported_user_id: Option<&'a str>,
    pub kind: &'a str,
    pub severity: ReportSeverity,
    pub description: Option<&'a str>,
}

impl Database {
    pub fn insert_report(&self, report: &NewReport<'_>) -> Result<Report> {
        self.with_conn_mut(|conn| {
            let id = Uuid::new_v4().to_string();
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO reports (
                    id, reporter_id, reporter_name, reported_entity, reported_user_id,
                    type, severity, description, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    id,
                    report.reporter_id,
                    report.reporter_name,
                    report.reported_entity,
                    report.reported_user_id,
                    report.kind,
                    report.severity.as_str(),
                    report.description,
                    now,
                ],
            )?;
            query_report(conn, &id)?
                .ok_or_else(|| anyhow::anyhow!("Report {} missing after insert", id))
        })
    }

    /// Newest reports first.
    pub fn list_reports(&self) -> Result<Vec<Report>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM reports ORDER BY created_at DESC", REPORT_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_report)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(Report::try_from).collect()
        })
    }

    pub fn get_report(&self, id: &str) -> Result<Option<Report>> {
        self.with_conn(|conn| query_report(conn, id))
    }

    /// Moves a report along its lifecycle. Resolving stamps the resolver and time.
    /// Notes, when given, replace the stored resolution notes.
    pub fn transition_report(
        &self,
        id: &str,
        next: ReportStatus,
        notes: Option<&str>,
        actor_id: &str,
    ) -> Result<Transition<Report, ReportStatus>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(old) = query_report(&tx, id)? else {
                return Ok(Transition::NotFound);
            };
            if !old.status.can_transition_to(next) {
                return Ok(Transition::Rejected(old.status));
            }

            let now = now_timestamp();
            let resolved = next == ReportStatus::Resolved;
            tx.execute(
                "UPDATE reports SET
                    status = ?2,
                    resolution_notes = COALESCE(?3, resolution_notes),
                    resolved_at = CASE WHEN ?4 THEN ?5 ELSE resolved_at END,
                    resolved_by = CASE WHEN ?4 THEN ?6 ELSE resolved_by END,
                    updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![id, next.as_str(), notes, resolved, now, actor_id],
            )?;

            let new = query_report(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Report {} vanished during update", id))?;
            tx.commit()?;
            Ok(Transition::Applied { old, new })
        })
    }
}

fn map_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        reporter_id: row.get(1)?,
        reporter_name: row.get(2)?,
        reported_entity: row.get(3)?,
        reported_user_id: row.get(4)?,
        kind: row.get(5)?,
        severity: row.get(6)?,
        status: row.get(7)?,
        description: row.get(8)?,
        resolution_notes: row.get(9)?,
        resolved_at: row.get(10)?,
        resolved_by: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn query_report(conn: &Connection, id: &str) -> Result<Option<Report>> {
    let sql = format!("SELECT {} FROM reports WHERE id = ?1", REPORT_COLUMNS);
    let row = conn.query_row(&sql, [id], map_report).optional()?;
    row.map(Report::try_from).transpose()
}
