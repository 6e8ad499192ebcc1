use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use pitchpoint_types::models::{
    Verification, VerificationAction, VerificationStatus, VerificationType,
};

use super::{OptionalExt, Transition};
use crate::Database;
use crate::models::{VerificationRow, now_timestamp};

const VERIFICATION_COLUMNS: &str = "id, user_id, subject_name, type, status, documents, \
    submitted_at, reviewed_at, reviewed_by";

impl Database {
    pub fn insert_verification(
        &self,
        user_id: &str,
        subject_name: &str,
        kind: VerificationType,
        documents: i64,
    ) -> Result<Verification> {
        self.with_conn_mut(|conn| {
            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO verifications (id, user_id, subject_name, type, documents, submitted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, user_id, subject_name, kind.as_str(), documents, now_timestamp()],
            )?;
            query_verification(conn, &id)?
                .ok_or_else(|| anyhow::anyhow!("Verification {} missing after insert", id))
        })
    }

    /// Newest submissions first.
    pub fn list_verifications(&self) -> Result<Vec<Verification>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM verifications ORDER BY submitted_at DESC",
                VERIFICATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_verification)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(Verification::try_from).collect()
        })
    }

    pub fn get_verification(&self, id: &str) -> Result<Option<Verification>> {
        self.with_conn(|conn| query_verification(conn, id))
    }

    pub fn has_open_verification(&self, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM verifications WHERE user_id = ?1 AND status = 'pending'",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(n > 0)
        })
    }

    pub fn has_approved_verification(&self, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM verifications WHERE user_id = ?1 AND status = 'approved'",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(n > 0)
        })
    }

    /// Applies an admin decision. The status check and the write happen in one
    /// transaction so two reviewers cannot both decide the same request.
    pub fn review_verification(
        &self,
        id: &str,
        action: VerificationAction,
        reviewer_id: &str,
    ) -> Result<Transition<Verification, VerificationStatus>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(old) = query_verification(&tx, id)? else {
                return Ok(Transition::NotFound);
            };
            let Some(next) = old.status.apply(action) else {
                return Ok(Transition::Rejected(old.status));
            };

            tx.execute(
                "UPDATE verifications SET status = ?2, reviewed_at = ?3, reviewed_by = ?4
                 WHERE id = ?1",
                rusqlite::params![id, next.as_str(), now_timestamp(), reviewer_id],
            )?;

            let new = query_verification(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Verification {} vanished during review", id))?;
            tx.commit()?;
            Ok(Transition::Applied { old, new })
        })
    }
}

fn map_verification(row: &rusqlite::Row<'_>) -> rusqlite::Result<VerificationRow> {
    Ok(VerificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        subject_name: row.get(2)?,
        kind: row.get(3)?,
        status: row.get(4)?,
        documents: row.get(5)?,
        submitted_at: row.get(6)?,
        reviewed_at: row.get(7)?,
        reviewed_by: row.get(8)?,
    })
}

fn query_verification(conn: &Connection, id: &str) -> Result<Option<Verification>> {
    let sql = format!("SELECT {} FROM verifications WHERE id = ?1", VERIFICATION_COLUMNS);
    let row = conn.query_row(&sql, [id], map_verification).optional()?;
    row.map(Verification::try_from).transpose()
}
