use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use pitchpoint_types::models::{ContentItem, ContentStatus, ContentType};

use super::{OptionalExt, matches_search};
use crate::Database;
use crate::models::{ContentRow, now_timestamp};

const CONTENT_COLUMNS: &str =
    "id, title, type, status, views, body, author_id, created_at, updated_at";

impl Database {
    pub fn insert_content(
        &self,
        title: &str,
        kind: ContentType,
        status: ContentStatus,
        body: &str,
        author_id: Option<&str>,
    ) -> Result<ContentItem> {
        self.with_conn_mut(|conn| {
            let id = Uuid::new_v4().to_string();
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO content (id, title, type, status, body, author_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                rusqlite::params![id, title, kind.as_str(), status.as_str(), body, author_id, now],
            )?;
            query_content(conn, &id)?
                .ok_or_else(|| anyhow::anyhow!("Content {} missing after insert", id))
        })
    }

    /// Newest first, narrowed by a title search and/or status.
    pub fn list_content(
        &self,
        search: Option<&str>,
        status: Option<ContentStatus>,
    ) -> Result<Vec<ContentItem>> {
        let items = self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM content ORDER BY created_at DESC", CONTENT_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_content)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(ContentItem::try_from).collect::<Result<Vec<_>>>()
        })?;

        Ok(items
            .into_iter()
            .filter(|item| status.is_none_or(|s| item.status == s))
            .filter(|item| search.is_none_or(|term| matches_search(term, &[Some(item.title.as_str())])))
            .collect())
    }

    pub fn get_content(&self, id: &str) -> Result<Option<ContentItem>> {
        self.with_conn(|conn| query_content(conn, id))
    }

    pub fn update_content(
        &self,
        id: &str,
        title: Option<&str>,
        kind: Option<ContentType>,
        body: Option<&str>,
    ) -> Result<Option<(ContentItem, ContentItem)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(old) = query_content(&tx, id)? else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE content SET
                    title = COALESCE(?2, title),
                    type = COALESCE(?3, type),
                    body = COALESCE(?4, body),
                    updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![id, title, kind.map(|k| k.as_str()), body, now_timestamp()],
            )?;
            let new = query_content(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Content {} vanished during update", id))?;
            tx.commit()?;
            Ok(Some((old, new)))
        })
    }

    /// Flips published and draft.
    pub fn toggle_publish(&self, id: &str) -> Result<Option<(ContentItem, ContentItem)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(old) = query_content(&tx, id)? else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE content SET status = ?2, updated_at = ?3 WHERE id = ?1",
                rusqlite::params![id, old.status.toggled().as_str(), now_timestamp()],
            )?;
            let new = query_content(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Content {} vanished during update", id))?;
            tx.commit()?;
            Ok(Some((old, new)))
        })
    }

    /// Returns the deleted row.
    pub fn delete_content(&self, id: &str) -> Result<Option<ContentItem>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let old = query_content(&tx, id)?;
            if old.is_some() {
                tx.execute("DELETE FROM content WHERE id = ?1", [id])?;
            }
            tx.commit()?;
            Ok(old)
        })
    }
}

fn map_content(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContentRow> {
    Ok(ContentRow {
        id: row.get(0)?,
        title: row.get(1)?,
        kind: row.get(2)?,
        status: row.get(3)?,
        views: row.get(4)?,
        body: row.get(5)?,
        author_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn query_content(conn: &Connection, id: &str) -> Result<Option<ContentItem>> {
    let sql = format!("SELECT {} FROM content WHERE id = ?1", CONTENT_COLUMNS);
    let row = conn.query_row(&sql, [id], map_content).optional()?;
    row.map(ContentItem::try_from).transpose()
}
