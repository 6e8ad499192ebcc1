use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use pitchpoint_types::models::Message;

use super::{OptionalExt, matches_search};
use crate::Database;
use crate::models::{MessageRow, now_timestamp};

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, sender_name, subject, body, \
    read, starred, archived, created_at";

/// Single-row flag changes on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFlag {
    ToggleStar,
    Archive,
    MarkRead,
}

impl MessageFlag {
    fn sql(&self) -> &'static str {
        match self {
            MessageFlag::ToggleStar => "UPDATE messages SET starred = NOT starred WHERE id = ?1",
            MessageFlag::Archive => "UPDATE messages SET archived = 1 WHERE id = ?1",
            MessageFlag::MarkRead => "UPDATE messages SET read = 1 WHERE id = ?1",
        }
    }
}

impl Database {
    pub fn insert_message(
        &self,
        sender_id: &str,
        recipient_id: &str,
        sender_name: &str,
        subject: &str,
        body: &str,
    ) -> Result<Message> {
        self.with_conn_mut(|conn| {
            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO messages (id, sender_id, recipient_id, sender_name, subject, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![id, sender_id, recipient_id, sender_name, subject, body, now_timestamp()],
            )?;
            query_message(conn, &id)?
                .ok_or_else(|| anyhow::anyhow!("Message {} missing after insert", id))
        })
    }

    /// Messages a user sent or received, newest first. Archived messages are
    /// listed only when `archived` is set, and then exclusively.
    pub fn list_messages(
        &self,
        user_id: &str,
        archived: bool,
        search: Option<&str>,
    ) -> Result<Vec<Message>> {
        let messages = self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM messages
                 WHERE (recipient_id = ?1 OR sender_id = ?1) AND archived = ?2
                 ORDER BY created_at DESC",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, archived], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(Message::try_from).collect::<Result<Vec<_>>>()
        })?;

        Ok(match search {
            Some(term) => messages
                .into_iter()
                .filter(|m| matches_search(term, &[Some(m.sender_name.as_str()), Some(m.subject.as_str())]))
                .collect(),
            None => messages,
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<Message>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    pub fn count_unread(&self, recipient_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE recipient_id = ?1 AND read = 0 AND archived = 0",
                [recipient_id],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
    }

    pub fn flag_message(&self, id: &str, flag: MessageFlag) -> Result<Option<(Message, Message)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(old) = query_message(&tx, id)? else {
                return Ok(None);
            };
            tx.execute(flag.sql(), [id])?;
            let new = query_message(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Message {} vanished during update", id))?;
            tx.commit()?;
            Ok(Some((old, new)))
        })
    }

    /// Returns the deleted row.
    pub fn delete_message(&self, id: &str) -> Result<Option<Message>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let old = query_message(&tx, id)?;
            if old.is_some() {
                tx.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            }
            tx.commit()?;
            Ok(old)
        })
    }
}

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        recipient_id: row.get(2)?,
        sender_name: row.get(3)?,
        subject: row.get(4)?,
        body: row.get(5)?,
        read: row.get(6)?,
        starred: row.get(7)?,
        archived: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<Message>> {
    let sql = format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS);
    let row = conn.query_row(&sql, [id], map_message).optional()?;
    row.map(Message::try_from).transpose()
}
