use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Role, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single row change on a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub event: ChangeKind,
    pub new: Option<serde_json::Value>,
    pub old: Option<serde_json::Value>,
}

impl ChangeEvent {
    pub fn insert<T: Serialize>(table: Table, row: &T) -> Self {
        Self {
            table,
            event: ChangeKind::Insert,
            new: serde_json::to_value(row).ok(),
            old: None,
        }
    }

    pub fn update<T: Serialize>(table: Table, old: &T, new: &T) -> Self {
        Self {
            table,
            event: ChangeKind::Update,
            new: serde_json::to_value(new).ok(),
            old: serde_json::to_value(old).ok(),
        }
    }

    pub fn delete<T: Serialize>(table: Table, old: &T) -> Self {
        Self {
            table,
            event: ChangeKind::Delete,
            new: None,
            old: serde_json::to_value(old).ok(),
        }
    }

    /// Users a row belongs to, for tables whose rows are private to their participants.
    /// `None` means the row is not participant-scoped.
    pub fn participants(&self) -> Option<Vec<Uuid>> {
        if self.table != Table::Messages {
            return None;
        }
        let mut ids = Vec::new();
        for row in [&self.new, &self.old].into_iter().flatten() {
            for key in ["sender_id", "recipient_id"] {
                if let Some(id) = row.get(key).and_then(|v| v.as_str()).and_then(|s| s.parse().ok()) {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        Some(ids)
    }
}

/// Events sent over the realtime gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, role: Option<Role> },

    /// Tables the connection is now following
    Subscribed { tables: Vec<Table> },

    /// A row changed on a followed table
    Change(ChangeEvent),

    /// Events were dropped for these tables; the client must re-fetch them
    Resync { tables: Vec<Table> },

    /// A command was refused
    Error { message: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Start following row changes on tables
    Subscribe { tables: Vec<Table> },

    /// Stop following tables
    Unsubscribe { tables: Vec<Table> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_event_wire_format() {
        let event = GatewayEvent::Change(ChangeEvent::insert(
            Table::Content,
            &json!({ "id": "1", "status": "draft" }),
        ));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "Change");
        assert_eq!(value["data"]["table"], "content");
        assert_eq!(value["data"]["event"], "INSERT");
        assert_eq!(value["data"]["old"], serde_json::Value::Null);
    }

    #[test]
    fn subscribe_command_parses() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"Subscribe","data":{"tables":["reports","messages"]}}"#)
                .unwrap();
        match cmd {
            GatewayCommand::Subscribe { tables } => {
                assert_eq!(tables, vec![Table::Reports, Table::Messages]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn message_participants_come_from_both_images() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let event = ChangeEvent::update(
            Table::Messages,
            &json!({ "sender_id": a.to_string(), "recipient_id": b.to_string() }),
            &json!({ "sender_id": a.to_string(), "recipient_id": b.to_string(), "starred": true }),
        );
        assert_eq!(event.participants(), Some(vec![a, b]));

        let other = ChangeEvent::delete(Table::Reports, &json!({ "id": "x" }));
        assert_eq!(other.participants(), None);
    }
}
