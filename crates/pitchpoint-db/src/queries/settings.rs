use anyhow::{Context, Result};

use pitchpoint_types::models::PlatformSettings;

use super::OptionalExt;
use crate::Database;
use crate::models::now_timestamp;

impl Database {
    /// Stored settings, or the defaults when none were ever saved.
    pub fn get_settings(&self) -> Result<PlatformSettings> {
        self.with_conn(|conn| {
            let doc: Option<String> = conn
                .query_row(
                    "SELECT document FROM platform_settings WHERE id = 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;

            match doc {
                Some(doc) => serde_json::from_str(&doc).context("corrupt platform settings"),
                None => Ok(PlatformSettings::default()),
            }
        })
    }

    pub fn put_settings(&self, settings: &PlatformSettings) -> Result<()> {
        let doc = serde_json::to_string(settings)?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO platform_settings (id, document, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at",
                (&doc, now_timestamp()),
            )?;
            Ok(())
        })
    }
}
