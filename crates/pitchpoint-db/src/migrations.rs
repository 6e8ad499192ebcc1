use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (accounts and profiles)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at  TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_sessions_user ON sessions(user_id);

            CREATE TABLE profiles (
                id                      TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                full_name               TEXT NOT NULL,
                company_name            TEXT,
                industry                TEXT,
                founding_year           INTEGER,
                location                TEXT,
                funding_stage           TEXT,
                funding_amount_needed   REAL,
                pitch_summary           TEXT,
                website                 TEXT,
                bio                     TEXT,
                portfolio_count         INTEGER,
                ticket_size_min         REAL,
                ticket_size_max         REAL,
                investment_focus        TEXT,
                preferred_stages        TEXT,
                created_at              TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at              TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE user_roles (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                role        TEXT NOT NULL CHECK (role IN ('admin', 'entrepreneur', 'investor'))
            );

            CREATE INDEX idx_user_roles_role ON user_roles(role);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (admin tables)");
        conn.execute_batch(
            "
            CREATE TABLE verifications (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                subject_name    TEXT NOT NULL,
                type            TEXT NOT NULL CHECK (type IN ('company', 'investor')),
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'approved', 'rejected')),
                documents       INTEGER NOT NULL DEFAULT 0,
                submitted_at    TEXT NOT NULL,
                reviewed_at     TEXT,
                reviewed_by     TEXT
            );

            CREATE INDEX idx_verifications_status ON verifications(status, submitted_at);

            CREATE TABLE reports (
                id                  TEXT PRIMARY KEY,
                reporter_id         TEXT NOT NULL REFERENCES users(id),
                reporter_name       TEXT NOT NULL,
                reported_entity     TEXT NOT NULL,
                reported_user_id    TEXT,
                type                TEXT NOT NULL,
                severity            TEXT NOT NULL
                                    CHECK (severity IN ('low', 'medium', 'high', 'critical')),
                status              TEXT NOT NULL DEFAULT 'open'
                                    CHECK (status IN ('open', 'investigating', 'resolved', 'dismissed')),
                description         TEXT,
                resolution_notes    TEXT,
                resolved_at         TEXT,
                resolved_by         TEXT,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX idx_reports_created ON reports(created_at);

            CREATE TABLE content (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                type        TEXT NOT NULL CHECK (type IN ('article', 'image', 'video')),
                status      TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'published')),
                views       INTEGER NOT NULL DEFAULT 0,
                body        TEXT NOT NULL DEFAULT '',
                author_id   TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                sender_id       TEXT NOT NULL REFERENCES users(id),
                recipient_id    TEXT NOT NULL REFERENCES users(id),
                sender_name     TEXT NOT NULL,
                subject         TEXT NOT NULL,
                body            TEXT NOT NULL,
                read            INTEGER NOT NULL DEFAULT 0,
                starred         INTEGER NOT NULL DEFAULT 0,
                archived        INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_recipient ON messages(recipient_id, created_at);
            CREATE INDEX idx_messages_sender ON messages(sender_id, created_at);

            CREATE TABLE platform_settings (
                id          INTEGER PRIMARY KEY CHECK (id = 1),
                document    TEXT NOT NULL,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn role_outside_enumeration_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (id, email, password) VALUES ('u1', 'a@b.co', 'x')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO user_roles (user_id, role) VALUES ('u1', 'superuser')",
            [],
        );
        assert!(result.is_err());
    }
}
