use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;
use uuid::Uuid;

use pitchpoint_types::models::Role;

use super::OptionalExt;
use crate::Database;
use crate::models::{SessionRow, UserRow, encode_list, now_timestamp};

/// Profile columns written at signup.
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub full_name: String,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub founding_year: Option<i32>,
    pub location: Option<String>,
    pub funding_stage: Option<String>,
    pub funding_amount_needed: Option<f64>,
    pub pitch_summary: Option<String>,
    pub website: Option<String>,
    pub bio: Option<String>,
    pub portfolio_count: Option<i64>,
    pub ticket_size_min: Option<f64>,
    pub ticket_size_max: Option<f64>,
    pub investment_focus: Option<Vec<String>>,
    pub preferred_stages: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub profile: NewProfile,
}

impl Database {
    // -- Users --

    /// Creates the identity, its profile and its role assignment in one transaction.
    /// Either all three rows exist afterwards or none do.
    pub fn create_account(&self, account: &NewAccount) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let id = account.user_id.to_string();
            let now = now_timestamp();
            let p = &account.profile;

            tx.execute(
                "INSERT INTO users (id, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (&id, &account.email, &account.password_hash, &now),
            )?;

            tx.execute(
                "INSERT INTO profiles (
                    id, full_name, company_name, industry, founding_year, location,
                    funding_stage, funding_amount_needed, pitch_summary, website, bio,
                    portfolio_count, ticket_size_min, ticket_size_max, investment_focus,
                    preferred_stages, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)",
                rusqlite::params![
                    id,
                    p.full_name,
                    p.company_name,
                    p.industry,
                    p.founding_year,
                    p.location,
                    p.funding_stage,
                    p.funding_amount_needed,
                    p.pitch_summary,
                    p.website,
                    p.bio,
                    p.portfolio_count,
                    p.ticket_size_min,
                    p.ticket_size_max,
                    p.investment_focus.as_deref().map(encode_list),
                    p.preferred_stages.as_deref().map(encode_list),
                    now,
                ],
            )?;

            tx.execute(
                "INSERT INTO user_roles (user_id, role) VALUES (?1, ?2)",
                (&id, account.role.as_str()),
            )?;

            tx.commit()?;
            debug!("Account {} created with role {}", id, account.role);
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Roles --

    pub fn get_role(&self, user_id: &str) -> Result<Option<Role>> {
        self.with_conn(|conn| {
            let role: Option<String> = conn
                .query_row(
                    "SELECT role FROM user_roles WHERE user_id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(role.map(|r| r.parse::<Role>()).transpose()?)
        })
    }

    pub fn count_users(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }

    /// Number of assignments per role.
    pub fn role_counts(&self) -> Result<Vec<(Role, usize)>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT role, COUNT(*) FROM user_roles GROUP BY role ORDER BY role")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(role, count)| Ok::<_, anyhow::Error>((role.parse::<Role>()?, count as usize)))
                .collect()
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str, user_id: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
                (id, user_id, expires_at.to_rfc3339()),
            )?;
            Ok(())
        })
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, expires_at FROM sessions WHERE id = ?1",
                    [id],
                    |row| {
                        Ok(SessionRow {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            expires_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Returns true if a session row was removed.
    pub fn delete_session(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                [now.to_rfc3339()],
            )?;
            Ok(n)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, email, password, created_at FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{account, named};

    #[test]
    fn account_creation_is_atomic() {
        let db = Database::open_in_memory().unwrap();
        let first = account(&db, "dup@example.com", Role::Investor, named("First"));

        // Same email again: the users insert fails, nothing else may be left behind.
        let second = Uuid::new_v4();
        let result = db.create_account(&NewAccount {
            user_id: second,
            email: "DUP@example.com".into(),
            password_hash: "hash".into(),
            role: Role::Entrepreneur,
            profile: named("Second"),
        });
        assert!(result.is_err());
        assert!(db.get_user_by_id(&second.to_string()).unwrap().is_none());
        assert!(db.get_profile(&second.to_string()).unwrap().is_none());
        assert!(db.get_role(&second.to_string()).unwrap().is_none());

        assert_eq!(db.get_role(&first.to_string()).unwrap(), Some(Role::Investor));
    }

    #[test]
    fn email_lookup_ignores_case() {
        let db = Database::open_in_memory().unwrap();
        let id = account(&db, "Founder@Example.com", Role::Entrepreneur, named("Founder"));
        let user = db.get_user_by_email("founder@example.com").unwrap().unwrap();
        assert_eq!(user.id, id.to_string());
    }

    #[test]
    fn sessions_expire_and_revoke() {
        let db = Database::open_in_memory().unwrap();
        let user = account(&db, "s@example.com", Role::Investor, named("S"));
        let now = Utc::now();

        db.create_session("live", &user.to_string(), now + chrono::Duration::days(1))
            .unwrap();
        db.create_session("stale", &user.to_string(), now - chrono::Duration::days(1))
            .unwrap();

        assert_eq!(db.delete_expired_sessions(now).unwrap(), 1);
        assert!(db.get_session("stale").unwrap().is_none());

        assert!(db.delete_session("live").unwrap());
        assert!(!db.delete_session("live").unwrap());
    }

    #[test]
    fn counts_roles() {
        let db = Database::open_in_memory().unwrap();
        account(&db, "a@example.com", Role::Investor, named("A"));
        account(&db, "b@example.com", Role::Investor, named("B"));
        account(&db, "c@example.com", Role::Admin, named("C"));

        let counts = db.role_counts().unwrap();
        assert_eq!(counts, vec![(Role::Admin, 1), (Role::Investor, 2)]);
    }
}
