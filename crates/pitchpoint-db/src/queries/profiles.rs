use anyhow::Result;
use rusqlite::Connection;

use pitchpoint_types::models::{Profile, Startup, UserSummary};

use super::{OptionalExt, matches_search};
use crate::Database;
use crate::models::{ProfileRow, StartupRow, UserSummaryRow, encode_list, now_timestamp};

const PROFILE_COLUMNS: &str = "id, full_name, company_name, industry, founding_year, location, \
    funding_stage, funding_amount_needed, pitch_summary, website, bio, portfolio_count, \
    ticket_size_min, ticket_size_max, investment_focus, preferred_stages, created_at, updated_at";

/// Column values to overwrite. `None` leaves the stored value as is.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
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

impl Database {
    pub fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    /// Applies a partial update and returns the before and after images.
    pub fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<Option<(Profile, Profile)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(old) = query_profile(&tx, id)? else {
                return Ok(None);
            };

            tx.execute(
                "UPDATE profiles SET
                    full_name = COALESCE(?2, full_name),
                    company_name = COALESCE(?3, company_name),
                    industry = COALESCE(?4, industry),
                    founding_year = COALESCE(?5, founding_year),
                    location = COALESCE(?6, location),
                    funding_stage = COALESCE(?7, funding_stage),
                    funding_amount_needed = COALESCE(?8, funding_amount_needed),
                    pitch_summary = COALESCE(?9, pitch_summary),
                    website = COALESCE(?10, website),
                    bio = COALESCE(?11, bio),
                    portfolio_count = COALESCE(?12, portfolio_count),
                    ticket_size_min = COALESCE(?13, ticket_size_min),
                    ticket_size_max = COALESCE(?14, ticket_size_max),
                    investment_focus = COALESCE(?15, investment_focus),
                    preferred_stages = COALESCE(?16, preferred_stages),
                    updated_at = ?17
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    patch.full_name,
                    patch.company_name,
                    patch.industry,
                    patch.founding_year,
                    patch.location,
                    patch.funding_stage,
                    patch.funding_amount_needed,
                    patch.pitch_summary,
                    patch.website,
                    patch.bio,
                    patch.portfolio_count,
                    patch.ticket_size_min,
                    patch.ticket_size_max,
                    patch.investment_focus.as_deref().map(encode_list),
                    patch.preferred_stages.as_deref().map(encode_list),
                    now_timestamp(),
                ],
            )?;

            let new = query_profile(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Profile {} vanished during update", id))?;
            tx.commit()?;
            Ok(Some((old, new)))
        })
    }

    /// Profiles of users whose role assignment is entrepreneur.
    pub fn list_startups(&self, limit: u32) -> Result<Vec<Startup>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, full_name, company_name, industry, funding_stage,
                        funding_amount_needed, pitch_summary, location
                 FROM profiles
                 WHERE id IN (SELECT user_id FROM user_roles WHERE role = 'entrepreneur')
                 ORDER BY created_at DESC
                 LIMIT ?1",
            )?;

            let rows = stmt
                .query_map([limit], |row| {
                    Ok(StartupRow {
                        id: row.get(0)?,
                        full_name: row.get(1)?,
                        company_name: row.get(2)?,
                        industry: row.get(3)?,
                        funding_stage: row.get(4)?,
                        funding_amount_needed: row.get(5)?,
                        pitch_summary: row.get(6)?,
                        location: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(Startup::try_from).collect()
        })
    }

    /// All profiles with their role, optionally narrowed by a search term
    /// over name, company and role.
    pub fn list_users(&self, search: Option<&str>) -> Result<Vec<UserSummary>> {
        // JOIN user_roles to fetch the role in a single query (eliminates N+1)
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.full_name, p.company_name, p.location, p.created_at, r.role
                 FROM profiles p
                 LEFT JOIN user_roles r ON r.user_id = p.id
                 ORDER BY p.created_at DESC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(UserSummaryRow {
                        id: row.get(0)?,
                        full_name: row.get(1)?,
                        company_name: row.get(2)?,
                        location: row.get(3)?,
                        created_at: row.get(4)?,
                        role: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let users = rows
            .into_iter()
            .map(UserSummary::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(match search {
            Some(term) => users
                .into_iter()
                .filter(|u| {
                    matches_search(
                        term,
                        &[Some(u.full_name.as_str()), u.company_name.as_deref(), Some(u.role.as_str())],
                    )
                })
                .collect(),
            None => users,
        })
    }
}

fn query_profile(conn: &Connection, id: &str) -> Result<Option<Profile>> {
    let sql = format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS);
    let row = conn
        .query_row(&sql, [id], |row| {
            Ok(ProfileRow {
                id: row.get(0)?,
                full_name: row.get(1)?,
                company_name: row.get(2)?,
                industry: row.get(3)?,
                founding_year: row.get(4)?,
                location: row.get(5)?,
                funding_stage: row.get(6)?,
                funding_amount_needed: row.get(7)?,
                pitch_summary: row.get(8)?,
                website: row.get(9)?,
                bio: row.get(10)?,
                portfolio_count: row.get(11)?,
                ticket_size_min: row.get(12)?,
                ticket_size_max: row.get(13)?,
                investment_focus: row.get(14)?,
                preferred_stages: row.get(15)?,
                created_at: row.get(16)?,
                updated_at: row.get(17)?,
            })
        })
        .optional()?;

    row.map(Profile::try_from).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewProfile;
    use crate::queries::test_support::{account, named};
    use pitchpoint_types::models::Role;

    #[test]
    fn startups_are_entrepreneur_profiles_only() {
        let db = Database::open_in_memory().unwrap();
        let founder = account(
            &db,
            "f@example.com",
            Role::Entrepreneur,
            NewProfile {
                full_name: "Thandi".into(),
                company_name: Some("TechStart SA".into()),
                ..Default::default()
            },
        );
        account(&db, "i@example.com", Role::Investor, named("Ivan"));

        let startups = db.list_startups(10).unwrap();
        assert_eq!(startups.len(), 1);
        assert_eq!(startups[0].id, founder);
        assert_eq!(startups[0].company_name.as_deref(), Some("TechStart SA"));

        assert!(db.list_startups(0).unwrap().is_empty());
    }

    #[test]
    fn partial_update_keeps_other_columns() {
        let db = Database::open_in_memory().unwrap();
        let id = account(
            &db,
            "f@example.com",
            Role::Entrepreneur,
            NewProfile {
                full_name: "Thandi".into(),
                location: Some("Durban".into()),
                ..Default::default()
            },
        );

        let patch = ProfilePatch {
            industry: Some("AgriTech".into()),
            investment_focus: Some(vec!["SaaS".into()]),
            ..Default::default()
        };
        let (old, new) = db.update_profile(&id.to_string(), &patch).unwrap().unwrap();
        assert_eq!(old.industry, None);
        assert_eq!(new.industry.as_deref(), Some("AgriTech"));
        assert_eq!(new.location.as_deref(), Some("Durban"));
        assert_eq!(new.investment_focus, Some(vec!["SaaS".to_string()]));

        assert!(db.update_profile("missing", &patch).unwrap().is_none());
    }

    #[test]
    fn user_search_covers_name_company_and_role() {
        let db = Database::open_in_memory().unwrap();
        account(
            &db,
            "f@example.com",
            Role::Entrepreneur,
            NewProfile {
                full_name: "Thandi".into(),
                company_name: Some("GreenEnergy Co".into()),
                ..Default::default()
            },
        );
        account(&db, "i@example.com", Role::Investor, named("Ivan"));

        assert_eq!(db.list_users(None).unwrap().len(), 2);
        assert_eq!(db.list_users(Some("greenenergy")).unwrap().len(), 1);
        assert_eq!(db.list_users(Some("INVESTOR")).unwrap()[0].full_name, "Ivan");
        assert!(db.list_users(Some("nobody")).unwrap().is_empty());
    }
}
