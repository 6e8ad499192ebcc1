//! Database row types. These map directly to SQLite rows and are converted
//! into the `pitchpoint-types` models at the query boundary.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use pitchpoint_types::models::{
    ContentItem, Message, Profile, Report, Startup, UserSummary, Verification,
};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub expires_at: String,
}

pub struct ProfileRow {
    pub id: String,
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
    pub investment_focus: Option<String>,
    pub preferred_stages: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct StartupRow {
    pub id: String,
    pub full_name: String,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub funding_stage: Option<String>,
    pub funding_amount_needed: Option<f64>,
    pub pitch_summary: Option<String>,
    pub location: Option<String>,
}

pub struct UserSummaryRow {
    pub id: String,
    pub full_name: String,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub created_at: String,
    pub role: Option<String>,
}

pub struct VerificationRow {
    pub id: String,
    pub user_id: String,
    pub subject_name: String,
    pub kind: String,
    pub status: String,
    pub documents: i64,
    pub submitted_at: String,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
}

pub struct ReportRow {
    pub id: String,
    pub reporter_id: String,
    pub reporter_name: String,
    pub reported_entity: String,
    pub reported_user_id: Option<String>,
    pub kind: String,
    pub severity: String,
    pub status: String,
    pub description: Option<String>,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<String>,
    pub resolved_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ContentRow {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub status: String,
    pub views: i64,
    pub body: String,
    pub author_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub sender_name: String,
    pub subject: String,
    pub body: String,
    pub read: bool,
    pub starred: bool,
    pub archived: bool,
    pub created_at: String,
}

// -- Column helpers --

/// Accepts RFC 3339 and SQLite's `datetime('now')` form ("YYYY-MM-DD HH:MM:SS", UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return Ok(ts);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .with_context(|| format!("invalid timestamp '{}'", raw))
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("invalid id '{}'", raw))
}

fn parse_opt_id(raw: Option<&str>) -> Result<Option<Uuid>> {
    raw.map(parse_id).transpose()
}

fn parse_opt_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(parse_timestamp).transpose()
}

fn parse_list(raw: Option<&str>) -> Result<Option<Vec<String>>> {
    raw.map(|s| serde_json::from_str(s).with_context(|| format!("invalid list '{}'", s)))
        .transpose()
}

pub fn encode_list(list: &[String]) -> String {
    serde_json::to_string(list).unwrap_or_else(|_| "[]".to_string())
}

// -- Conversions --

impl TryFrom<ProfileRow> for Profile {
    type Error = anyhow::Error;

    fn try_from(row: ProfileRow) -> Result<Self> {
        Ok(Profile {
            id: parse_id(&row.id)?,
            full_name: row.full_name,
            company_name: row.company_name,
            industry: row.industry,
            founding_year: row.founding_year,
            location: row.location,
            funding_stage: row.funding_stage,
            funding_amount_needed: row.funding_amount_needed,
            pitch_summary: row.pitch_summary,
            website: row.website,
            bio: row.bio,
            portfolio_count: row.portfolio_count,
            ticket_size_min: row.ticket_size_min,
            ticket_size_max: row.ticket_size_max,
            investment_focus: parse_list(row.investment_focus.as_deref())?,
            preferred_stages: parse_list(row.preferred_stages.as_deref())?,
            created_at: Some(parse_timestamp(&row.created_at)?),
            updated_at: Some(parse_timestamp(&row.updated_at)?),
        })
    }
}

impl TryFrom<StartupRow> for Startup {
    type Error = anyhow::Error;

    fn try_from(row: StartupRow) -> Result<Self> {
        Ok(Startup {
            id: parse_id(&row.id)?,
            full_name: row.full_name,
            company_name: row.company_name,
            industry: row.industry,
            funding_stage: row.funding_stage,
            funding_amount_needed: row.funding_amount_needed,
            pitch_summary: row.pitch_summary,
            location: row.location,
        })
    }
}

impl TryFrom<UserSummaryRow> for UserSummary {
    type Error = anyhow::Error;

    fn try_from(row: UserSummaryRow) -> Result<Self> {
        Ok(UserSummary {
            id: parse_id(&row.id)?,
            full_name: row.full_name,
            company_name: row.company_name,
            location: row.location,
            created_at: Some(parse_timestamp(&row.created_at)?),
            role: row.role.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

impl TryFrom<VerificationRow> for Verification {
    type Error = anyhow::Error;

    fn try_from(row: VerificationRow) -> Result<Self> {
        Ok(Verification {
            id: parse_id(&row.id)?,
            user_id: parse_id(&row.user_id)?,
            subject_name: row.subject_name,
            kind: row.kind.parse()?,
            status: row.status.parse()?,
            documents: row.documents,
            submitted_at: parse_timestamp(&row.submitted_at)?,
            reviewed_at: parse_opt_timestamp(row.reviewed_at.as_deref())?,
            reviewed_by: parse_opt_id(row.reviewed_by.as_deref())?,
        })
    }
}

impl TryFrom<ReportRow> for Report {
    type Error = anyhow::Error;

    fn try_from(row: ReportRow) -> Result<Self> {
        Ok(Report {
            id: parse_id(&row.id)?,
            reporter_id: parse_id(&row.reporter_id)?,
            reporter_name: row.reporter_name,
            reported_entity: row.reported_entity,
            reported_user_id: parse_opt_id(row.reported_user_id.as_deref())?,
            kind: row.kind,
            severity: row.severity.parse()?,
            status: row.status.parse()?,
            description: row.description,
            resolution_notes: row.resolution_notes,
            resolved_at: parse_opt_timestamp(row.resolved_at.as_deref())?,
            resolved_by: parse_opt_id(row.resolved_by.as_deref())?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

impl TryFrom<ContentRow> for ContentItem {
    type Error = anyhow::Error;

    fn try_from(row: ContentRow) -> Result<Self> {
        Ok(ContentItem {
            id: parse_id(&row.id)?,
            title: row.title,
            kind: row.kind.parse()?,
            status: row.status.parse()?,
            views: row.views,
            body: row.body,
            author_id: parse_opt_id(row.author_id.as_deref())?,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Message {
            id: parse_id(&row.id)?,
            sender_id: parse_id(&row.sender_id)?,
            recipient_id: parse_id(&row.recipient_id)?,
            sender_name: row.sender_name,
            subject: row.subject,
            body: row.body,
            read: row.read,
            starred: row.starred,
            archived: row.archived,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
