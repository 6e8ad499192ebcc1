use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    ContentItem, ContentStatus, ContentType, Message, Profile, Report, ReportSeverity,
    ReportStatus, Role, Startup, UserSummary, Verification, VerificationAction,
    VerificationStatus,
};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the realtime gateway.
/// `sid` names the server-side session row; deleting it revokes the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub sid: Uuid,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntrepreneurSignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub company_name: String,
    pub industry: String,
    pub founding_year: i32,
    pub location: String,
    pub funding_stage: String,
    pub funding_amount: f64,
    pub pitch_summary: String,
    #[serde(default)]
    pub website: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvestorSignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub location: String,
    pub ticket_size_min: f64,
    pub ticket_size_max: f64,
    pub portfolio_count: i64,
    pub bio: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub investment_focus: Vec<String>,
    #[serde(default)]
    pub preferred_stages: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SigninResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: Option<Role>,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub role: Option<Role>,
    pub expires_at: DateTime<Utc>,
}

// -- Profiles & dashboards --

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
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

#[derive(Debug, Serialize, Deserialize)]
pub struct EntrepreneurDashboard {
    pub profile: Profile,
    pub profile_completion: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvestorDashboard {
    pub profile: Profile,
    pub startups: Vec<Startup>,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<UserSummary>,
}

// -- Verifications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitVerificationRequest {
    #[serde(default)]
    pub documents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationFilter {
    #[default]
    Pending,
    Approved,
    Rejected,
    All,
}

impl VerificationFilter {
    pub fn matches(&self, status: VerificationStatus) -> bool {
        match self {
            VerificationFilter::All => true,
            VerificationFilter::Pending => status == VerificationStatus::Pending,
            VerificationFilter::Approved => status == VerificationStatus::Approved,
            VerificationFilter::Rejected => status == VerificationStatus::Rejected,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VerificationQuery {
    #[serde(default)]
    pub status: VerificationFilter,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationView {
    #[serde(flatten)]
    pub verification: Verification,
    pub actions: Vec<VerificationAction>,
}

impl From<Verification> for VerificationView {
    fn from(verification: Verification) -> Self {
        let actions = verification.status.actions();
        Self {
            verification,
            actions,
        }
    }
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total: usize,
}

impl VerificationCounts {
    pub fn tally<'a>(verifications: impl IntoIterator<Item = &'a Verification>) -> Self {
        verifications
            .into_iter()
            .fold(Self::default(), |mut acc, verification| {
                match verification.status {
                    VerificationStatus::Pending => acc.pending += 1,
                    VerificationStatus::Approved => acc.approved += 1,
                    VerificationStatus::Rejected => acc.rejected += 1,
                }
                acc.total += 1;
                acc
            })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationList {
    pub counts: VerificationCounts,
    pub verifications: Vec<VerificationView>,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileReportRequest {
    pub reported_entity: String,
    pub reported_user_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: ReportSeverity,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFilter {
    #[default]
    Open,
    Investigating,
    Resolved,
    Dismissed,
    All,
}

impl ReportFilter {
    pub fn matches(&self, status: ReportStatus) -> bool {
        match self {
            ReportFilter::All => true,
            ReportFilter::Open => status == ReportStatus::Open,
            ReportFilter::Investigating => status == ReportStatus::Investigating,
            ReportFilter::Resolved => status == ReportStatus::Resolved,
            ReportFilter::Dismissed => status == ReportStatus::Dismissed,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub status: ReportFilter,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReportStatusRequest {
    pub status: ReportStatus,
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    pub transitions: Vec<ReportStatus>,
}

impl From<Report> for ReportView {
    fn from(report: Report) -> Self {
        let transitions = report.status.transitions();
        Self {
            report,
            transitions,
        }
    }
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    pub critical: usize,
    pub open: usize,
    pub investigating: usize,
    pub resolved: usize,
}

impl ReportStats {
    pub fn tally<'a>(reports: impl IntoIterator<Item = &'a Report>) -> Self {
        reports.into_iter().fold(Self::default(), |mut acc, report| {
            if report.severity == ReportSeverity::Critical {
                acc.critical += 1;
            }
            match report.status {
                ReportStatus::Open => acc.open += 1,
                ReportStatus::Investigating => acc.investigating += 1,
                ReportStatus::Resolved => acc.resolved += 1,
                ReportStatus::Dismissed => {}
            }
            acc
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportList {
    pub stats: ReportStats,
    pub reports: Vec<ReportView>,
}

// -- Content --

#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    pub search: Option<String>,
    pub status: Option<ContentStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateContentRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[serde(default)]
    pub body: String,
    pub status: Option<ContentStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateContentRequest {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ContentType>,
    pub body: Option<String>,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentCounts {
    pub articles: usize,
    pub images: usize,
    pub videos: usize,
    pub total_views: i64,
}

impl ContentCounts {
    pub fn tally<'a>(items: impl IntoIterator<Item = &'a ContentItem>) -> Self {
        items.into_iter().fold(Self::default(), |mut acc, item| {
            match item.kind {
                ContentType::Article => acc.articles += 1,
                ContentType::Image => acc.images += 1,
                ContentType::Video => acc.videos += 1,
            }
            acc.total_views += item.views;
            acc
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentList {
    pub counts: ContentCounts,
    pub items: Vec<ContentItem>,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplyRequest {
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageList {
    pub unread: usize,
    pub messages: Vec<Message>,
}

// -- Analytics --

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub admins: usize,
    pub entrepreneurs: usize,
    pub investors: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlatformAnalytics {
    pub total_users: usize,
    pub roles: RoleCounts,
    pub verifications: VerificationCounts,
    pub reports: ReportStats,
    pub content: ContentCounts,
    pub unread_messages: usize,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}
