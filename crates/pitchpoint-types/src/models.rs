use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted string is not a member of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Closed string enumerations share the same text form in JSON and in SQLite.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

string_enum!(
    /// The single role bound to a user account.
    Role, "role" {
        Admin => "admin",
        Entrepreneur => "entrepreneur",
        Investor => "investor",
    }
);

string_enum!(VerificationType, "verification type" {
    Company => "company",
    Investor => "investor",
});

string_enum!(VerificationStatus, "verification status" {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

string_enum!(VerificationAction, "verification action" {
    Approve => "approve",
    Reject => "reject",
});

string_enum!(ReportSeverity, "report severity" {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

string_enum!(ReportStatus, "report status" {
    Open => "open",
    Investigating => "investigating",
    Resolved => "resolved",
    Dismissed => "dismissed",
});

string_enum!(ContentType, "content type" {
    Article => "article",
    Image => "image",
    Video => "video",
});

string_enum!(ContentStatus, "content status" {
    Draft => "draft",
    Published => "published",
});

string_enum!(
    /// Tables that publish row changes on the realtime gateway.
    Table, "table" {
        Profiles => "profiles",
        UserRoles => "user_roles",
        Verifications => "verifications",
        Reports => "reports",
        Content => "content",
        Messages => "messages",
    }
);

impl Role {
    /// Label used in the access-denied message ("only for investors").
    pub fn plural(&self) -> &'static str {
        match self {
            Role::Admin => "admins",
            Role::Entrepreneur => "entrepreneurs",
            Role::Investor => "investors",
        }
    }

    /// Verification type a user of this role may request. Admins are not verified.
    pub fn verification_type(&self) -> Option<VerificationType> {
        match self {
            Role::Admin => None,
            Role::Entrepreneur => Some(VerificationType::Company),
            Role::Investor => Some(VerificationType::Investor),
        }
    }

    /// Tables a non-admin may follow on the change feed.
    pub fn can_subscribe(&self, table: Table) -> bool {
        match self {
            Role::Admin => true,
            Role::Entrepreneur | Role::Investor => {
                matches!(table, Table::Profiles | Table::Messages)
            }
        }
    }
}

/// Row image of a `user_roles` entry as published on the change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user_id: Uuid,
    pub role: Role,
}

impl VerificationStatus {
    /// Review actions still available. Only a pending request can be decided.
    pub fn actions(&self) -> Vec<VerificationAction> {
        match self {
            VerificationStatus::Pending => vec![VerificationAction::Approve, VerificationAction::Reject],
            VerificationStatus::Approved | VerificationStatus::Rejected => vec![],
        }
    }

    pub fn apply(&self, action: VerificationAction) -> Option<VerificationStatus> {
        if !self.actions().contains(&action) {
            return None;
        }
        Some(match action {
            VerificationAction::Approve => VerificationStatus::Approved,
            VerificationAction::Reject => VerificationStatus::Rejected,
        })
    }
}

impl ReportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Resolved | ReportStatus::Dismissed)
    }

    /// Statuses reachable in one step. There is no path back to `open`.
    pub fn transitions(&self) -> Vec<ReportStatus> {
        match self {
            ReportStatus::Open => vec![
                ReportStatus::Investigating,
                ReportStatus::Resolved,
                ReportStatus::Dismissed,
            ],
            ReportStatus::Investigating => vec![ReportStatus::Resolved, ReportStatus::Dismissed],
            ReportStatus::Resolved | ReportStatus::Dismissed => vec![],
        }
    }

    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        self.transitions().contains(&next)
    }
}

impl ContentStatus {
    pub fn toggled(&self) -> ContentStatus {
        match self {
            ContentStatus::Draft => ContentStatus::Published,
            ContentStatus::Published => ContentStatus::Draft,
        }
    }
}

// -- Rows as seen by clients --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
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
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Percentage of the five headline entrepreneur fields that are filled in.
    pub fn completion(&self) -> u8 {
        let filled = [
            &self.company_name,
            &self.industry,
            &self.pitch_summary,
            &self.funding_stage,
            &self.location,
        ]
        .into_iter()
        .filter(|field| field.as_deref().is_some_and(|s| !s.is_empty()))
        .count();

        (filled * 20) as u8
    }
}

/// Entrepreneur profile fields shown to investors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Startup {
    pub id: Uuid,
    pub full_name: String,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub funding_stage: Option<String>,
    pub funding_amount_needed: Option<f64>,
    pub pitch_summary: Option<String>,
    pub location: Option<String>,
}

/// Profile joined with its role assignment, as listed in user management.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub full_name: String,
    pub company_name: Option<String>,
    pub location: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Role name, or "unknown" when no assignment exists.
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject_name: String,
    #[serde(rename = "type")]
    pub kind: VerificationType,
    pub status: VerificationStatus,
    pub documents: i64,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reporter_name: String,
    pub reported_entity: String,
    pub reported_user_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: ReportSeverity,
    pub status: ReportStatus,
    pub description: Option<String>,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentType,
    pub status: ContentStatus,
    pub views: i64,
    pub body: String,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub sender_name: String,
    pub subject: String,
    pub body: String,
    pub read: bool,
    pub starred: bool,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }
}

/// Subject used for a reply. A thread keeps a single "Re: " prefix.
pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    let already_reply = trimmed
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"));
    if already_reply {
        trimmed.to_string()
    } else {
        format!("Re: {}", trimmed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    pub platform_name: String,
    pub support_email: String,
    pub timezone: String,
    pub default_language: String,
    pub description: String,
    pub maintenance_mode: bool,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub two_factor_required: bool,
    pub session_timeout_minutes: u32,
    pub primary_color: String,
    pub secondary_color: String,
    pub theme: String,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            platform_name: "PitchPoint".into(),
            support_email: "support@pitchpoint.co.za".into(),
            timezone: "africa-johannesburg".into(),
            default_language: "en".into(),
            description: "PitchPoint connects South African entrepreneurs with investors and mentors."
                .into(),
            maintenance_mode: false,
            email_notifications: true,
            push_notifications: true,
            two_factor_required: false,
            session_timeout_minutes: 30,
            primary_color: "#1e40af".into(),
            secondary_color: "#16a34a".into(),
            theme: "system".into(),
        }
    }
}
