//! Request validation. Each validator returns the first failing rule, and
//! runs before anything touches storage.

use chrono::{Datelike, Utc};

use pitchpoint_types::api::{
    EntrepreneurSignupRequest, InvestorSignupRequest, SigninRequest, SignupRequest,
    UpdateProfileRequest,
};
use pitchpoint_types::models::PlatformSettings;

use crate::error::ApiError;

pub const INDUSTRIES: &[&str] = &[
    "FinTech",
    "HealthTech",
    "EdTech",
    "E-commerce",
    "SaaS",
    "CleanTech",
    "AgriTech",
    "PropTech",
    "AI/ML",
    "Other",
];

pub const FUNDING_STAGES: &[&str] = &["Pre-Seed", "Seed", "Series A", "Series B", "Series C+"];

pub const SESSION_TIMEOUTS: &[u32] = &[15, 30, 60, 120];

const MIN_FOUNDING_YEAR: i32 = 1900;

type Check = Result<(), ApiError>;

fn min_chars(field: &'static str, value: &str, min: usize, message: &str) -> Check {
    if value.chars().count() < min {
        return Err(ApiError::validation(field, message));
    }
    Ok(())
}

fn positive(field: &'static str, value: f64, message: &str) -> Check {
    if value.is_nan() || value <= 0.0 {
        return Err(ApiError::validation(field, message));
    }
    Ok(())
}

pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

fn email(value: &str) -> Check {
    if !is_email(value) {
        return Err(ApiError::validation("email", "Invalid email address"));
    }
    Ok(())
}

fn password(value: &str) -> Check {
    min_chars("password", value, 6, "Password must be at least 6 characters")
}

fn full_name(value: &str) -> Check {
    min_chars("full_name", value, 2, "Full name is required")
}

fn location(value: &str) -> Check {
    min_chars("location", value, 2, "Location is required")
}

/// Empty means "no website".
fn website(value: &str) -> Check {
    if value.is_empty() || url::Url::parse(value).is_ok() {
        return Ok(());
    }
    Err(ApiError::validation("website", "Invalid website URL"))
}

fn founding_year(value: i32) -> Check {
    let current = Utc::now().year();
    if value < MIN_FOUNDING_YEAR {
        return Err(ApiError::validation(
            "founding_year",
            format!("Number must be greater than or equal to {}", MIN_FOUNDING_YEAR),
        ));
    }
    if value > current {
        return Err(ApiError::validation(
            "founding_year",
            format!("Number must be less than or equal to {}", current),
        ));
    }
    Ok(())
}

fn industry(value: &str) -> Check {
    min_chars("industry", value, 1, "Industry is required")?;
    if !INDUSTRIES.contains(&value) {
        return Err(ApiError::validation("industry", format!("Unknown industry '{}'", value)));
    }
    Ok(())
}

fn funding_stage(field: &'static str, value: &str) -> Check {
    min_chars(field, value, 1, "Funding stage is required")?;
    if !FUNDING_STAGES.contains(&value) {
        return Err(ApiError::validation(field, format!("Unknown funding stage '{}'", value)));
    }
    Ok(())
}

fn pitch_summary(value: &str) -> Check {
    min_chars("pitch_summary", value, 50, "Pitch summary must be at least 50 characters")
}

fn bio(value: &str) -> Check {
    min_chars("bio", value, 50, "Bio must be at least 50 characters")
}

fn investment_focus(values: &[String]) -> Check {
    if values.is_empty() {
        return Err(ApiError::validation(
            "investment_focus",
            "Please select at least one industry focus",
        ));
    }
    if let Some(unknown) = values.iter().find(|v| !INDUSTRIES.contains(&v.as_str())) {
        return Err(ApiError::validation(
            "investment_focus",
            format!("Unknown industry '{}'", unknown),
        ));
    }
    Ok(())
}

fn preferred_stages(values: &[String]) -> Check {
    if values.is_empty() {
        return Err(ApiError::validation(
            "preferred_stages",
            "Please select at least one preferred funding stage",
        ));
    }
    if let Some(unknown) = values.iter().find(|v| !FUNDING_STAGES.contains(&v.as_str())) {
        return Err(ApiError::validation(
            "preferred_stages",
            format!("Unknown funding stage '{}'", unknown),
        ));
    }
    Ok(())
}

fn ticket_range(min: f64, max: f64) -> Check {
    if min > max {
        return Err(ApiError::validation(
            "ticket_size_min",
            "Minimum ticket size cannot be greater than maximum",
        ));
    }
    Ok(())
}

pub fn signup(req: &SignupRequest) -> Check {
    email(&req.email)?;
    password(&req.password)?;
    full_name(&req.full_name)
}

pub fn signin(req: &SigninRequest) -> Check {
    email(&req.email)?;
    password(&req.password)
}

pub fn entrepreneur(req: &EntrepreneurSignupRequest) -> Check {
    full_name(&req.full_name)?;
    email(&req.email)?;
    password(&req.password)?;
    min_chars("company_name", &req.company_name, 2, "Company name is required")?;
    industry(&req.industry)?;
    founding_year(req.founding_year)?;
    location(&req.location)?;
    funding_stage("funding_stage", &req.funding_stage)?;
    positive("funding_amount", req.funding_amount, "Funding amount must be positive")?;
    pitch_summary(&req.pitch_summary)?;
    website(&req.website)
}

pub fn investor(req: &InvestorSignupRequest) -> Check {
    investment_focus(&req.investment_focus)?;
    preferred_stages(&req.preferred_stages)?;

    full_name(&req.full_name)?;
    email(&req.email)?;
    password(&req.password)?;
    location(&req.location)?;
    positive("ticket_size_min", req.ticket_size_min, "Minimum investment must be positive")?;
    positive("ticket_size_max", req.ticket_size_max, "Maximum investment must be positive")?;
    if req.portfolio_count < 0 {
        return Err(ApiError::validation(
            "portfolio_count",
            "Portfolio count cannot be negative",
        ));
    }
    bio(&req.bio)?;
    website(&req.website)?;

    ticket_range(req.ticket_size_min, req.ticket_size_max)
}

/// Provided fields follow the signup rules. The ticket range is checked against
/// the stored values for whichever bound is not being changed.
pub fn profile_update(
    req: &UpdateProfileRequest,
    stored_min: Option<f64>,
    stored_max: Option<f64>,
) -> Check {
    if let Some(v) = &req.full_name {
        full_name(v)?;
    }
    if let Some(v) = &req.company_name {
        min_chars("company_name", v, 2, "Company name is required")?;
    }
    if let Some(v) = &req.industry {
        industry(v)?;
    }
    if let Some(v) = req.founding_year {
        founding_year(v)?;
    }
    if let Some(v) = &req.location {
        location(v)?;
    }
    if let Some(v) = &req.funding_stage {
        funding_stage("funding_stage", v)?;
    }
    if let Some(v) = req.funding_amount_needed {
        positive("funding_amount_needed", v, "Funding amount must be positive")?;
    }
    if let Some(v) = &req.pitch_summary {
        pitch_summary(v)?;
    }
    if let Some(v) = &req.website {
        website(v)?;
    }
    if let Some(v) = &req.bio {
        bio(v)?;
    }
    if let Some(v) = req.portfolio_count {
        if v < 0 {
            return Err(ApiError::validation(
                "portfolio_count",
                "Portfolio count cannot be negative",
            ));
        }
    }
    if let Some(v) = req.ticket_size_min {
        positive("ticket_size_min", v, "Minimum investment must be positive")?;
    }
    if let Some(v) = req.ticket_size_max {
        positive("ticket_size_max", v, "Maximum investment must be positive")?;
    }
    if let Some(v) = &req.investment_focus {
        investment_focus(v)?;
    }
    if let Some(v) = &req.preferred_stages {
        preferred_stages(v)?;
    }

    if let (Some(min), Some(max)) = (
        req.ticket_size_min.or(stored_min),
        req.ticket_size_max.or(stored_max),
    ) {
        ticket_range(min, max)?;
    }
    Ok(())
}

fn hex_colour(field: &'static str, value: &str) -> Check {
    let valid = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(ApiError::validation(field, "Colours must be in #rrggbb form"));
    }
    Ok(())
}

pub fn settings(settings: &PlatformSettings) -> Check {
    if settings.platform_name.trim().is_empty() {
        return Err(ApiError::validation("platform_name", "Platform name is required"));
    }
    if !is_email(&settings.support_email) {
        return Err(ApiError::validation("support_email", "Invalid email address"));
    }
    if !SESSION_TIMEOUTS.contains(&settings.session_timeout_minutes) {
        return Err(ApiError::validation(
            "session_timeout_minutes",
            "Session timeout must be 15, 30, 60 or 120 minutes",
        ));
    }
    hex_colour("primary_color", &settings.primary_color)?;
    hex_colour("secondary_color", &settings.secondary_color)
}

/// Non-blank free text, for titles and subjects.
pub fn required(field: &'static str, value: &str, message: &str) -> Check {
    if value.trim().is_empty() {
        return Err(ApiError::validation(field, message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entrepreneur_form() -> EntrepreneurSignupRequest {
        EntrepreneurSignupRequest {
            full_name: "Thabo Nkosi".into(),
            email: "thabo@agriflow.co.za".into(),
            password: "secret1".into(),
            company_name: "AgriFlow".into(),
            industry: "AgriTech".into(),
            founding_year: 2021,
            location: "Durban".into(),
            funding_stage: "Seed".into(),
            funding_amount: 500_000.0,
            pitch_summary: "x".repeat(50),
            website: String::new(),
        }
    }

    fn investor_form() -> InvestorSignupRequest {
        InvestorSignupRequest {
            full_name: "Sarah Molefe".into(),
            email: "sarah@capital.co.za".into(),
            password: "secret1".into(),
            location: "Johannesburg".into(),
            ticket_size_min: 100_000.0,
            ticket_size_max: 1_000_000.0,
            portfolio_count: 4,
            bio: "b".repeat(60),
            website: "https://capital.co.za".into(),
            investment_focus: vec!["FinTech".into()],
            preferred_stages: vec!["Seed".into()],
        }
    }

    fn message_of(check: Check) -> String {
        match check {
            Err(ApiError::Validation { message, .. }) => message,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("a@b.co"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.co"));
        assert!(!is_email("a b@c.co"));
        assert!(!is_email("a@@b.co"));
        assert!(!is_email("a@b..co"));
    }

    #[test]
    fn pitch_summary_boundary_counts_characters() {
        let mut form = entrepreneur_form();
        form.pitch_summary = "x".repeat(49);
        assert_eq!(
            message_of(entrepreneur(&form)),
            "Pitch summary must be at least 50 characters"
        );

        form.pitch_summary = "x".repeat(50);
        assert!(entrepreneur(&form).is_ok());

        // 50 multi-byte characters are still 50 characters
        form.pitch_summary = "é".repeat(50);
        assert!(entrepreneur(&form).is_ok());
    }

    #[test]
    fn entrepreneur_rules_in_order() {
        let mut form = entrepreneur_form();
        form.full_name = "T".into();
        form.email = "nope".into();
        assert_eq!(message_of(entrepreneur(&form)), "Full name is required");

        let mut form = entrepreneur_form();
        form.funding_amount = 0.0;
        assert_eq!(message_of(entrepreneur(&form)), "Funding amount must be positive");

        let mut form = entrepreneur_form();
        form.founding_year = 1899;
        assert!(entrepreneur(&form).is_err());

        let mut form = entrepreneur_form();
        form.website = "not a url".into();
        assert_eq!(message_of(entrepreneur(&form)), "Invalid website URL");
    }

    #[test]
    fn investor_selection_checked_first() {
        let mut form = investor_form();
        form.investment_focus.clear();
        form.email = "broken".into();
        assert_eq!(
            message_of(investor(&form)),
            "Please select at least one industry focus"
        );

        let mut form = investor_form();
        form.preferred_stages.clear();
        assert_eq!(
            message_of(investor(&form)),
            "Please select at least one preferred funding stage"
        );
    }

    #[test]
    fn investor_ticket_range() {
        let mut form = investor_form();
        form.ticket_size_min = 2_000_000.0;
        assert_eq!(
            message_of(investor(&form)),
            "Minimum ticket size cannot be greater than maximum"
        );

        form.ticket_size_min = form.ticket_size_max;
        assert!(investor(&form).is_ok());
    }

    #[test]
    fn profile_update_checks_range_against_stored_bounds() {
        let req = UpdateProfileRequest {
            ticket_size_min: Some(5_000.0),
            ..Default::default()
        };
        assert!(profile_update(&req, Some(1_000.0), Some(4_000.0)).is_err());
        assert!(profile_update(&req, Some(1_000.0), Some(10_000.0)).is_ok());
        assert!(profile_update(&UpdateProfileRequest::default(), None, None).is_ok());
    }

    #[test]
    fn settings_rules() {
        assert!(settings(&PlatformSettings::default()).is_ok());

        let mut s = PlatformSettings::default();
        s.session_timeout_minutes = 45;
        assert_eq!(
            message_of(settings(&s)),
            "Session timeout must be 15, 30, 60 or 120 minutes"
        );

        let mut s = PlatformSettings::default();
        s.primary_color = "#12345g".into();
        assert!(settings(&s).is_err());
    }
}
