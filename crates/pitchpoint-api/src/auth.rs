use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{info, warn};
use uuid::Uuid;

use pitchpoint_db::{Database, NewAccount, NewProfile};
use pitchpoint_gateway::session::{self, Identity};
use pitchpoint_types::api::{
    CurrentUser, EntrepreneurSignupRequest, InvestorSignupRequest, SessionInfo, SigninRequest,
    SigninResponse, SignupRequest, SignupResponse,
};
use pitchpoint_types::events::ChangeEvent;
use pitchpoint_types::models::{Profile, Role, RoleAssignment, Table};

use crate::error::ApiError;
use crate::forms;
use crate::state::{AppState, db_call};

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))
}

fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("bad stored hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Create a session row and sign a token for it.
async fn open_session(state: &AppState, user_id: Uuid, email: &str) -> Result<String, ApiError> {
    let session_id = Uuid::new_v4();
    let expires_at = session::session_expiry(state.session_days);

    db_call(state, move |db| {
        db.create_session(&session_id.to_string(), &user_id.to_string(), expires_at)
    })
    .await?;

    Ok(session::create_token(
        &state.jwt_secret,
        user_id,
        email,
        session_id,
        expires_at,
    )?)
}

/// Insert the account, or return `None` when the email is already taken.
/// The unique email index decides, so two concurrent signups for the same
/// address cannot both succeed.
fn create_unique(db: &Database, account: &NewAccount) -> anyhow::Result<Option<Profile>> {
    if let Err(e) = db.create_account(account) {
        if db.get_user_by_email(&account.email)?.is_some() {
            return Ok(None);
        }
        return Err(e);
    }
    db.get_profile(&account.user_id.to_string())
}

/// Identity, profile and role in one transaction, then a session.
async fn register(
    state: &AppState,
    email: &str,
    password: &str,
    role: Role,
    profile: NewProfile,
) -> Result<SignupResponse, ApiError> {
    let email = email.trim().to_string();
    let password_hash = hash_password(password)?;
    let user_id = Uuid::new_v4();

    let account = NewAccount {
        user_id,
        email: email.clone(),
        password_hash,
        role,
        profile,
    };
    let created = db_call(state, move |db| create_unique(db, &account)).await?;

    let Some(profile) = created else {
        return Err(ApiError::Conflict(
            "An account with this email already exists".into(),
        ));
    };
    state
        .dispatcher
        .publish(ChangeEvent::insert(Table::Profiles, &profile));
    state.dispatcher.publish(ChangeEvent::insert(
        Table::UserRoles,
        &RoleAssignment { user_id, role },
    ));

    info!("New {} account {} ({})", role, email, user_id);

    let token = open_session(state, user_id, &email).await?;
    Ok(SignupResponse {
        user_id,
        role,
        token,
    })
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    forms::signup(&req)?;
    let role = req.role.unwrap_or(Role::Entrepreneur);
    if role == Role::Admin {
        return Err(ApiError::validation(
            "role",
            "Choose an entrepreneur or investor account",
        ));
    }

    let profile = NewProfile {
        full_name: req.full_name.trim().to_string(),
        ..Default::default()
    };
    let res = register(&state, &req.email, &req.password, role, profile).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

pub async fn signup_entrepreneur(
    State(state): State<AppState>,
    Json(req): Json<EntrepreneurSignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    forms::entrepreneur(&req)?;

    let profile = NewProfile {
        full_name: req.full_name.trim().to_string(),
        company_name: non_empty(&req.company_name),
        industry: non_empty(&req.industry),
        founding_year: Some(req.founding_year),
        location: non_empty(&req.location),
        funding_stage: non_empty(&req.funding_stage),
        funding_amount_needed: Some(req.funding_amount),
        pitch_summary: non_empty(&req.pitch_summary),
        website: non_empty(&req.website),
        ..Default::default()
    };
    let res = register(&state, &req.email, &req.password, Role::Entrepreneur, profile).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

pub async fn signup_investor(
    State(state): State<AppState>,
    Json(req): Json<InvestorSignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    forms::investor(&req)?;

    let profile = NewProfile {
        full_name: req.full_name.trim().to_string(),
        location: non_empty(&req.location),
        website: non_empty(&req.website),
        bio: non_empty(&req.bio),
        portfolio_count: Some(req.portfolio_count),
        ticket_size_min: Some(req.ticket_size_min),
        ticket_size_max: Some(req.ticket_size_max),
        investment_focus: Some(req.investment_focus.clone()),
        preferred_stages: Some(req.preferred_stages.clone()),
        ..Default::default()
    };
    let res = register(&state, &req.email, &req.password, Role::Investor, profile).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

pub async fn signin(
    State(state): State<AppState>,
    Json(req): Json<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    forms::signin(&req)?;

    let email = req.email.trim().to_string();
    let found = db_call(&state, move |db| {
        let Some(user) = db.get_user_by_email(&email)? else {
            return Ok(None);
        };
        let role = db.get_role(&user.id)?;
        Ok(Some((user, role)))
    })
    .await?;

    let Some((user, role)) = found else {
        warn!("Sign-in for unknown email {}", req.email.trim());
        return Err(ApiError::Unauthorized);
    };
    if !verify_password(&req.password, &user.password)? {
        warn!("Bad password for {}", user.email);
        return Err(ApiError::Unauthorized);
    }

    let user_id: Uuid = user.id.parse().map_err(anyhow::Error::from)?;
    let token = open_session(&state, user_id, &user.email).await?;

    Ok(Json(SigninResponse {
        user_id,
        email: user.email,
        role,
        token,
    }))
}

/// Deletes the session row. The token stops working immediately.
pub async fn signout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let sid = identity.session_id.to_string();
    db_call(&state, move |db| db.delete_session(&sid)).await?;
    info!("{} signed out", identity.email);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let id = identity.user_id.to_string();
    let user = db_call(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(CurrentUser {
        id: identity.user_id,
        email: user.email,
        role: identity.role,
        created_at: pitchpoint_db::models::parse_timestamp(&user.created_at)?,
    }))
}

pub async fn current_session(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(SessionInfo {
        session_id: identity.session_id,
        user_id: identity.user_id,
        email: identity.email,
        role: identity.role,
        expires_at: identity.expires_at,
    })
}

/// Create the configured admin account if no user holds that email yet.
/// Returns true when an account was created.
pub fn seed_admin(db: &Database, email: &str, password: &str) -> anyhow::Result<bool> {
    if !forms::is_email(email) {
        anyhow::bail!("admin email '{}' is not a valid address", email);
    }
    if password.chars().count() < 6 {
        anyhow::bail!("admin password must be at least 6 characters");
    }
    if db.get_user_by_email(email)?.is_some() {
        return Ok(false);
    }

    db.create_account(&NewAccount {
        user_id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: hash_password(password)?,
        role: Role::Admin,
        profile: NewProfile {
            full_name: "Administrator".to_string(),
            ..Default::default()
        },
    })?;
    info!("Seeded admin account {}", email);
    Ok(true)
}
