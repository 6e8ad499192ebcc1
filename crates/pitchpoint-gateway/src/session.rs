use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use pitchpoint_db::Database;
use pitchpoint_db::models::parse_timestamp;
use pitchpoint_types::api::Claims;
use pitchpoint_types::models::Role;

/// The caller behind a bearer token, as confirmed against the session table.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub session_id: Uuid,
    pub role: Option<Role>,
    pub expires_at: DateTime<Utc>,
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    session_id: Uuid,
    expires_at: DateTime<Utc>,
) -> Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        sid: session_id,
        exp: expires_at.timestamp() as usize,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn session_expiry(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}

/// Signature and expiry check only. Revocation is checked by `resolve`.
pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Look the token's session up. Blocking; call from `spawn_blocking`.
///
/// Returns `None` when the session was revoked, has expired, or belongs to a
/// different user than the token claims.
pub fn resolve(db: &Database, claims: &Claims) -> Result<Option<Identity>> {
    let Some(session) = db.get_session(&claims.sid.to_string())? else {
        return Ok(None);
    };
    if session.user_id != claims.sub.to_string() {
        return Ok(None);
    }
    let expires_at = parse_timestamp(&session.expires_at)?;
    if expires_at <= Utc::now() {
        return Ok(None);
    }

    let role = db.get_role(&session.user_id)?;
    Ok(Some(Identity {
        user_id: claims.sub,
        email: claims.email.clone(),
        session_id: claims.sid,
        role,
        expires_at,
    }))
}
