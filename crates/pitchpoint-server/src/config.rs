use std::path::PathBuf;

use anyhow::{Context, Result, bail};

const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "changeme",
    "secret",
];

const DEFAULT_SESSION_DAYS: i64 = 30;
const MAX_SESSION_DAYS: i64 = 365;

/// Admin account created at startup when both variables are set.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub session_days: i64,
    pub admin: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = lookup("PITCHPOINT_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PITCHPOINT_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let db_path = lookup("PITCHPOINT_DB_PATH")
            .unwrap_or_else(|| "pitchpoint.db".into())
            .into();
        let host = lookup("PITCHPOINT_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("PITCHPOINT_PORT") {
            Some(raw) => raw.parse().context("PITCHPOINT_PORT must be a port number")?,
            None => 3000,
        };
        let session_days = match lookup("PITCHPOINT_SESSION_DAYS") {
            Some(raw) => raw
                .parse()
                .context("PITCHPOINT_SESSION_DAYS must be a whole number")?,
            None => DEFAULT_SESSION_DAYS,
        };
        if !(1..=MAX_SESSION_DAYS).contains(&session_days) {
            bail!("PITCHPOINT_SESSION_DAYS must be between 1 and {}", MAX_SESSION_DAYS);
        }

        let admin = match (
            lookup("PITCHPOINT_ADMIN_EMAIL"),
            lookup("PITCHPOINT_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            _ => bail!("PITCHPOINT_ADMIN_EMAIL and PITCHPOINT_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            jwt_secret,
            db_path,
            host,
            port,
            session_days,
            admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[("PITCHPOINT_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.db_path, PathBuf::from("pitchpoint.db"));
        assert_eq!(cfg.session_days, 30);
        assert!(cfg.admin.is_none());
    }

    #[test]
    fn placeholder_secret_refused() {
        assert!(config(&[]).is_err());
        assert!(config(&[("PITCHPOINT_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn admin_seed_needs_both_halves() {
        let only_email = config(&[
            ("PITCHPOINT_JWT_SECRET", "a-real-secret"),
            ("PITCHPOINT_ADMIN_EMAIL", "admin@pitchpoint.co.za"),
        ]);
        assert!(only_email.is_err());

        let both = config(&[
            ("PITCHPOINT_JWT_SECRET", "a-real-secret"),
            ("PITCHPOINT_ADMIN_EMAIL", "admin@pitchpoint.co.za"),
            ("PITCHPOINT_ADMIN_PASSWORD", "hunter22"),
        ])
        .unwrap();
        assert_eq!(both.admin.unwrap().email, "admin@pitchpoint.co.za");
    }

    #[test]
    fn bad_port_is_an_error() {
        let cfg = config(&[
            ("PITCHPOINT_JWT_SECRET", "a-real-secret"),
            ("PITCHPOINT_PORT", "eighty"),
        ]);
        assert!(cfg.is_err());
    }

    #[test]
    fn session_days_are_bounded() {
        let secret = ("PITCHPOINT_JWT_SECRET", "a-real-secret");
        assert!(config(&[secret, ("PITCHPOINT_SESSION_DAYS", "0")]).is_err());
        assert!(config(&[secret, ("PITCHPOINT_SESSION_DAYS", "366")]).is_err());
        assert!(config(&[secret, ("PITCHPOINT_SESSION_DAYS", "9223372036854775807")]).is_err());

        let year = config(&[secret, ("PITCHPOINT_SESSION_DAYS", "365")]).unwrap();
        assert_eq!(year.session_days, 365);
    }
}
