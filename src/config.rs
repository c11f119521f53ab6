use serde::Deserialize;

use crate::error::ConfigError;

/// Upper bound on token lifetime: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// `None` when `JWT_SECRET` is unset; token operations then fail with
    /// [`ConfigError::SecretMissing`] instead of aborting startup.
    pub secret: Option<String>,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

impl JwtConfig {
    /// `ttl_minutes` forced into `1..=MAX_TTL_MINUTES`.
    pub fn ttl_minutes_clamped(&self) -> i64 {
        self.ttl_minutes.clamp(1, MAX_TTL_MINUTES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    Production,
    Development,
}

impl Deployment {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Deployment::Production,
            _ => Deployment::Development,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub site_url: String,
    pub deployment: Deployment,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "brightsteps".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "brightsteps-web".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .map_or(60, |m| m.clamp(1, MAX_TTL_MINUTES)),
        };
        let site_url = std::env::var("SITE_URL")
            .unwrap_or_else(|_| "https://brightsteps.app".into())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            database_url,
            jwt,
            site_url,
            deployment: Deployment::from_env(),
        })
    }
}
