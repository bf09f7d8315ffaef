//! Runtime configuration loaded from the environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;
use tracing::{info, warn};

use crate::auth::password::DEFAULT_COST;

/// bcrypt accepts costs in this range
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Secret used when running in development without `JWT_SECRET`
const DEVELOPMENT_JWT_SECRET: &str = "development-secret-change-me";

/// Configuration errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The signing secret is required outside development
    #[error("JWT_SECRET must be set when APP_ENV is {0}")]
    MissingSecret(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Token signing and lifetime settings
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    /// HMAC secret for HS256
    pub jwt_secret: String,
    /// Value of the `iss` claim
    pub issuer: String,
    /// Access token lifetime in minutes
    pub access_token_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_token_days: i64,
    /// bcrypt work factor for stored passwords
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            issuer: "patient-registry".to_string(),
            access_token_minutes: 30,
            refresh_token_days: 7,
            bcrypt_cost: DEFAULT_COST,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Port the gateway listens on
    pub port: u16,
    /// Deployment environment name
    pub app_env: String,
    /// Whether the patient and search routes need a bearer token
    pub require_auth: bool,
    pub log_format: LogFormat,
    pub auth: AuthConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            app_env: "development".to_string(),
            require_auth: true,
            log_format: LogFormat::Pretty,
            auth: AuthConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load the configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let app_env = lookup("APP_ENV").unwrap_or(defaults.app_env);

        let jwt_secret = match lookup("JWT_SECRET").filter(|secret| !secret.is_empty()) {
            Some(secret) => secret,
            None if app_env == "development" => {
                warn!("JWT_SECRET not set, using the development secret");
                DEVELOPMENT_JWT_SECRET.to_string()
            }
            None => return Err(ConfigError::MissingSecret(app_env)),
        };

        let auth = AuthConfig {
            jwt_secret,
            issuer: lookup("JWT_ISSUER").unwrap_or(defaults.auth.issuer),
            access_token_minutes: parse_or(
                &lookup,
                "ACCESS_TOKEN_EXPIRATION_MINUTES",
                defaults.auth.access_token_minutes,
            ),
            refresh_token_days: parse_or(
                &lookup,
                "REFRESH_TOKEN_EXPIRATION_DAYS",
                defaults.auth.refresh_token_days,
            ),
            bcrypt_cost: bcrypt_cost(&lookup, defaults.auth.bcrypt_cost),
        };

        Ok(Self {
            port: parse_or(&lookup, "PORT", defaults.port),
            app_env,
            require_auth: parse_flag(&lookup, "REQUIRE_AUTH", defaults.require_auth),
            log_format: parse_or(&lookup, "LOG_FORMAT", defaults.log_format),
            auth,
        })
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default");
            default
        }),
        None => {
            info!("{key} not set, using default");
            default
        }
    }
}

fn bcrypt_cost<F>(lookup: &F, default: u32) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    let cost = parse_or(lookup, "BCRYPT_COST", default);
    if BCRYPT_COST_RANGE.contains(&cost) {
        return cost;
    }
    let clamped = cost.clamp(*BCRYPT_COST_RANGE.start(), *BCRYPT_COST_RANGE.end());
    warn!("BCRYPT_COST {cost} out of range, using {clamped}");
    clamped
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_lowercase()) {
        Some(v) if v == "true" || v == "1" || v == "yes" => true,
        Some(v) if v == "false" || v == "0" || v == "no" => false,
        Some(v) => {
            warn!("Invalid {key} value '{v}', using default");
            default
        }
        None => default,
    }
}
