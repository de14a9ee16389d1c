use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_DATABASE_URL: &str = "sqlite:./crowdfund.sqlite?mode=rwc";
const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not valid: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("{0} must be set together with IDENTITY_URL")]
    Missing(&'static str),
}

/// Where sessions come from.
#[derive(Clone, PartialEq, Eq)]
pub enum IdentityConfig {
    /// Credentials in the `users` table, sessions in process memory.
    Local,
    /// GoTrue-style hosted auth service.
    Hosted { url: url::Url, api_key: String },
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityConfig::Local => f.write_str("Local"),
            IdentityConfig::Hosted { url, .. } => f
                .debug_struct("Hosted")
                .field("url", &url.as_str())
                .field("api_key", &"[REDACTED]")
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub identity: IdentityConfig,
    pub storage_dir: PathBuf,
    pub public_base_url: String,
    pub admin_emails: Vec<String>,
    pub max_image_bytes: usize,
    /// Requests per minute per client IP; `None` disables the governor layer.
    pub rate_limit_burst: Option<u32>,
    pub payment_decline_above: Option<i64>,
    pub run_migrations: bool,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = parse_or(&get("CROWDFUND_BIND"), "CROWDFUND_BIND", DEFAULT_BIND)?;
        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let identity = match get("IDENTITY_URL") {
            Some(raw) => {
                let url = url::Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                    key: "IDENTITY_URL",
                    reason: e.to_string(),
                })?;
                let api_key =
                    get("IDENTITY_API_KEY").ok_or(ConfigError::Missing("IDENTITY_API_KEY"))?;
                IdentityConfig::Hosted { url, api_key }
            }
            None => IdentityConfig::Local,
        };

        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://{}", bind_addr))
            .trim_end_matches('/')
            .to_string();

        let admin_emails = get("ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let max_image_bytes = match get("MAX_IMAGE_BYTES") {
            Some(raw) => parse_value(&raw, "MAX_IMAGE_BYTES")?,
            None => DEFAULT_MAX_IMAGE_BYTES,
        };

        let rate_limit_burst = match get("RATE_LIMIT_BURST") {
            Some(raw) => parse_value::<u32>(&raw, "RATE_LIMIT_BURST")?,
            None => DEFAULT_RATE_LIMIT_BURST,
        };

        let payment_decline_above = get("SIMULATED_PAYMENT_DECLINE_ABOVE")
            .map(|raw| parse_value::<i64>(&raw, "SIMULATED_PAYMENT_DECLINE_ABOVE"))
            .transpose()?;

        let run_migrations = match get("RUN_MIGRATIONS") {
            Some(raw) => parse_bool(&raw, "RUN_MIGRATIONS")?,
            None => true,
        };

        Ok(AppConfig {
            bind_addr,
            database_url,
            identity,
            storage_dir: PathBuf::from(
                get("STORAGE_DIR").unwrap_or_else(|| "./storage".to_string()),
            ),
            public_base_url,
            admin_emails,
            max_image_bytes,
            rate_limit_burst: (rate_limit_burst > 0).then_some(rate_limit_burst),
            payment_decline_above,
            run_migrations,
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: &Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    parse_value(raw.as_deref().unwrap_or(default), key)
}

fn parse_value<T: std::str::FromStr>(raw: &str, key: &'static str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

fn parse_bool(raw: &str, key: &'static str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}
