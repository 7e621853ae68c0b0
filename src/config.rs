//! Environment-driven settings, validated once at startup

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::record::SiteIdentifiers;

pub const ENV_BASE_URL: &str = "ALPHA_BASE_URL";
pub const ENV_LOGIN_URL: &str = "ALPHA_LOGIN_URL";
pub const ENV_USERNAME: &str = "ALPHA_USERNAME";
pub const ENV_PASSWORD: &str = "ALPHA_PASSWORD";
pub const ENV_SYS_SN: &str = "SITE_SYS_SN";
pub const ENV_STATION_ID: &str = "SITE_STATION_ID";
pub const ENV_CENTRAL_ID: &str = "SITE_CENTRAL_ID";
pub const ENV_SENSOR_ID: &str = "SITE_SENSOR_ID";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_FETCH_INTERVAL: &str = "FETCH_INTERVAL_MINUTES";
pub const ENV_AUDIT_LOG_PATH: &str = "AUDIT_LOG_PATH";
pub const ENV_HTTP_TIMEOUT: &str = "HTTP_TIMEOUT_SECS";
pub const ENV_RUN_ON_STARTUP: &str = "TELEMETRY_RUN_ON_STARTUP";
pub const ENV_DRY_RUN: &str = "TELEMETRY_DRY_RUN";

const DEFAULT_FETCH_INTERVAL_MINUTES: u64 = 5;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 100;
const DEFAULT_AUDIT_LOG_PATH: &str = "telemetry_audit.log";
/// Upper bound for the poll interval and HTTP timeout (one year)
const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Clone)]
pub struct Settings {
    pub base_url: String,
    pub login_url: String,
    pub username: String,
    pub password: String,
    pub site: SiteIdentifiers,
    pub sensor_id: i32,
    pub database_url: String,
    pub fetch_interval: Duration,
    pub audit_log_path: PathBuf,
    pub http_timeout: Duration,
    pub run_on_startup: bool,
    pub dry_run: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("login_url", &self.login_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("site", &self.site)
            .field("sensor_id", &self.sensor_id)
            .field("fetch_interval", &self.fetch_interval)
            .field("audit_log_path", &self.audit_log_path)
            .field("http_timeout", &self.http_timeout)
            .field("run_on_startup", &self.run_on_startup)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| -> Result<String, ConfigError> {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let base_url = required(ENV_BASE_URL)?.trim_end_matches('/').to_string();
        let login_url = required(ENV_LOGIN_URL)?;
        for (var, url) in [(ENV_BASE_URL, &base_url), (ENV_LOGIN_URL, &login_url)] {
            reqwest::Url::parse(url).map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })?;
        }

        let central_id = parse_number(ENV_CENTRAL_ID, &required(ENV_CENTRAL_ID)?)?;
        let sensor_id = parse_number(ENV_SENSOR_ID, &required(ENV_SENSOR_ID)?)?;

        let fetch_interval_minutes = match lookup(ENV_FETCH_INTERVAL) {
            Some(raw) => positive(ENV_FETCH_INTERVAL, parse_number(ENV_FETCH_INTERVAL, &raw)?)?,
            None => DEFAULT_FETCH_INTERVAL_MINUTES,
        };
        let fetch_interval_secs = fetch_interval_minutes
            .checked_mul(60)
            .filter(|secs| *secs <= MAX_DURATION_SECS)
            .ok_or_else(|| too_large(ENV_FETCH_INTERVAL))?;

        let http_timeout_secs = match lookup(ENV_HTTP_TIMEOUT) {
            Some(raw) => positive(ENV_HTTP_TIMEOUT, parse_number(ENV_HTTP_TIMEOUT, &raw)?)?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        if http_timeout_secs > MAX_DURATION_SECS {
            return Err(too_large(ENV_HTTP_TIMEOUT));
        }

        Ok(Self {
            base_url,
            login_url,
            username: required(ENV_USERNAME)?,
            password: required(ENV_PASSWORD)?,
            site: SiteIdentifiers {
                sys_sn: required(ENV_SYS_SN)?,
                station_id: required(ENV_STATION_ID)?,
                central_id,
            },
            sensor_id,
            database_url: required(ENV_DATABASE_URL)?,
            fetch_interval: Duration::from_secs(fetch_interval_secs),
            audit_log_path: lookup(ENV_AUDIT_LOG_PATH)
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AUDIT_LOG_PATH.to_string())
                .into(),
            http_timeout: Duration::from_secs(http_timeout_secs),
            run_on_startup: parse_flag(ENV_RUN_ON_STARTUP, lookup(ENV_RUN_ON_STARTUP), true)?,
            dry_run: parse_flag(ENV_DRY_RUN, lookup(ENV_DRY_RUN), false)?,
        })
    }
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn positive(var: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn too_large(var: &'static str) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: format!("must not exceed {} seconds", MAX_DURATION_SECS),
    }
}

fn parse_flag(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) if v == "true" || v == "1" || v == "yes" => Ok(true),
        Some(v) if v == "false" || v == "0" || v == "no" => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got '{}'", v),
        }),
    }
}
