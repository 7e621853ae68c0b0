//! Error taxonomy for the fetch-authenticate-transform-persist cycle

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The three data endpoints a cycle reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    LastPowerData,
    StaticsByDay,
    EnergyStatistics,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::LastPowerData => "/api/report/energyStorage/getLastPowerData",
            Endpoint::StaticsByDay => "/api/report/power/staticsByDay",
            Endpoint::EnergyStatistics => "/api/report/energy/getEnergyStatistics",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::LastPowerData => "getLastPowerData",
            Endpoint::StaticsByDay => "staticsByDay",
            Endpoint::EnergyStatistics => "getEnergyStatistics",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("login request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("login rejected with HTTP {status}")]
    Rejected { status: u16 },
    #[error("login response malformed: {0}")]
    Malformed(String),
    #[error("login response carried no token")]
    MissingToken,
    #[error("login cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{endpoint}: request failed: {source}")]
    Request {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint}: HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },
    #[error("{endpoint}: API error code {code}: {}", .message.as_deref().unwrap_or("no message"))]
    Api {
        endpoint: Endpoint,
        code: i64,
        message: Option<String>,
    },
    #[error("{endpoint}: malformed payload: {reason}")]
    Malformed { endpoint: Endpoint, reason: String },
    #[error("{endpoint}: cancelled")]
    Cancelled { endpoint: Endpoint },
}

impl FetchError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            FetchError::Request { endpoint, .. }
            | FetchError::Status { endpoint, .. }
            | FetchError::Api { endpoint, .. }
            | FetchError::Malformed { endpoint, .. }
            | FetchError::Cancelled { endpoint } => *endpoint,
        }
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("persistence cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
#[error("failed to append audit entry to {}: {source}", .path.display())]
pub struct AuditWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}
