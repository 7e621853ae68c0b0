use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{AuthenticationError, Endpoint, FetchError};
use crate::models::record::SiteIdentifiers;
use crate::models::telemetry::{
    DailyPayload, Envelope, LivePayload, LoginData, LoginRequest, StatsPayload,
};
use crate::services::token_cache::Authenticator;

/// Idle pooled connections are kept this long between cycles
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// The three payloads a cycle needs, decoded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryBundle {
    pub live: LivePayload,
    pub daily: DailyPayload,
    pub stats: StatsPayload,
}

/// Source of the three per-cycle payloads
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_all(
        &self,
        token: &str,
        site: &SiteIdentifiers,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<TelemetryBundle, FetchError>;
}

/// HTTP client for the energy-monitoring cloud API.
///
/// Cheap to clone; all clones share one keep-alive connection pool.
#[derive(Clone)]
pub struct TelemetryClient {
    client: Client,
    base_url: String,
    login_url: String,
    username: String,
    password: String,
}

impl TelemetryClient {
    pub fn new(
        base_url: String,
        login_url: String,
        username: String,
        password: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            login_url,
            username,
            password,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        Self::new(
            settings.base_url.clone(),
            settings.login_url.clone(),
            settings.username.clone(),
            settings.password.clone(),
            settings.http_timeout,
        )
    }

    /// GET one endpoint and decode the `data` member of its envelope
    async fn get_data<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        token: &str,
        query: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        debug!(endpoint = %endpoint, url = %url, "Fetching telemetry");

        let request = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .bearer_auth(token)
            .query(query);

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled { endpoint }),
            body = send_for_body(request, endpoint) => body?,
        };

        let envelope = Envelope::parse(&body).map_err(|e| FetchError::Malformed {
            endpoint,
            reason: e.to_string(),
        })?;

        // A missing code is tolerated; an explicit non-success code is not
        if let (Some(code), false) = (envelope.code, envelope.is_success()) {
            warn!(
                endpoint = %endpoint,
                code = code,
                message = ?envelope.message,
                "API envelope reported a non-success code"
            );
            return Err(FetchError::Api {
                endpoint,
                code,
                message: envelope.message,
            });
        }

        envelope
            .into_data()
            .map_err(|reason| FetchError::Malformed { endpoint, reason })
    }
}

async fn send_for_body(request: RequestBuilder, endpoint: Endpoint) -> Result<Vec<u8>, FetchError> {
    let response = request
        .send()
        .await
        .map_err(|source| FetchError::Request { endpoint, source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            endpoint,
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| FetchError::Request { endpoint, source })?;

    if body.is_empty() {
        return Err(FetchError::Malformed {
            endpoint,
            reason: "empty body".to_string(),
        });
    }

    Ok(body.to_vec())
}

#[async_trait]
impl Authenticator for TelemetryClient {
    async fn login(&self) -> Result<String, AuthenticationError> {
        debug!(url = %self.login_url, "Logging in");

        let response = self
            .client
            .post(&self.login_url)
            .header("accept", "application/json")
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthenticationError::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let envelope =
            Envelope::parse(&body).map_err(|e| AuthenticationError::Malformed(e.to_string()))?;

        if matches!(envelope.data, None | Some(serde_json::Value::Null)) {
            warn!(code = ?envelope.code, message = ?envelope.message, "Login returned no data");
            return Err(AuthenticationError::MissingToken);
        }

        let data: LoginData = envelope
            .into_data()
            .map_err(AuthenticationError::Malformed)?;

        data.token
            .filter(|t| !t.is_empty())
            .ok_or(AuthenticationError::MissingToken)
    }
}

#[async_trait]
impl TelemetrySource for TelemetryClient {
    /// Issue the three requests concurrently; the first failure aborts the rest
    async fn fetch_all(
        &self,
        token: &str,
        site: &SiteIdentifiers,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<TelemetryBundle, FetchError> {
        let date = date.format("%Y-%m-%d").to_string();
        let sys_sn = site.sys_sn.as_str();
        let station_id = site.station_id.as_str();

        let live_query = [("sysSn", sys_sn), ("stationId", station_id)];
        let daily_query = [("sysSn", sys_sn), ("date", date.as_str())];
        let stats_query = [
            ("sysSn", sys_sn),
            ("stationId", station_id),
            ("beginDate", date.as_str()),
            ("endDate", date.as_str()),
        ];

        let live = self.get_data::<LivePayload>(Endpoint::LastPowerData, token, &live_query, cancel);
        let daily = self.get_data::<DailyPayload>(Endpoint::StaticsByDay, token, &daily_query, cancel);
        let stats =
            self.get_data::<StatsPayload>(Endpoint::EnergyStatistics, token, &stats_query, cancel);

        let (live, daily, stats) = tokio::try_join!(live, daily, stats)?;

        Ok(TelemetryBundle { live, daily, stats })
    }
}
