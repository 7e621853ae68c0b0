//! In-process stand-in for the energy-monitoring cloud API

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use site_telemetry_sync::services::telemetry_client::TelemetryClient;

pub const USERNAME: &str = "installer";
pub const PASSWORD: &str = "hunter2";
pub const SYS_SN: &str = "AL2002321010043";

#[derive(Default)]
pub struct MockApi {
    pub logins: AtomicUsize,
    pub live_calls: AtomicUsize,
    pub login_without_token: AtomicBool,
    pub fail_live: AtomicBool,
    /// Answer the live endpoint with an error envelope over HTTP 200
    pub busy_live: AtomicBool,
    pub garbage_stats: AtomicBool,
    /// Delay applied to every data request
    pub delay_ms: AtomicUsize,
}

impl MockApi {
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    fn current_token(&self) -> String {
        format!("tok-{}", self.logins())
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", self.current_token()))
            .unwrap_or(false)
    }

    async fn delay(&self) {
        let ms = self.delay_ms.load(Ordering::SeqCst) as u64;
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

fn envelope(data: Value) -> Response {
    Json(json!({ "code": 200, "msg": "Success", "data": data })).into_response()
}

async fn login(State(api): State<Arc<MockApi>>, Json(body): Json<Value>) -> Response {
    if body["username"] != USERNAME || body["password"] != PASSWORD {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if api.login_without_token.load(Ordering::SeqCst) {
        return Json(json!({ "code": 6001, "msg": "account locked", "data": null }))
            .into_response();
    }

    api.logins.fetch_add(1, Ordering::SeqCst);
    envelope(json!({ "token": api.current_token(), "refreshToken": "refresh" }))
}

async fn last_power_data(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    api.live_calls.fetch_add(1, Ordering::SeqCst);
    api.delay().await;
    if !api.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if api.fail_live.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if api.busy_live.load(Ordering::SeqCst) {
        return Json(json!({ "code": 6007, "msg": "system busy", "data": [] })).into_response();
    }
    if query.get("sysSn").map(String::as_str) != Some(SYS_SN) || !query.contains_key("stationId")
    {
        return StatusCode::BAD_REQUEST.into_response();
    }

    envelope(json!({
        "PPV": 1500,
        "pLoad": 820,
        "Soc": 64.5,
        "PGrid": -250,
        "pbat": "300",
        "hasChargingPile": 1,
        "firmware": "ignored"
    }))
}

async fn statics_by_day(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    api.delay().await;
    if !api.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if query.get("sysSn").map(String::as_str) != Some(SYS_SN) || !query.contains_key("date") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    envelope(json!({
        "Epv": 12.4,
        "EOutput": 3.1,
        "eHomeLoad": 7.7,
        "eCharge": 4.0,
        "eBat": 6.5,
        "eInput": 0.9,
        "eLoad": 8.2,
        "time": ["00:00", "00:05"],
        "ppv": [0, 12]
    }))
}

async fn energy_statistics(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    api.delay().await;
    if !api.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if api.garbage_stats.load(Ordering::SeqCst) {
        return "<html>maintenance</html>".into_response();
    }
    if query.get("beginDate") != query.get("endDate") || !query.contains_key("beginDate") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    envelope(json!({
        "eSelfConsumption": 74,
        "eSelfSufficiency": 91,
        "eDischarge": 2.5,
        "generatorRan": false
    }))
}

/// Serve the mock on an ephemeral port; returns its base URL
pub async fn spawn(api: Arc<MockApi>) -> String {
    let router = Router::new()
        .route("/api/login", post(login))
        .route("/api/report/energyStorage/getLastPowerData", get(last_power_data))
        .route("/api/report/power/staticsByDay", get(statics_by_day))
        .route("/api/report/energy/getEnergyStatistics", get(energy_statistics))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

pub fn client(base_url: &str) -> TelemetryClient {
    TelemetryClient::new(
        base_url.to_string(),
        format!("{}/api/login", base_url),
        USERNAME.to_string(),
        PASSWORD.to_string(),
        Duration::from_secs(10),
    )
    .unwrap()
}
