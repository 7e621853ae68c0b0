//! Wire models for the energy-monitoring cloud API
//!
//! Every response is wrapped in an [`Envelope`]. Field names are matched
//! case-insensitively: the raw JSON is lowercased with [`lowercase_keys`]
//! before decoding, so every `rename` below is the lowercase wire name.
//! Unknown fields are ignored and every reading is optional.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Envelope code the API uses for a successful call
pub const SUCCESS_CODE: i64 = 200;

/// `{code, msg|message, data}` wrapper common to all API responses
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Envelope {
    #[serde(deserialize_with = "lenient_i64")]
    pub code: Option<i64>,
    #[serde(alias = "msg")]
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl Envelope {
    /// Parse a raw response body, lowercasing all keys first
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_slice(body)?;
        serde_json::from_value(lowercase_keys(raw))
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(SUCCESS_CODE)
    }

    /// Decode `data` into `T`. Every payload is a JSON object; a missing,
    /// null or non-object `data` is an error.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, String> {
        match self.data {
            None | Some(Value::Null) => Err(format!(
                "envelope carried no data (code {:?}, message {:?})",
                self.code, self.message
            )),
            Some(data @ Value::Object(_)) => {
                serde_json::from_value(data).map_err(|e| e.to_string())
            }
            Some(other) => Err(format!(
                "envelope data is not an object (code {:?}, message {:?}, data {})",
                self.code, self.message, other
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginData {
    pub token: Option<String>,
    #[serde(rename = "refreshtoken")]
    pub refresh_token: Option<String>,
}

/// Instantaneous readings from `getLastPowerData`, in watts
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LivePayload {
    #[serde(rename = "ppv", deserialize_with = "lenient_f64")]
    pub pv_power: Option<f64>,
    #[serde(rename = "pload", deserialize_with = "lenient_f64")]
    pub load_power: Option<f64>,
    /// Battery state of charge, percent
    #[serde(rename = "soc", deserialize_with = "lenient_f64")]
    pub soc: Option<f64>,
    #[serde(rename = "pgrid", deserialize_with = "lenient_f64")]
    pub grid_power: Option<f64>,
    #[serde(rename = "pbat", deserialize_with = "lenient_f64")]
    pub battery_power: Option<f64>,
    #[serde(rename = "haschargingpile", deserialize_with = "lenient_flag")]
    pub has_charging_pile: Option<bool>,
}

/// Same-day cumulative energy totals from `staticsByDay`, in kWh
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DailyPayload {
    #[serde(rename = "epv", deserialize_with = "lenient_f64")]
    pub pv_generated: Option<f64>,
    #[serde(rename = "eoutput", deserialize_with = "lenient_f64")]
    pub grid_feed_in: Option<f64>,
    #[serde(rename = "ehomeload", deserialize_with = "lenient_f64")]
    pub home_load: Option<f64>,
    #[serde(rename = "echarge", deserialize_with = "lenient_f64")]
    pub battery_charged: Option<f64>,
    #[serde(rename = "ebat", deserialize_with = "lenient_f64")]
    pub battery_throughput: Option<f64>,
    #[serde(rename = "einput", deserialize_with = "lenient_f64")]
    pub grid_import: Option<f64>,
    #[serde(rename = "eload", deserialize_with = "lenient_f64")]
    pub raw_load: Option<f64>,
    #[serde(rename = "echargingpile", deserialize_with = "lenient_f64")]
    pub charging_pile: Option<f64>,
    #[serde(rename = "ediesel", deserialize_with = "lenient_f64")]
    pub diesel: Option<f64>,

    // Intraday series, decoded but not used
    #[serde(rename = "time")]
    pub time_series: Option<Vec<Value>>,
    #[serde(rename = "ppv")]
    pub pv_series: Option<Vec<Value>>,
    #[serde(rename = "cbat")]
    pub soc_series: Option<Vec<Value>>,
}

/// Daily energy statistics from `getEnergyStatistics`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatsPayload {
    /// Percent
    #[serde(rename = "eselfconsumption", deserialize_with = "lenient_f64")]
    pub self_consumption: Option<f64>,
    /// Percent
    #[serde(rename = "eselfsufficiency", deserialize_with = "lenient_f64")]
    pub self_sufficiency: Option<f64>,
    #[serde(rename = "edischarge", deserialize_with = "lenient_f64")]
    pub discharged: Option<f64>,
    #[serde(rename = "egridcharge", deserialize_with = "lenient_f64")]
    pub grid_charge: Option<f64>,
    #[serde(rename = "generatorran", deserialize_with = "lenient_flag")]
    pub generator_ran: Option<bool>,
}

/// Recursively lowercase every object key
pub fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), lowercase_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Accepts a number, a numeric string or null
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accepts a bool, a number (non-zero is true) or "true"/"1"
fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => {
            let s = s.trim();
            Some(s.eq_ignore_ascii_case("true") || s == "1")
        }
        _ => None,
    })
}
