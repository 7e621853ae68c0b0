//! Normalized site record produced once per cycle

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identifiers the remote API and the store know the site by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteIdentifiers {
    /// Inverter system serial number (`sysSn`)
    pub sys_sn: String,
    pub station_id: String,
    pub central_id: i32,
}

/// Flat merge of live, daily and statistics payloads.
///
/// Power is in kW, energy in kWh, SOC and the self-consumption/self-sufficiency
/// rates in percent. Absent source values are `0.0` / `false`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub central_id: i32,
    pub timestamp: DateTime<Utc>,

    pub generation_kw: f64,
    pub load_kw: f64,
    pub battery_soc: f64,
    pub grid_kw: f64,
    pub battery_kw: f64,

    pub pv_generated_kwh: f64,
    pub grid_feed_in_kwh: f64,
    pub home_load_kwh: f64,
    pub battery_charged_kwh: f64,
    pub battery_throughput_kwh: f64,
    pub grid_import_kwh: f64,
    pub raw_load_kwh: f64,
    pub charging_pile_kwh: f64,
    pub diesel_kwh: f64,

    pub self_consumption_pct: f64,
    pub self_sufficiency_pct: f64,
    pub discharged_kwh: f64,
    pub grid_charge_kwh: f64,

    pub has_charging_pile: bool,
    pub generator_ran: bool,
}
