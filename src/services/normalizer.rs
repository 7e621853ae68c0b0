//! Merges the three decoded payloads into one [`NormalizedRecord`].
//!
//! Pure: no I/O, no failure path. Live power readings arrive in watts and
//! are stored in kilowatts; energy totals are already kWh and pass through.

use chrono::{DateTime, Utc};

use crate::models::record::NormalizedRecord;
use crate::models::telemetry::{DailyPayload, LivePayload, StatsPayload};

const WATTS_PER_KILOWATT: f64 = 1000.0;

fn kw(watts: Option<f64>) -> f64 {
    watts.unwrap_or(0.0) / WATTS_PER_KILOWATT
}

fn or_zero(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0)
}

pub fn merge(
    live: &LivePayload,
    daily: &DailyPayload,
    stats: &StatsPayload,
    central_id: i32,
    now: DateTime<Utc>,
) -> NormalizedRecord {
    NormalizedRecord {
        central_id,
        timestamp: now,

        generation_kw: kw(live.pv_power),
        load_kw: kw(live.load_power),
        battery_soc: or_zero(live.soc),
        grid_kw: kw(live.grid_power),
        battery_kw: kw(live.battery_power),

        pv_generated_kwh: or_zero(daily.pv_generated),
        grid_feed_in_kwh: or_zero(daily.grid_feed_in),
        home_load_kwh: or_zero(daily.home_load),
        battery_charged_kwh: or_zero(daily.battery_charged),
        battery_throughput_kwh: or_zero(daily.battery_throughput),
        grid_import_kwh: or_zero(daily.grid_import),
        raw_load_kwh: or_zero(daily.raw_load),
        charging_pile_kwh: or_zero(daily.charging_pile),
        diesel_kwh: or_zero(daily.diesel),

        self_consumption_pct: or_zero(stats.self_consumption),
        self_sufficiency_pct: or_zero(stats.self_sufficiency),
        discharged_kwh: or_zero(stats.discharged),
        grid_charge_kwh: or_zero(stats.grid_charge),

        has_charging_pile: live.has_charging_pile.unwrap_or(false),
        generator_ran: stats.generator_ran.unwrap_or(false),
    }
}
