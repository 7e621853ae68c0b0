//! `SeaORM` Entity for the site_readings table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "site_readings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub sensor_id: i32,
    /// Whole hours since 2019-01-01T00:00:00Z
    #[sea_orm(primary_key, auto_increment = false)]
    pub time_bucket: i64,
    pub recorded_at: DateTimeUtc,
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
