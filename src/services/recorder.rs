//! Idempotent, time-bucketed persistence of normalized records
//!
//! Rows are keyed by `(sensor_id, time_bucket)`. A second write into the same
//! bucket is a no-op reported as [`WriteOutcome::Duplicate`], never an error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::entities::{prelude::*, site_readings};
use crate::error::PersistenceError;
use crate::models::record::NormalizedRecord;
use crate::services::audit_log::AuditLog;

/// 2019-01-01T00:00:00Z as Unix seconds
pub const BUCKET_EPOCH_SECS: i64 = 1_546_300_800;

const SECONDS_PER_BUCKET: i64 = 3600;

/// Whole hours elapsed between the bucket epoch and `at`, floored
pub fn time_bucket(at: DateTime<Utc>) -> i64 {
    (at.timestamp() - BUCKET_EPOCH_SECS).div_euclid(SECONDS_PER_BUCKET)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No row existed for the bucket; one was written
    Inserted,
    /// A row already existed for the bucket; nothing was written
    Duplicate,
}

impl WriteOutcome {
    /// Status code as recorded in logs and the audit file
    pub fn code(&self) -> i32 {
        match self {
            WriteOutcome::Inserted => 0,
            WriteOutcome::Duplicate => 1,
        }
    }

    /// Outcomes that get an audit line
    pub fn is_anomalous(&self) -> bool {
        matches!(self, WriteOutcome::Duplicate)
    }
}

#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Insert the row unless one exists for its `(sensor_id, time_bucket)`
    async fn insert_if_absent(
        &self,
        row: site_readings::ActiveModel,
    ) -> Result<WriteOutcome, PersistenceError>;
}

/// `INSERT .. ON CONFLICT (sensor_id, time_bucket) DO NOTHING`
#[derive(Clone)]
pub struct SeaOrmReadingStore {
    db: DatabaseConnection,
}

impl SeaOrmReadingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReadingStore for SeaOrmReadingStore {
    async fn insert_if_absent(
        &self,
        row: site_readings::ActiveModel,
    ) -> Result<WriteOutcome, PersistenceError> {
        let inserted = SiteReadings::insert(row)
            .on_conflict(
                OnConflict::columns([
                    site_readings::Column::SensorId,
                    site_readings::Column::TimeBucket,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(if inserted == 0 {
            WriteOutcome::Duplicate
        } else {
            WriteOutcome::Inserted
        })
    }
}

/// Build the row for `record` in persisted column order
pub fn to_active_model(record: &NormalizedRecord, sensor_id: i32) -> site_readings::ActiveModel {
    site_readings::ActiveModel {
        sensor_id: Set(sensor_id),
        time_bucket: Set(time_bucket(record.timestamp)),
        recorded_at: Set(record.timestamp),
        generation_kw: Set(record.generation_kw),
        load_kw: Set(record.load_kw),
        battery_soc: Set(record.battery_soc),
        grid_kw: Set(record.grid_kw),
        battery_kw: Set(record.battery_kw),
        pv_generated_kwh: Set(record.pv_generated_kwh),
        grid_feed_in_kwh: Set(record.grid_feed_in_kwh),
        home_load_kwh: Set(record.home_load_kwh),
        battery_charged_kwh: Set(record.battery_charged_kwh),
        battery_throughput_kwh: Set(record.battery_throughput_kwh),
        grid_import_kwh: Set(record.grid_import_kwh),
        raw_load_kwh: Set(record.raw_load_kwh),
        charging_pile_kwh: Set(record.charging_pile_kwh),
        diesel_kwh: Set(record.diesel_kwh),
        self_consumption_pct: Set(record.self_consumption_pct),
        self_sufficiency_pct: Set(record.self_sufficiency_pct),
        discharged_kwh: Set(record.discharged_kwh),
        grid_charge_kwh: Set(record.grid_charge_kwh),
        has_charging_pile: Set(record.has_charging_pile),
        generator_ran: Set(record.generator_ran),
    }
}

/// Writes records through a [`ReadingStore`] and audits anomalous outcomes
#[derive(Clone)]
pub struct Recorder {
    store: Arc<dyn ReadingStore>,
    audit: AuditLog,
}

impl Recorder {
    pub fn new(store: Arc<dyn ReadingStore>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    /// Persist `record` for `sensor_id`. Audit failures are logged and swallowed;
    /// only store failures are returned. `cancel` only interrupts the store
    /// call: once the write has resolved, its audit entry is always attempted.
    pub async fn persist(
        &self,
        record: &NormalizedRecord,
        sensor_id: i32,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<WriteOutcome, PersistenceError> {
        let bucket = time_bucket(record.timestamp);
        let row = to_active_model(record, sensor_id);
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PersistenceError::Cancelled),
            outcome = self.store.insert_if_absent(row) => outcome?,
        };

        info!(
            sensor_id = sensor_id,
            time_bucket = bucket,
            code = outcome.code(),
            outcome = ?outcome,
            "Reading persisted"
        );

        if outcome.is_anomalous() {
            if let Err(e) = self.audit.append(now, outcome.code(), sensor_id).await {
                warn!(sensor_id = sensor_id, error = %e, "Failed to write audit entry");
            }
        }

        Ok(outcome)
    }
}
