#![allow(dead_code)]

pub mod mock_api;

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use site_telemetry_sync::entities::site_readings;
use site_telemetry_sync::error::PersistenceError;
use site_telemetry_sync::models::record::{NormalizedRecord, SiteIdentifiers};
use site_telemetry_sync::services::recorder::{ReadingStore, WriteOutcome};

/// Set up an in-memory SQLite database with the real migrations applied.
/// A single pooled connection keeps the in-memory database alive.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn site() -> SiteIdentifiers {
    SiteIdentifiers {
        sys_sn: "AL2002321010043".to_string(),
        station_id: "7f3c".to_string(),
        central_id: 7,
    }
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
}

pub fn sample_record(timestamp: DateTime<Utc>) -> NormalizedRecord {
    NormalizedRecord {
        central_id: 7,
        timestamp,
        generation_kw: 1.5,
        load_kw: 0.8,
        battery_soc: 64.0,
        grid_kw: -0.2,
        battery_kw: 0.5,
        pv_generated_kwh: 12.4,
        grid_feed_in_kwh: 3.1,
        home_load_kwh: 7.7,
        battery_charged_kwh: 4.0,
        battery_throughput_kwh: 6.5,
        grid_import_kwh: 0.9,
        raw_load_kwh: 8.2,
        charging_pile_kwh: 0.0,
        diesel_kwh: 0.0,
        self_consumption_pct: 74.0,
        self_sufficiency_pct: 91.0,
        discharged_kwh: 2.5,
        grid_charge_kwh: 0.0,
        has_charging_pile: false,
        generator_ran: false,
    }
}

/// Store that replays a fixed outcome and counts calls
pub struct ScriptedStore {
    outcome: Mutex<Result<WriteOutcome, String>>,
    calls: AtomicUsize,
}

impl ScriptedStore {
    pub fn returning(outcome: WriteOutcome) -> Self {
        Self {
            outcome: Mutex::new(Ok(outcome)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Mutex::new(Err(message.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadingStore for ScriptedStore {
    async fn insert_if_absent(
        &self,
        _row: site_readings::ActiveModel,
    ) -> Result<WriteOutcome, PersistenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.outcome.lock().unwrap() {
            Ok(outcome) => Ok(*outcome),
            Err(message) => Err(PersistenceError::Database(DbErr::Custom(message.clone()))),
        }
    }
}

/// Collects formatted `tracing` output so tests can assert on log lines
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events into the buffer until the guard drops
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// True if one line carries both `level` and `message`
    pub fn has_line(&self, level: &str, message: &str) -> bool {
        self.contents()
            .lines()
            .any(|line| line.contains(level) && line.contains(message))
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
