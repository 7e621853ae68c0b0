use std::sync::Arc;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use site_telemetry_sync::config::Settings;
use site_telemetry_sync::jobs::telemetry_sync::{
    start_telemetry_sync_job, TelemetryCycle, TelemetrySyncJob,
};
use site_telemetry_sync::services::audit_log::AuditLog;
use site_telemetry_sync::services::recorder::{Recorder, SeaOrmReadingStore};
use site_telemetry_sync::services::telemetry_client::TelemetryClient;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,site_telemetry_sync=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = Settings::from_env().expect("Invalid configuration");
    tracing::info!(settings = ?settings, "Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&settings.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let client = TelemetryClient::from_settings(&settings).expect("Failed to build HTTP client");
    let recorder = Recorder::new(
        Arc::new(SeaOrmReadingStore::new(db)),
        AuditLog::new(settings.audit_log_path.clone()),
    );
    let cycle = TelemetryCycle::with_client(
        client,
        recorder,
        settings.site.clone(),
        settings.sensor_id,
    )
    .dry_run(settings.dry_run);

    let job = TelemetrySyncJob::new(cycle, settings.fetch_interval, settings.run_on_startup);

    let cancel = CancellationToken::new();
    let handle = start_telemetry_sync_job(job, cancel.clone());

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
    cancel.cancel();

    if let Err(e) = handle.await {
        tracing::error!(error = %e, "Telemetry sync job panicked");
    }
}
