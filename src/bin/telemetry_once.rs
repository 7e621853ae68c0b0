use std::sync::Arc;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use site_telemetry_sync::config::Settings;
use site_telemetry_sync::jobs::telemetry_sync::{Cycle, TelemetryCycle};
use site_telemetry_sync::services::audit_log::AuditLog;
use site_telemetry_sync::services::recorder::{Recorder, SeaOrmReadingStore};
use site_telemetry_sync::services::telemetry_client::TelemetryClient;

/// Run a single telemetry cycle and exit
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
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

    let settings = Settings::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&settings.database_url).await?;
    migration::Migrator::up(&db, None).await?;

    let client = TelemetryClient::from_settings(&settings)?;
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

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            watcher.cancel();
        }
    });

    match cycle.run(&cancel).await {
        Ok(report) => {
            tracing::info!(
                time_bucket = report.time_bucket,
                outcome = ?report.outcome,
                "Telemetry cycle completed"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Telemetry cycle failed");
            Err(e.into())
        }
    }
}
