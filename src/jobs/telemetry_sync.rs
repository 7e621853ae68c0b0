//! Telemetry Sync Job
//!
//! Polls the energy-monitoring API on a fixed interval and persists one
//! normalized record per cycle. At most one cycle runs at a time: a tick that
//! fires while the previous cycle is still in flight is dropped, not queued.
//! Cycle failures are logged and the next tick starts a fresh cycle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{AuthenticationError, CycleError};
use crate::models::record::SiteIdentifiers;
use crate::services::normalizer;
use crate::services::recorder::{time_bucket, Recorder, WriteOutcome};
use crate::services::telemetry_client::{TelemetryClient, TelemetrySource};
use crate::services::token_cache::{Authenticator, TokenCache};

/// Summary of one successful cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub time_bucket: i64,
    /// `None` when persistence was skipped (dry run)
    pub outcome: Option<WriteOutcome>,
}

/// One unit of scheduled work
#[async_trait]
pub trait Cycle: Send + Sync + 'static {
    async fn run(&self, cancel: &CancellationToken) -> Result<CycleReport, CycleError>;
}

/// Authenticate, fetch, normalize and persist
pub struct TelemetryCycle {
    authenticator: Arc<dyn Authenticator>,
    source: Arc<dyn TelemetrySource>,
    tokens: Mutex<TokenCache>,
    recorder: Recorder,
    site: SiteIdentifiers,
    sensor_id: i32,
    dry_run: bool,
}

impl TelemetryCycle {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        source: Arc<dyn TelemetrySource>,
        recorder: Recorder,
        site: SiteIdentifiers,
        sensor_id: i32,
    ) -> Self {
        Self {
            authenticator,
            source,
            tokens: Mutex::new(TokenCache::new()),
            recorder,
            site,
            sensor_id,
            dry_run: false,
        }
    }

    /// Use one client for both login and data requests
    pub fn with_client(
        client: TelemetryClient,
        recorder: Recorder,
        site: SiteIdentifiers,
        sensor_id: i32,
    ) -> Self {
        let client = Arc::new(client);
        Self::new(client.clone(), client, recorder, site, sensor_id)
    }

    /// Skip persistence and only log the normalized record
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one cycle as of `now`
    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, CycleError> {
        let token = {
            let mut tokens = self.tokens.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AuthenticationError::Cancelled.into()),
                token = tokens.ensure_valid(now, &*self.authenticator) => token?,
            }
        };

        let bundle = self
            .source
            .fetch_all(&token, &self.site, now.date_naive(), cancel)
            .await?;

        let record = normalizer::merge(
            &bundle.live,
            &bundle.daily,
            &bundle.stats,
            self.site.central_id,
            now,
        );
        debug!(record = ?record, "Normalized telemetry record");

        let bucket = time_bucket(record.timestamp);

        if self.dry_run {
            info!(
                sensor_id = self.sensor_id,
                time_bucket = bucket,
                "DRY RUN: Skipping persistence"
            );
            return Ok(CycleReport {
                time_bucket: bucket,
                outcome: None,
            });
        }

        let outcome = self
            .recorder
            .persist(&record, self.sensor_id, now, cancel)
            .await?;

        Ok(CycleReport {
            time_bucket: bucket,
            outcome: Some(outcome),
        })
    }
}

#[async_trait]
impl Cycle for TelemetryCycle {
    async fn run(&self, cancel: &CancellationToken) -> Result<CycleReport, CycleError> {
        self.run_at(Utc::now(), cancel).await
    }
}

/// What a tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// A cycle was spawned
    Started(JoinHandle<()>),
    /// The previous cycle still held the gate
    Skipped,
}

/// Fixed-interval scheduler guarded by a single-slot gate
pub struct TelemetrySyncJob<C: Cycle> {
    cycle: Arc<C>,
    gate: Arc<Mutex<()>>,
    interval: Duration,
    run_on_startup: bool,
}

impl<C: Cycle> TelemetrySyncJob<C> {
    pub fn new(cycle: C, interval: Duration, run_on_startup: bool) -> Self {
        Self {
            cycle: Arc::new(cycle),
            gate: Arc::new(Mutex::new(())),
            interval,
            run_on_startup,
        }
    }

    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Start a cycle unless one is already in flight
    pub fn tick(&self, cancel: &CancellationToken) -> TickOutcome {
        let guard = match Arc::clone(&self.gate).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Previous telemetry cycle still running, skipping this tick");
                return TickOutcome::Skipped;
            }
        };

        let cycle = Arc::clone(&self.cycle);
        let cancel = cancel.clone();

        TickOutcome::Started(tokio::spawn(async move {
            let _guard = guard;
            info!("Starting telemetry cycle");

            // Inner task so a panicking cycle surfaces here as a JoinError
            let run = tokio::spawn(async move { cycle.run(&cancel).await });

            match run.await {
                Ok(Ok(report)) => {
                    info!(
                        time_bucket = report.time_bucket,
                        outcome = ?report.outcome,
                        "Telemetry cycle completed"
                    );
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Telemetry cycle failed");
                    // Continue - next tick will retry
                }
                Err(e) => {
                    error!(error = %e, "Telemetry cycle task aborted");
                }
            }
        }))
    }

    /// Tick until `cancel` fires, then wait for any in-flight cycle
    pub async fn run(self, cancel: CancellationToken) {
        let start = if self.run_on_startup {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };
        let mut ticker = interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.interval.as_secs(),
            run_on_startup = self.run_on_startup,
            "Telemetry sync job started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Shutdown signal received, stopping telemetry sync job gracefully");
                    break;
                }
                _ = ticker.tick() => {
                    let _ = self.tick(&cancel);
                }
            }
        }

        if self.is_running() {
            info!("Waiting for in-flight telemetry cycle to finish");
        }
        let _idle = self.gate.lock().await;

        info!("Telemetry sync job stopped");
    }
}

/// Spawn the scheduler loop
pub fn start_telemetry_sync_job<C: Cycle>(
    job: TelemetrySyncJob<C>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(job.run(cancel))
}
