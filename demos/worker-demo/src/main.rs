//! Wiring example: connects every crate in the workspace into a running
//! scheduler + worker process against a real Postgres database.
//!
//! Reads `DATABASE_URL` from the environment; everything else uses
//! [`SchedulerConfig::default`]. Not meant to be deployed as-is — a real
//! operator will have its own `ActiveProviderSource` backed by whatever
//! tracks the provider fleet, and its own handlers per job type.

use std::sync::Arc;

use provider_sched_core::{
    ActiveProviderSource, HandlerOutcome, JobType, QueueJob, SchedulerError, WorkHandler,
};
use provider_sched_postgres::{PgMutexStore, PgQueueAdapter, PgScheduleStore};
use provider_sched_runtime::{
    reconciler::{GlobalJobRate, PerProviderJobRate},
    worker::MaintenanceWindows,
    EnqueueLoop, MetricsCollector, RunMode, Scheduler, ScheduleReconciler, SchedulerConfig, WorkerRuntime,
};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;

/// A handler that just logs — stands in for the real deal/retrieval probe
/// logic, which lives outside this crate.
struct LoggingHandler {
    job_type: &'static str,
}

#[async_trait::async_trait]
impl WorkHandler for LoggingHandler {
    fn job_type(&self) -> &'static str {
        self.job_type
    }

    async fn handle(&self, job: &QueueJob, _cancel: &CancellationToken) -> HandlerOutcome {
        tracing::info!(job_type = self.job_type, job_id = %job.id, "running job");
        HandlerOutcome::Success
    }
}

/// Reads `RUN_MODE` (`api`, `worker`, or `both`, case-insensitive),
/// defaulting to `both` when unset so the demo still does something useful
/// out of the box.
fn run_mode_from_env() -> RunMode {
    match std::env::var("RUN_MODE").unwrap_or_default().to_lowercase().as_str() {
        "api" => RunMode::Api,
        "worker" => RunMode::Worker,
        "" | "both" => RunMode::Both,
        other => {
            tracing::warn!(run_mode = other, "unrecognized RUN_MODE, defaulting to both");
            RunMode::Both
        }
    }
}

/// Reads a static, comma-separated provider list from `ACTIVE_PROVIDERS`.
/// A real deployment would query the provider-fleet system of record
/// instead.
struct EnvProviderSource;

#[async_trait::async_trait]
impl ActiveProviderSource for EnvProviderSource {
    async fn list_active_providers(&self) -> Result<Vec<String>, SchedulerError> {
        let raw = std::env::var("ACTIVE_PROVIDERS").unwrap_or_default();
        Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new().max_connections(10).connect(&database_url).await?;

    let schedule_store = PgScheduleStore::new(pool.clone());
    let queue_adapter = PgQueueAdapter::new(pool.clone());
    let mutex_store = PgMutexStore::new(pool.clone());

    let config = SchedulerConfig::default();
    let run_mode = run_mode_from_env();
    tracing::info!(?run_mode, "starting worker-demo");

    let reconciler = ScheduleReconciler::new(
        schedule_store.clone(),
        Arc::new(EnvProviderSource),
        vec![
            PerProviderJobRate {
                job_type: JobType::Deal,
                rate_per_hour: config.deals_per_sp_per_hour,
            },
            PerProviderJobRate {
                job_type: JobType::Retrieval,
                rate_per_hour: config.retrievals_per_sp_per_hour,
            },
        ],
        vec![
            GlobalJobRate {
                job_type: JobType::Metrics,
                rate_per_hour: config.metrics_per_hour,
            },
            // Cleanup and the provider-fleet refresh aren't probe-rate
            // driven by anything in `SchedulerConfig`, so they keep fixed
            // daily/ten-minute cadences expressed directly as rates.
            GlobalJobRate {
                job_type: JobType::MetricsCleanup,
                rate_per_hour: 1.0 / 24.0,
            },
            GlobalJobRate {
                job_type: JobType::ProvidersRefresh,
                rate_per_hour: 6.0,
            },
        ],
    );

    let enqueue_loop = EnqueueLoop::new(schedule_store.clone(), queue_adapter.clone());
    let metrics_collector = MetricsCollector::new(
        schedule_store.clone(),
        queue_adapter.clone(),
        Arc::new(provider_sched_core::metrics::NoOpMetricsSink),
        vec![
            JobType::Deal,
            JobType::Retrieval,
            JobType::Metrics,
            JobType::MetricsCleanup,
            JobType::ProvidersRefresh,
        ],
    );

    let scheduler = Scheduler::new(
        reconciler,
        enqueue_loop,
        metrics_collector,
        config.clone(),
        vec![
            JobType::Deal,
            JobType::Retrieval,
            JobType::Metrics,
            JobType::MetricsCleanup,
            JobType::ProvidersRefresh,
        ],
    );

    let maintenance_windows: Arc<MaintenanceWindows> = Arc::new(MaintenanceWindows::new());
    let mut worker = WorkerRuntime::new(
        queue_adapter,
        mutex_store,
        Arc::new(provider_sched_core::metrics::NoOpMetricsSink),
        maintenance_windows,
        hostname(),
    );
    for job_type in [
        JobType::Deal,
        JobType::Retrieval,
        JobType::Metrics,
        JobType::MetricsCleanup,
        JobType::ProvidersRefresh,
    ] {
        worker.register_handler(Arc::new(LoggingHandler {
            job_type: job_type.as_str(),
        }));
    }
    let worker = Arc::new(worker);

    let shutdown = CancellationToken::new();

    let scheduler_task = run_mode.runs_scheduler().then(|| {
        let scheduler_shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(scheduler_shutdown).await })
    });

    let worker_task = run_mode.runs_workers().then(|| {
        let worker_shutdown = shutdown.clone();
        let worker_for_loop = Arc::clone(&worker);
        tokio::spawn(async move {
            let job_types = [
                JobType::Deal,
                JobType::Retrieval,
                JobType::Metrics,
                JobType::MetricsCleanup,
                JobType::ProvidersRefresh,
            ];
            loop {
                if worker_shutdown.is_cancelled() {
                    break;
                }
                let mut claimed_any = false;
                for job_type in job_types {
                    match worker_for_loop.run_once(job_type, &config, &worker_shutdown).await {
                        Ok(claimed) => claimed_any |= claimed,
                        Err(err) => tracing::error!(error = %err, "worker pass failed"),
                    }
                }
                if !claimed_any {
                    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                }
            }
        })
    });

    if scheduler_task.is_none() && worker_task.is_none() {
        tracing::warn!("RUN_MODE=api starts neither the scheduler nor workers in this demo; idling until ctrl-c");
    }

    tokio::signal::ctrl_c().await?;
    shutdown.cancel();
    if let Some(task) = scheduler_task {
        let _ = task.await;
    }
    if let Some(task) = worker_task {
        let _ = task.await;
    }

    Ok(())
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "worker-demo".to_string())
}
