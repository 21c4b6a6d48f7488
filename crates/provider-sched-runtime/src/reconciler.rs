//! Schedule Reconciler: keeps `job_schedule_state` in sync with the
//! current active-provider population and the fixed set of global jobs.

use std::sync::Arc;

use provider_sched_core::{ActiveProviderSource, JobType, SchedulerError, GLOBAL_SCOPE};
use provider_sched_postgres::PgScheduleStore;

use crate::config::{interval_seconds_for_rate_per_hour, SchedulerConfig};

/// A configured per-provider job type and its target rate, in probes per
/// provider per hour (spec §3, §6 `deals_per_sp_per_hour` /
/// `retrievals_per_sp_per_hour`).
#[derive(Debug, Clone, Copy)]
pub struct PerProviderJobRate {
    pub job_type: JobType,
    pub rate_per_hour: f64,
}

impl PerProviderJobRate {
    /// `interval_seconds` actually stored in `job_schedule_state` for this
    /// rate (spec §4.4 step 2).
    pub fn interval_seconds(self) -> i64 {
        interval_seconds_for_rate_per_hour(self.rate_per_hour)
    }
}

/// A configured global job type and its target rate, in runs per hour
/// (spec §3, §6 `metrics_per_hour`).
#[derive(Debug, Clone, Copy)]
pub struct GlobalJobRate {
    pub job_type: JobType,
    pub rate_per_hour: f64,
}

impl GlobalJobRate {
    pub fn interval_seconds(self) -> i64 {
        interval_seconds_for_rate_per_hour(self.rate_per_hour)
    }
}

pub struct ScheduleReconciler {
    store: PgScheduleStore,
    provider_source: Arc<dyn ActiveProviderSource>,
    per_provider_rates: Vec<PerProviderJobRate>,
    global_rates: Vec<GlobalJobRate>,
}

/// Outcome of a single reconciliation pass, returned for logging/metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileReport {
    pub providers_observed: usize,
    pub schedules_inserted: u64,
    pub schedules_deleted: u64,
}

impl ScheduleReconciler {
    pub fn new(
        store: PgScheduleStore,
        provider_source: Arc<dyn ActiveProviderSource>,
        per_provider_rates: Vec<PerProviderJobRate>,
        global_rates: Vec<GlobalJobRate>,
    ) -> Self {
        ScheduleReconciler {
            store,
            provider_source,
            per_provider_rates,
            global_rates,
        }
    }

    /// Ensure every configured global job type has a schedule row, then
    /// bring per-provider rows in line with the current active set:
    /// insert rows for newly active providers, delete rows for providers
    /// no longer active. Guarded against an empty active set (spec §9) by
    /// [`PgScheduleStore::delete_schedules_for_inactive_providers`].
    pub async fn reconcile(&self, config: &SchedulerConfig) -> Result<ReconcileReport, SchedulerError> {
        let now = chrono::Utc::now();
        let mut report = ReconcileReport::default();

        for rate in &self.global_rates {
            if self
                .store
                .upsert_schedule(rate.job_type, GLOBAL_SCOPE, rate.interval_seconds(), now)
                .await?
            {
                report.schedules_inserted += 1;
            }
        }

        let active_addresses = self.provider_source.list_active_providers().await?;
        report.providers_observed = active_addresses.len();

        let first_run_at = now + chrono::Duration::seconds(config.schedule_phase_seconds.max(0));

        for rate in &self.per_provider_rates {
            let interval_seconds = rate.interval_seconds();
            for address in &active_addresses {
                if self
                    .store
                    .upsert_schedule(rate.job_type, address, interval_seconds, first_run_at)
                    .await?
                {
                    report.schedules_inserted += 1;
                }
            }

            report.schedules_deleted += self
                .store
                .delete_schedules_for_inactive_providers(rate.job_type, &active_addresses)
                .await?;
        }

        Ok(report)
    }
}
