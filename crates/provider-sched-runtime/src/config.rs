//! Runtime configuration.
//!
//! Plain struct plus a `Default` impl, deliberately without a bundled
//! file/env parser — loading configuration from a particular source is
//! out of scope here; callers that want `figment`/`config`/env-var
//! wiring construct a `SchedulerConfig` themselves and hand it in.

use std::time::Duration;

use provider_sched_core::JobType;

/// Which of the scheduler's two subsystems a process should run (spec
/// §6's `run_mode`). Not consulted anywhere inside this crate — the
/// caller's wiring binary reads it once at startup and decides whether to
/// spawn [`crate::Scheduler::run`], the worker poll loop, or both; the
/// crate itself has no opinion on process topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Neither the tick loop nor workers run in this process.
    Api,
    /// Workers run; the tick loop does not.
    Worker,
    /// Both the tick loop and workers run in this process.
    Both,
}

impl RunMode {
    pub fn runs_scheduler(self) -> bool {
        matches!(self, RunMode::Both)
    }

    pub fn runs_workers(self) -> bool {
        matches!(self, RunMode::Worker | RunMode::Both)
    }
}

/// Tunables for one scheduler instance. All durations are stored in
/// seconds to match the database columns they govern.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the tick loop runs the reconciler + enqueue loop.
    pub poll_interval_seconds: i64,
    /// Upper bound on how many missed runs a single catch-up burst will
    /// schedule for one schedule row.
    pub catchup_max: i64,
    /// Window, in seconds, over which catch-up sends beyond the first are
    /// spread to avoid a thundering herd against one provider/queue.
    pub spread_seconds: i64,
    /// Initial delay applied to a schedule row's `next_run_at` the first
    /// time it is inserted (spec §4.4 step 3). Never applied again once
    /// the row exists — `UpsertSchedule` leaves `next_run_at` untouched on
    /// every later update, so this only ever affects a brand-new provider.
    pub schedule_phase_seconds: i64,
    /// How long a `job_mutex` row must sit unrenewed before another
    /// worker may steal it.
    pub mutex_stale_seconds: i64,
    /// Lease duration granted to a worker claiming a queue job.
    pub lease_seconds: i64,
    /// Max schedule rows claimed per job type per tick.
    pub claim_batch_size: i64,
    /// Delay before a per-provider job that lost the mutex race re-sends
    /// itself to the queue.
    pub lock_retry_seconds: i64,
    /// Per-handler timeout for `deal` jobs.
    pub deal_job_timeout_seconds: i64,
    /// Per-handler timeout for `retrieval` jobs.
    pub retrieval_job_timeout_seconds: i64,
    /// Per-handler timeout for every other (global) job type.
    pub default_job_timeout_seconds: i64,
    /// Target probes per storage provider per hour for `deal` jobs.
    pub deals_per_sp_per_hour: f64,
    /// Target probes per storage provider per hour for `retrieval` jobs.
    pub retrievals_per_sp_per_hour: f64,
    /// Target runs per hour for the global `metrics` job.
    pub metrics_per_hour: f64,
}

/// Ceiling applied to a derived interval so a near-zero configured rate
/// can't produce a `next_run_at` so far in the future that later
/// `DateTime` arithmetic on it overflows. A schedule row this stale is
/// effectively "off" regardless of the exact number.
const MAX_DERIVED_INTERVAL_SECONDS: i64 = 365 * 24 * 3600;

/// Converts a target rate (runs per hour) into the whole-second interval
/// the schedule store tracks (spec §3, §4.4 step 2): `interval_seconds =
/// max(1, round(3600 / rate_per_hour))`. A non-positive rate is clamped to
/// the slowest representable interval rather than dividing by zero or
/// going negative.
pub fn interval_seconds_for_rate_per_hour(rate_per_hour: f64) -> i64 {
    if rate_per_hour <= 0.0 {
        return MAX_DERIVED_INTERVAL_SECONDS;
    }
    ((3600.0 / rate_per_hour).round() as i64).clamp(1, MAX_DERIVED_INTERVAL_SECONDS)
}

impl SchedulerConfig {
    /// Floor applied to `poll_interval_seconds`: a tighter loop than this
    /// just burns database connections without meaningfully improving
    /// responsiveness.
    const MIN_POLL_INTERVAL_SECONDS: i64 = 1;

    /// Floor applied to every per-job-type handler timeout (spec §6:
    /// "with floors"). A timeout tighter than this would abort handlers
    /// before they have a realistic chance to make network calls.
    const MIN_JOB_TIMEOUT_SECONDS: i64 = 5;

    /// Timeout, in seconds, configured for `job_type`'s handler.
    pub fn job_timeout_seconds(&self, job_type: JobType) -> i64 {
        match job_type {
            JobType::Deal => self.deal_job_timeout_seconds,
            JobType::Retrieval => self.retrieval_job_timeout_seconds,
            _ => self.default_job_timeout_seconds,
        }
    }

    pub fn job_timeout(&self, job_type: JobType) -> Duration {
        Duration::from_secs(self.job_timeout_seconds(job_type).max(0) as u64)
    }

    /// Validate and clamp fields that would otherwise produce a
    /// pathological tick loop, logging when a clamp fires rather than
    /// failing construction outright — a misconfigured poll interval
    /// should run (safely) and be visible in logs, not crash the process.
    pub fn validated(mut self) -> Self {
        if self.poll_interval_seconds < Self::MIN_POLL_INTERVAL_SECONDS {
            tracing::warn!(
                configured = self.poll_interval_seconds,
                floor = Self::MIN_POLL_INTERVAL_SECONDS,
                "poll_interval_seconds below floor, clamping"
            );
            self.poll_interval_seconds = Self::MIN_POLL_INTERVAL_SECONDS;
        }
        if self.catchup_max < 1 {
            tracing::warn!(
                configured = self.catchup_max,
                "catchup_max below 1, clamping to 1"
            );
            self.catchup_max = 1;
        }
        if self.claim_batch_size < 1 {
            tracing::warn!(
                configured = self.claim_batch_size,
                "claim_batch_size below 1, clamping to 1"
            );
            self.claim_batch_size = 1;
        }
        for (label, timeout) in [
            ("deal_job_timeout_seconds", &mut self.deal_job_timeout_seconds),
            ("retrieval_job_timeout_seconds", &mut self.retrieval_job_timeout_seconds),
            ("default_job_timeout_seconds", &mut self.default_job_timeout_seconds),
        ] {
            if *timeout < Self::MIN_JOB_TIMEOUT_SECONDS {
                tracing::warn!(
                    configured = *timeout,
                    floor = Self::MIN_JOB_TIMEOUT_SECONDS,
                    field = label,
                    "job timeout below floor, clamping"
                );
                *timeout = Self::MIN_JOB_TIMEOUT_SECONDS;
            }
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.max(0) as u64)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            poll_interval_seconds: 30,
            catchup_max: 5,
            spread_seconds: 300,
            schedule_phase_seconds: 0,
            mutex_stale_seconds: 900,
            lease_seconds: 60,
            claim_batch_size: 100,
            lock_retry_seconds: 30,
            deal_job_timeout_seconds: 300,
            retrieval_job_timeout_seconds: 120,
            default_job_timeout_seconds: 60,
            deals_per_sp_per_hour: 1.0,
            retrievals_per_sp_per_hour: 2.0,
            metrics_per_hour: 12.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation_unchanged() {
        let cfg = SchedulerConfig::default().validated();
        assert_eq!(cfg.poll_interval_seconds, 30);
        assert_eq!(cfg.catchup_max, 5);
    }

    #[test]
    fn sub_floor_poll_interval_is_clamped() {
        let cfg = SchedulerConfig {
            poll_interval_seconds: 0,
            ..SchedulerConfig::default()
        }
        .validated();
        assert_eq!(cfg.poll_interval_seconds, 1);
    }

    #[test]
    fn zero_catchup_max_is_clamped_to_one() {
        let cfg = SchedulerConfig {
            catchup_max: 0,
            ..SchedulerConfig::default()
        }
        .validated();
        assert_eq!(cfg.catchup_max, 1);
    }

    #[test]
    fn sub_floor_job_timeout_is_clamped() {
        let cfg = SchedulerConfig {
            deal_job_timeout_seconds: 1,
            ..SchedulerConfig::default()
        }
        .validated();
        assert_eq!(cfg.deal_job_timeout_seconds, SchedulerConfig::MIN_JOB_TIMEOUT_SECONDS);
    }

    #[test]
    fn job_timeout_seconds_is_per_job_type() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.job_timeout_seconds(JobType::Deal), cfg.deal_job_timeout_seconds);
        assert_eq!(cfg.job_timeout_seconds(JobType::Retrieval), cfg.retrieval_job_timeout_seconds);
        assert_eq!(cfg.job_timeout_seconds(JobType::Metrics), cfg.default_job_timeout_seconds);
    }

    #[test]
    fn rate_to_interval_rounds_to_nearest_whole_second() {
        assert_eq!(interval_seconds_for_rate_per_hour(1.0), 3600);
        assert_eq!(interval_seconds_for_rate_per_hour(2.0), 1800);
        assert_eq!(interval_seconds_for_rate_per_hour(12.0), 300);
        // 3600/7 = 514.28..., rounds to 514.
        assert_eq!(interval_seconds_for_rate_per_hour(7.0), 514);
    }

    #[test]
    fn rate_to_interval_floors_at_one_second() {
        assert_eq!(interval_seconds_for_rate_per_hour(100_000.0), 1);
    }

    #[test]
    fn non_positive_rate_clamps_to_the_slowest_interval() {
        assert_eq!(interval_seconds_for_rate_per_hour(0.0), MAX_DERIVED_INTERVAL_SECONDS);
        assert_eq!(interval_seconds_for_rate_per_hour(-5.0), MAX_DERIVED_INTERVAL_SECONDS);
    }

    #[test]
    fn run_mode_gates_scheduler_and_workers_per_spec_table() {
        assert!(!RunMode::Api.runs_scheduler());
        assert!(!RunMode::Api.runs_workers());
        assert!(!RunMode::Worker.runs_scheduler());
        assert!(RunMode::Worker.runs_workers());
        assert!(RunMode::Both.runs_scheduler());
        assert!(RunMode::Both.runs_workers());
    }
}
