//! Data model shared by the schedule store, queue adapter, and runtime.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SchedulerError;

/// Sentinel `sp_address` used for global (non-per-provider) schedule rows.
pub const GLOBAL_SCOPE: &str = "";

/// The recognized job types.
///
/// This is an open enumeration in the spec's source system, but the core
/// treats any value it doesn't recognize as a fatal configuration error
/// (see spec §3) rather than silently falling back to a default — a typo in
/// a configured rate should fail loudly at startup, not schedule nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobType {
    /// Per-provider deal probe.
    Deal,
    /// Per-provider retrieval probe.
    Retrieval,
    /// Global metrics collection.
    Metrics,
    /// Global metrics cleanup/retention.
    MetricsCleanup,
    /// Global active-provider refresh.
    ProvidersRefresh,
}

impl JobType {
    /// Stable wire identifier, used as the queue name and the
    /// `job_schedule_state.job_type` column value.
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Deal => "deal",
            JobType::Retrieval => "retrieval",
            JobType::Metrics => "metrics",
            JobType::MetricsCleanup => "metrics_cleanup",
            JobType::ProvidersRefresh => "providers_refresh",
        }
    }

    /// Whether this job type is scoped to a single provider (`deal`,
    /// `retrieval`) versus global (everything else).
    pub fn is_per_provider(self) -> bool {
        matches!(self, JobType::Deal | JobType::Retrieval)
    }

    /// All global job types the reconciler must ensure exist.
    pub fn global_types() -> [JobType; 3] {
        [
            JobType::Metrics,
            JobType::MetricsCleanup,
            JobType::ProvidersRefresh,
        ]
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for JobType {
    type Error = SchedulerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deal" => Ok(JobType::Deal),
            "retrieval" => Ok(JobType::Retrieval),
            "metrics" => Ok(JobType::Metrics),
            "metrics_cleanup" => Ok(JobType::MetricsCleanup),
            "providers_refresh" => Ok(JobType::ProvidersRefresh),
            other => Err(SchedulerError::UnknownJobType(other.to_string())),
        }
    }
}

/// A row of `job_schedule_state`: one per `(job_type, sp_address)`.
#[derive(Debug, Clone)]
pub struct ScheduleRow {
    pub id: i64,
    pub job_type: JobType,
    /// Provider identifier, or [`GLOBAL_SCOPE`] for global jobs.
    pub sp_address: String,
    pub interval_seconds: i64,
    pub next_run_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub paused: bool,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleRow {
    /// True if this row is global (applies to no single provider).
    pub fn is_global(&self) -> bool {
        self.sp_address == GLOBAL_SCOPE
    }
}

/// A row of `job_mutex`: at most one per `sp_address`.
#[derive(Debug, Clone)]
pub struct MutexRow {
    pub sp_address: String,
    pub job_type: JobType,
    pub job_id: Uuid,
    pub hostname: String,
    pub acquired_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A job as seen by a worker after dequeue.
///
/// Opaque to the scheduler core beyond these fields — the payload shape is
/// defined by the handler contract (spec §6), not by this type.
#[derive(Debug, Clone)]
pub struct QueueJob {
    pub id: Uuid,
    pub queue_name: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_round_trips_through_str() {
        for jt in [
            JobType::Deal,
            JobType::Retrieval,
            JobType::Metrics,
            JobType::MetricsCleanup,
            JobType::ProvidersRefresh,
        ] {
            let s = jt.as_str();
            assert_eq!(JobType::try_from(s).unwrap(), jt);
        }
    }

    #[test]
    fn unknown_job_type_is_fatal() {
        let err = JobType::try_from("banana").unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownJobType(s) if s == "banana"));
    }

    #[test]
    fn only_deal_and_retrieval_are_per_provider() {
        assert!(JobType::Deal.is_per_provider());
        assert!(JobType::Retrieval.is_per_provider());
        assert!(!JobType::Metrics.is_per_provider());
        assert!(!JobType::MetricsCleanup.is_per_provider());
        assert!(!JobType::ProvidersRefresh.is_per_provider());
    }

    #[test]
    fn global_scope_sentinel_is_empty_string() {
        let row = ScheduleRow {
            id: 1,
            job_type: JobType::Metrics,
            sp_address: GLOBAL_SCOPE.to_string(),
            interval_seconds: 60,
            next_run_at: Utc::now(),
            last_run_at: None,
            paused: false,
            updated_at: Utc::now(),
        };
        assert!(row.is_global());
    }
}
