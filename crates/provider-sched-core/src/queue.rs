//! The queue seam between the enqueue loop and the worker runtime.
//!
//! Modeled on the teacher's `JobQueue`/`JobStore` split: `send` is the
//! producer side (called from the enqueue loop), `work` is the consumer
//! side (called from the worker runtime's claim loop). Unlike the
//! teacher's generic job queue, sends here can be rejected for a specific,
//! non-exceptional reason — a singleton collision — so `send` returns a
//! [`SendOutcome`] rather than just `Result<Uuid>`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::model::QueueJob;

/// How a queue enforces "at most one active-or-queued job" for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// No exclusion — every send is accepted and queued independently.
    Unbounded,
    /// Reject a send if a job with the same singleton key is already
    /// queued or running (spec P2). The key is the queue/provider pair.
    Singleton,
}

/// Options accompanying a single `send`.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Dedup/exclusion key, typically `{job_type}:{sp_address}`. Required
    /// when the adapter's policy is [`QueuePolicy::Singleton`]; ignored
    /// otherwise.
    pub singleton_key: Option<String>,
    /// Earliest time the job becomes eligible for claim. `None` means
    /// immediately eligible.
    pub run_at: Option<DateTime<Utc>>,
}

impl Default for SendOptions {
    fn default() -> Self {
        SendOptions {
            singleton_key: None,
            run_at: None,
        }
    }
}

/// Result of a single `send` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The job was accepted and queued under this id.
    Sent(Uuid),
    /// Rejected: a job with this singleton key is already active-or-queued.
    /// The caller (the enqueue loop) must NOT treat this as a successful
    /// send (spec §4.5 steps 6-7, §7.2) — `next_run_at` only advances for
    /// runs that actually land a new job. The existing job covers the slot
    /// this send would have occupied; the schedule row simply isn't moved
    /// forward for it.
    AlreadyQueued,
}

/// Options controlling a single claim attempt against `work`.
#[derive(Debug, Clone)]
pub struct WorkOptions {
    /// Queue name to claim from (mirrors `job_type.as_str()`).
    pub queue_name: String,
    /// Lease duration granted to the claiming worker. The adapter is
    /// responsible for making the job reclaimable again once this elapses
    /// without a completion signal.
    pub lease_seconds: i64,
}

/// The queue adapter trait implemented against Postgres in
/// `provider-sched-postgres`, and faked in-memory in
/// `provider-sched-testing`.
#[async_trait::async_trait]
pub trait QueueAdapter: Send + Sync {
    /// Ensure a queue with this name exists (idempotent). Called once per
    /// job type during startup/reconciliation, mirroring the teacher's
    /// lazy-create-on-first-use pattern but made explicit since the
    /// scheduler knows its full job type set up front.
    async fn create_queue(&self, queue_name: &str) -> Result<(), SchedulerError>;

    /// Enqueue a job payload onto `queue_name`.
    async fn send(
        &self,
        queue_name: &str,
        payload: serde_json::Value,
        options: SendOptions,
    ) -> Result<SendOutcome, SchedulerError>;

    /// Claim up to one job from `queue_name`, if any is eligible.
    async fn work(&self, options: WorkOptions) -> Result<Option<QueueJob>, SchedulerError>;

    /// Acknowledge successful completion of a claimed job.
    async fn complete(&self, job_id: Uuid) -> Result<(), SchedulerError>;

    /// Return a claimed job to the queue for retry (or drop it, at the
    /// adapter's discretion — retry policy for probe jobs is "let the next
    /// scheduled run cover it" per spec §7.7, not per-job backoff).
    async fn fail(&self, job_id: Uuid, reason: &str) -> Result<(), SchedulerError>;

    /// Counts of jobs per `(queue_name, state)`, where state is one of
    /// `"queued"`, `"running"` (the "active" state in spec vocabulary).
    /// Backs the Metrics Collector's per-job-type queue gauges (spec
    /// §4.7). An adapter with no rows in a state simply omits that tuple
    /// rather than returning a zero count.
    async fn count_states(&self) -> Result<Vec<(String, String, i64)>, SchedulerError>;

    /// For every `(queue_name)` with at least one job in `state`, the age
    /// in seconds of its oldest job. Backs `oldest_queued_age_seconds` /
    /// `oldest_in_flight_age_seconds`.
    async fn oldest_age_seconds(&self, state: &str) -> Result<Vec<(String, i64)>, SchedulerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_send_options_have_no_run_at_or_key() {
        let opts = SendOptions::default();
        assert!(opts.singleton_key.is_none());
        assert!(opts.run_at.is_none());
    }

    #[test]
    fn send_outcome_variants_are_distinguishable() {
        let sent = SendOutcome::Sent(Uuid::nil());
        assert_ne!(sent, SendOutcome::AlreadyQueued);
    }
}
