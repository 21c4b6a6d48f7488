//! Enqueue Loop: finds due schedule rows, sends one queue job per due
//! run (applying catch-up/spread), and advances `next_run_at`.
//!
//! The schedule claim and its advance share one transaction, so a crash
//! mid-loop leaves `next_run_at` untouched and the row gets re-claimed
//! next tick. The queue send itself is a separate transaction against the
//! queue adapter — a crash between a successful send and the schedule
//! advance can re-send the same run on the next tick. The queue's
//! singleton key absorbs that: a re-send for a still-queued-or-running
//! job collapses to [`SendOutcome::AlreadyQueued`] rather than duplicating
//! work.

use provider_sched_core::{JobType, QueueAdapter, SchedulerError, SendOptions, SendOutcome};
use provider_sched_postgres::PgScheduleStore;

use crate::catchup::plan_catchup;
use crate::config::SchedulerConfig;

#[derive(Debug, Clone, Copy, Default)]
pub struct EnqueueReport {
    pub rows_claimed: usize,
    pub jobs_sent: u64,
    pub jobs_already_queued: u64,
    pub runs_skipped: i64,
}

pub struct EnqueueLoop<Q> {
    store: PgScheduleStore,
    queue: Q,
}

impl<Q: QueueAdapter> EnqueueLoop<Q> {
    pub fn new(store: PgScheduleStore, queue: Q) -> Self {
        EnqueueLoop { store, queue }
    }

    /// Run one pass for a single job type. Per-provider job types key on
    /// `{job_type}:{sp_address}` so the singleton constraint is scoped per
    /// provider; global job types send with no singleton key at all, since
    /// there is exactly one schedule row for them and nothing to dedup
    /// against.
    pub async fn run_once(
        &self,
        job_type: JobType,
        config: &SchedulerConfig,
    ) -> Result<EnqueueReport, SchedulerError> {
        let now = chrono::Utc::now();
        let mut report = EnqueueReport::default();

        let mut tx = self.store.pool().begin().await?;
        let due = self
            .store
            .claim_due_in_tx(&mut tx, job_type, now, config.claim_batch_size)
            .await?;
        report.rows_claimed = due.len();

        for row in due {
            let Some(plan) = plan_catchup(
                row.next_run_at,
                row.interval_seconds,
                now,
                config.catchup_max,
                config.spread_seconds,
            ) else {
                continue;
            };
            report.runs_skipped += plan.runs_skipped;

            // Advance by the number of sends that actually succeeded, not
            // by the full planned burst (spec §4.5 steps 6-7 / P1 / P3): a
            // singleton collision or transport rejection must not move
            // `next_run_at` for that slot, or the next tick would never
            // re-evaluate it.
            let mut successes: i64 = 0;
            for run_at in &plan.run_ats {
                // Global jobs (spec §4.5 step 5) set no singleton key —
                // there is only ever one schedule row for them, so there is
                // nothing to dedup against.
                let singleton_key = job_type
                    .is_per_provider()
                    .then(|| format!("{}:{}", job_type.as_str(), row.sp_address));
                let payload = serde_json::json!({
                    "job_type": job_type.as_str(),
                    "sp_address": row.sp_address,
                    "scheduled_for": run_at.to_rfc3339(),
                });
                let options = SendOptions {
                    singleton_key,
                    run_at: Some(*run_at),
                };

                match self.queue.send(job_type.as_str(), payload, options).await? {
                    SendOutcome::Sent(_) => {
                        report.jobs_sent += 1;
                        successes += 1;
                    }
                    SendOutcome::AlreadyQueued => report.jobs_already_queued += 1,
                }
            }

            if successes > 0 {
                let new_next_run_at = row.next_run_at + chrono::Duration::seconds(successes * row.interval_seconds);
                self.store
                    .advance_after_send_in_tx(&mut tx, row.id, new_next_run_at, now)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(report)
    }
}
