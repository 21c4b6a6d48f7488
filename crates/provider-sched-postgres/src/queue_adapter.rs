//! PostgreSQL implementation of [`QueueAdapter`].
//!
//! Claiming follows `PgJobStore::claim_ready`'s CTE shape. Singleton
//! exclusion (spec P2) is synthesized on top of a plain queue table via an
//! auxiliary `queue_singleton_lock` table, since `queue_job` carries no
//! native uniqueness constraint on its own — the insert and the lock
//! claim happen in one transaction so a collision is visible atomically.

use chrono::{Duration, Utc};
use provider_sched_core::{QueueAdapter, QueueJob, SchedulerError, SendOptions, SendOutcome, WorkOptions};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgQueueAdapter {
    pool: PgPool,
}

impl PgQueueAdapter {
    pub fn new(pool: PgPool) -> Self {
        PgQueueAdapter { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl QueueAdapter for PgQueueAdapter {
    async fn create_queue(&self, _queue_name: &str) -> Result<(), SchedulerError> {
        // queue_job has no per-queue schema object to provision; the
        // queue name is just a column value. Kept as an explicit no-op
        // method (rather than omitted) so callers that loop over job
        // types at startup have one call site regardless of adapter.
        Ok(())
    }

    async fn send(
        &self,
        queue_name: &str,
        payload: serde_json::Value,
        options: SendOptions,
    ) -> Result<SendOutcome, SchedulerError> {
        let job_id = Uuid::new_v4();
        let run_at = options.run_at.unwrap_or_else(Utc::now);

        let mut tx = self.pool.begin().await?;

        if let Some(key) = &options.singleton_key {
            let locked = sqlx::query(
                "INSERT INTO queue_singleton_lock (singleton_key, job_id) VALUES ($1, $2) \
                 ON CONFLICT (singleton_key) DO NOTHING",
            )
            .bind(key)
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

            if locked.rows_affected() == 0 {
                // Someone else already holds this key's slot. The
                // existing job (queued or running) stands in for this
                // send; the caller treats that as equivalent to success.
                tx.rollback().await?;
                return Ok(SendOutcome::AlreadyQueued);
            }
        }

        sqlx::query(
            r#"
            INSERT INTO queue_job (id, queue_name, data, status, run_at, created_at)
            VALUES ($1, $2, $3, 'queued', $4, NOW())
            "#,
        )
        .bind(job_id)
        .bind(queue_name)
        .bind(&payload)
        .bind(run_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SendOutcome::Sent(job_id))
    }

    async fn work(&self, options: WorkOptions) -> Result<Option<QueueJob>, SchedulerError> {
        let lease_expires_at = Utc::now() + Duration::seconds(options.lease_seconds);

        let row = sqlx::query(
            r#"
            WITH claimable AS (
                SELECT id
                FROM queue_job
                WHERE queue_name = $1
                  AND status = 'queued'
                  AND run_at <= NOW()
                ORDER BY run_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE queue_job
            SET status = 'running',
                lease_expires_at = $2,
                started_at = NOW()
            WHERE id IN (SELECT id FROM claimable)
            RETURNING id, queue_name, data, created_at, started_at
            "#,
        )
        .bind(&options.queue_name)
        .bind(lease_expires_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| QueueJob {
            id: row.get("id"),
            queue_name: row.get("queue_name"),
            data: row.get("data"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
        }))
    }

    async fn complete(&self, job_id: Uuid) -> Result<(), SchedulerError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM queue_job WHERE id = $1")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM queue_singleton_lock WHERE job_id = $1")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, reason: &str) -> Result<(), SchedulerError> {
        // Probe jobs aren't retried individually (spec §7.7) — a failure
        // just releases the job and its singleton slot so the next
        // scheduled send for that provider isn't blocked by a dead claim.
        tracing::warn!(job_id = %job_id, reason, "queue job failed, not retrying");
        self.complete(job_id).await
    }

    // States map 1:1 onto the `queue_job.status` column except "active",
    // which is this adapter's internal "running" status name. There is no
    // "retry" status: retry_limit is always 0 (spec §4.2), so no job of
    // this adapter's ever re-enters a queued state after a failure.
    async fn count_states(&self) -> Result<Vec<(String, String, i64)>, SchedulerError> {
        let rows = sqlx::query(
            r#"
            SELECT queue_name, status, COUNT(*) AS n
            FROM queue_job
            GROUP BY queue_name, status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("queue_name"), row.get("status"), row.get("n")))
            .collect())
    }

    async fn oldest_age_seconds(&self, state: &str) -> Result<Vec<(String, i64)>, SchedulerError> {
        let status = match state {
            "active" => "running",
            other => other,
        };
        let rows = sqlx::query(
            r#"
            SELECT queue_name,
                   EXTRACT(EPOCH FROM (NOW() - MIN(created_at)))::bigint AS age_seconds
            FROM queue_job
            WHERE status = $1
            GROUP BY queue_name
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("queue_name"), row.get("age_seconds")))
            .collect())
    }
}
