//! `job_mutex` persistence: the per-provider exclusion lock a worker
//! holds while a deal/retrieval probe is running.
//!
//! Grounded on the `ON CONFLICT ... WHERE` stale-takeover idiom used for
//! stalled-job recovery elsewhere in the ecosystem: a single upsert either
//! inserts a fresh lock row or steals one whose `acquired_at` is older
//! than the configured staleness threshold, and the caller tells the two
//! cases apart by `rows_affected()`.

use chrono::{DateTime, Duration, Utc};
use provider_sched_core::{JobType, SchedulerError};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgMutexStore {
    pool: PgPool,
}

impl PgMutexStore {
    pub fn new(pool: PgPool) -> Self {
        PgMutexStore { pool }
    }

    /// Attempt to acquire the mutex for `sp_address`. Succeeds if no lock
    /// row exists, or if the existing row is older than `stale_seconds`.
    /// Returns `true` if acquired.
    pub async fn acquire(
        &self,
        sp_address: &str,
        job_type: JobType,
        job_id: Uuid,
        hostname: &str,
        stale_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, SchedulerError> {
        let stale_cutoff = now - Duration::seconds(stale_seconds);

        let result = sqlx::query(
            r#"
            INSERT INTO job_mutex (sp_address, job_type, job_id, hostname, acquired_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (sp_address) DO UPDATE
                SET job_type = EXCLUDED.job_type,
                    job_id = EXCLUDED.job_id,
                    hostname = EXCLUDED.hostname,
                    acquired_at = EXCLUDED.acquired_at,
                    updated_at = NOW()
            WHERE job_mutex.acquired_at < $6
            "#,
        )
        .bind(sp_address)
        .bind(job_type.as_str())
        .bind(job_id)
        .bind(hostname)
        .bind(now)
        .bind(stale_cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Release the mutex, but only if it's still held by `job_id` — a
    /// worker whose lease already got stolen by a stale-recovery must not
    /// release the new holder's lock out from under it.
    pub async fn release(&self, sp_address: &str, job_id: Uuid) -> Result<bool, SchedulerError> {
        let result = sqlx::query(
            "DELETE FROM job_mutex WHERE sp_address = $1 AND job_id = $2",
        )
        .bind(sp_address)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
