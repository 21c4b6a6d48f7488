//! `job_schedule_state` persistence.
//!
//! Modeled on `PgJobStore`'s query style (CTE + `FOR UPDATE SKIP LOCKED`,
//! plain `sqlx::query` with `Row::get` rather than the `query_as!` macro,
//! since `ScheduleRow` carries a domain enum the derive can't map
//! directly).

use chrono::{DateTime, Utc};
use provider_sched_core::{JobType, ScheduleRow, SchedulerError};
use sqlx::{PgPool, Postgres, Row, Transaction};

/// Owns `job_schedule_state`. Kept as a concrete type rather than a trait
/// (unlike [`crate::PgQueueAdapter`]) because its two core operations —
/// claiming due rows and advancing them — must share a single
/// transaction with the caller's enqueue attempt, so the trait boundary
/// would have to leak `Transaction` anyway.
#[derive(Clone)]
pub struct PgScheduleStore {
    pool: PgPool,
}

impl PgScheduleStore {
    pub fn new(pool: PgPool) -> Self {
        PgScheduleStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a schedule row if one doesn't already exist for
    /// `(job_type, sp_address)`; otherwise update `interval_seconds` and
    /// `updated_at` only. Returns `true` if a row was inserted.
    ///
    /// A freshly inserted row's `next_run_at` is exactly `first_run_at` —
    /// the caller decides whether that's "now" or "now plus the
    /// configured phase delay" (spec §4.4 step 3: phase applies only on
    /// insert, never on a later update). The update branch never touches
    /// `paused`, `next_run_at`, or `last_run_at` (spec §4.1, P5): a
    /// configuration-driven rate change must not reset an operator's pause
    /// or the schedule's phase.
    pub async fn upsert_schedule(
        &self,
        job_type: JobType,
        sp_address: &str,
        interval_seconds: i64,
        first_run_at: DateTime<Utc>,
    ) -> Result<bool, SchedulerError> {
        // `xmax = 0` is the standard Postgres tell for "this RETURNING row
        // came from the INSERT branch, not the UPDATE branch" of an upsert.
        let row = sqlx::query(
            r#"
            INSERT INTO job_schedule_state
                (job_type, sp_address, interval_seconds, next_run_at, paused, updated_at)
            VALUES ($1, $2, $3, $4, FALSE, NOW())
            ON CONFLICT (job_type, sp_address) DO UPDATE
                SET interval_seconds = EXCLUDED.interval_seconds,
                    updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(job_type.as_str())
        .bind(sp_address)
        .bind(interval_seconds)
        .bind(first_run_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("inserted"))
    }

    /// Remove schedule rows for providers no longer in `active_addresses`.
    ///
    /// Refuses to do anything when `active_addresses` is empty — an empty
    /// active set almost always means the upstream provider source failed
    /// to answer, and treating that as "every provider went inactive"
    /// would delete every schedule row in the fleet (spec §9 Open
    /// Question; resolved here by never exposing an unguarded variant).
    /// Global rows (`sp_address == GLOBAL_SCOPE`) are never touched by
    /// this method regardless.
    pub async fn delete_schedules_for_inactive_providers(
        &self,
        job_type: JobType,
        active_addresses: &[String],
    ) -> Result<u64, SchedulerError> {
        if active_addresses.is_empty() {
            tracing::warn!(
                job_type = job_type.as_str(),
                "refusing to delete per-provider schedules against an empty active set"
            );
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            DELETE FROM job_schedule_state
            WHERE job_type = $1
              AND sp_address <> ''
              AND sp_address <> ALL($2)
            "#,
        )
        .bind(job_type.as_str())
        .bind(active_addresses)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Claim up to `limit` non-paused rows whose `next_run_at <= now`,
    /// locking them against other ticking processes for the lifetime of
    /// `tx`. The caller must advance or release these rows before
    /// committing.
    pub async fn claim_due_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_type: JobType,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ScheduleRow>, SchedulerError> {
        let rows = sqlx::query(
            r#"
            SELECT id, job_type, sp_address, interval_seconds, next_run_at,
                   last_run_at, paused, updated_at
            FROM job_schedule_state
            WHERE job_type = $1
              AND NOT paused
              AND next_run_at <= $2
            ORDER BY next_run_at ASC
            LIMIT $3
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(job_type.as_str())
        .bind(now)
        .bind(limit)
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter().map(row_to_schedule).collect()
    }

    /// Advance a claimed row's `next_run_at`/`last_run_at` after a
    /// successful send. `new_next_run_at` must already reflect phase
    /// preservation (spec P?) — this method performs no arithmetic of its
    /// own, it just persists what the caller computed.
    pub async fn advance_after_send_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        new_next_run_at: DateTime<Utc>,
        ran_at: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        sqlx::query(
            r#"
            UPDATE job_schedule_state
            SET next_run_at = $1,
                last_run_at = $2,
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(new_next_run_at)
        .bind(ran_at)
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Count paused rows for a job type (used by the metrics collector).
    pub async fn count_paused(&self, job_type: JobType) -> Result<i64, SchedulerError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM job_schedule_state WHERE job_type = $1 AND paused",
        )
        .bind(job_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("n"))
    }

    /// Set or clear the `paused` flag for a single schedule row.
    pub async fn set_paused(
        &self,
        job_type: JobType,
        sp_address: &str,
        paused: bool,
    ) -> Result<(), SchedulerError> {
        sqlx::query(
            r#"
            UPDATE job_schedule_state
            SET paused = $1, updated_at = NOW()
            WHERE job_type = $2 AND sp_address = $3
            "#,
        )
        .bind(paused)
        .bind(job_type.as_str())
        .bind(sp_address)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_schedule(row: sqlx::postgres::PgRow) -> Result<ScheduleRow, SchedulerError> {
    let job_type_str: String = row.get("job_type");
    Ok(ScheduleRow {
        id: row.get("id"),
        job_type: JobType::try_from(job_type_str.as_str())?,
        sp_address: row.get("sp_address"),
        interval_seconds: row.get("interval_seconds"),
        next_run_at: row.get("next_run_at"),
        last_run_at: row.get("last_run_at"),
        paused: row.get("paused"),
        updated_at: row.get("updated_at"),
    })
}
