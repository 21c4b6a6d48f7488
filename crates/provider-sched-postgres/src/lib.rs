//! PostgreSQL-backed persistence for the provider fleet job scheduler.
//!
//! # Database Schema
//!
//! ```sql
//! CREATE TABLE job_schedule_state (
//!     id               BIGSERIAL PRIMARY KEY,
//!     job_type         TEXT NOT NULL,
//!     sp_address       TEXT NOT NULL DEFAULT '',
//!     interval_seconds BIGINT NOT NULL CHECK (interval_seconds >= 1),
//!     next_run_at      TIMESTAMPTZ NOT NULL,
//!     last_run_at      TIMESTAMPTZ,
//!     paused           BOOLEAN NOT NULL DEFAULT FALSE,
//!     updated_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     UNIQUE (job_type, sp_address)
//! );
//!
//! CREATE INDEX idx_job_schedule_state_due
//!     ON job_schedule_state (job_type, next_run_at)
//!     WHERE NOT paused;
//!
//! CREATE TABLE job_mutex (
//!     sp_address  TEXT PRIMARY KEY,
//!     job_type    TEXT NOT NULL,
//!     job_id      UUID NOT NULL,
//!     hostname    TEXT NOT NULL,
//!     acquired_at TIMESTAMPTZ NOT NULL,
//!     updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE queue_job (
//!     id               UUID PRIMARY KEY,
//!     queue_name       TEXT NOT NULL,
//!     data             JSONB NOT NULL,
//!     status           TEXT NOT NULL DEFAULT 'queued',
//!     run_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     lease_expires_at TIMESTAMPTZ,
//!     created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     started_at       TIMESTAMPTZ
//! );
//!
//! CREATE INDEX idx_queue_job_claimable
//!     ON queue_job (queue_name, run_at)
//!     WHERE status = 'queued';
//!
//! -- Enforces "at most one active-or-queued job per singleton key"
//! -- (spec P2) since queue_job itself carries no uniqueness constraint.
//! CREATE TABLE queue_singleton_lock (
//!     singleton_key TEXT PRIMARY KEY,
//!     job_id        UUID NOT NULL
//! );
//! ```

mod mutex;
mod queue_adapter;
mod schedule_store;

pub use mutex::PgMutexStore;
pub use queue_adapter::PgQueueAdapter;
pub use schedule_store::PgScheduleStore;
