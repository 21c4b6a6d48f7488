//! Error taxonomy for the scheduler, keyed by failure *kind* (spec §7)
//! rather than by call site, mirroring the teacher's `SeesawError` shape.

use thiserror::Error;

/// Errors surfaced by the scheduler's core components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A schedule row or configured rate named a job type the running
    /// binary was never built to recognize. Fatal by design (spec §3): a
    /// typo in configuration should fail loudly rather than silently
    /// schedule nothing.
    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    /// A transient database failure (connection loss, deadlock, timeout).
    /// Callers should let the current tick/job fail and retry next cycle.
    #[error("transient database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The queue rejected a send because a job with this singleton key is
    /// already active-or-queued. Not an error in the exceptional sense —
    /// it's the mechanism that enforces P2 — but it must not advance the
    /// schedule row's `next_run_at` for that slot.
    #[error("singleton collision on key {0}")]
    SingletonCollision(String),

    /// The queue rejected a send for any other transport reason.
    #[error("queue send failed: {0}")]
    QueueSend(#[source] anyhow::Error),

    /// A per-provider job could not acquire its database mutex before the
    /// caller gave up (the mutex is held and not yet stale).
    #[error("mutex held for provider {sp_address}")]
    MutexContention { sp_address: String },

    /// The reconciler or enqueue loop was asked to operate on an empty
    /// active-provider set in a context that does not guard against it.
    #[error("active provider set was empty and the caller did not opt into that")]
    EmptyActiveProviderSet,

    /// The queue adapter (or its backing connection pool) failed to start.
    #[error("queue adapter failed to start: {0}")]
    QueueStartup(#[source] anyhow::Error),
}
