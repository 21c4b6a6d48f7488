//! # provider-sched-core
//!
//! Domain types and trait seams for a persistent, rate-limited job scheduler
//! that turns a population of active storage-provider addresses into
//! discrete queued executions.
//!
//! ## Architecture
//!
//! ```text
//! ActiveProviderSource ──▶ Schedule Reconciler ──▶ job_schedule_state (Postgres)
//!                                                         │
//!                                                         ▼
//!                                                   Enqueue Loop
//!                                                         │
//!                                                         ▼ QueueAdapter::send
//!                                                   queue_job (Postgres)
//!                                                         │
//!                                                         ▼ QueueAdapter::work
//!                                                  Worker Runtime ──▶ WorkHandler
//!                                                         │
//!                                                         ▼
//!                                                  MetricsSink
//! ```
//!
//! ## Key Invariants
//!
//! 1. **At most one active/queued job per provider** — enforced by the
//!    queue's singleton policy, keyed by provider address.
//! 2. **Phase preservation** — `next_run_at` always advances by whole
//!    multiples of `interval_seconds`, never snapped to `now`.
//! 3. **No double-advance on failure** — a schedule row's `next_run_at` only
//!    moves forward in lockstep with a successful send.
//!
//! This crate owns interfaces and pure logic only. Storage-backed
//! implementations live in `provider-sched-postgres`; the tick loop and
//! worker runtime live in `provider-sched-runtime`.

pub mod error;
pub mod handler;
pub mod maintenance;
pub mod metrics;
pub mod model;
pub mod providers;
pub mod queue;

pub use error::SchedulerError;
pub use handler::{HandlerOutcome, WorkHandler};
pub use maintenance::{MaintenanceEvaluation, MaintenanceWindow, MaintenanceWindowEvaluator};
pub use metrics::MetricsSink;
pub use model::{JobType, MutexRow, QueueJob, ScheduleRow, GLOBAL_SCOPE};
pub use providers::ActiveProviderSource;
pub use queue::{QueueAdapter, QueuePolicy, SendOptions, SendOutcome, WorkOptions};

pub use async_trait::async_trait;
