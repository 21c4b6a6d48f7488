//! Tick loop, reconciliation, and worker runtime wiring for the provider
//! fleet job scheduler. Storage-backed types come from
//! `provider-sched-postgres`; this crate owns the orchestration that ties
//! them to the trait seams declared in `provider-sched-core`.

pub mod catchup;
pub mod config;
pub mod enqueue;
pub mod metrics_collector;
pub mod reconciler;
pub mod scheduler;
pub mod single_flight;
pub mod worker;

pub use catchup::{plan_catchup, CatchupPlan};
pub use config::{RunMode, SchedulerConfig};
pub use enqueue::{EnqueueLoop, EnqueueReport};
pub use metrics_collector::MetricsCollector;
pub use reconciler::{GlobalJobRate, PerProviderJobRate, ReconcileReport, ScheduleReconciler};
pub use scheduler::Scheduler;
pub use single_flight::{TickGuard, TickSingleFlight};
pub use worker::{MaintenanceWindows, WorkerRuntime};
