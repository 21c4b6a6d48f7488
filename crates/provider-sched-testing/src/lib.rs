//! In-memory test doubles for the scheduler's trait seams, so
//! `provider-sched-runtime`'s orchestration logic can be exercised without
//! a live Postgres instance — the same split the teacher's own
//! `seesaw-testing` crate draws between framework and storage-backed
//! tests.

pub mod metrics;
pub mod providers;
pub mod queue;

pub use metrics::RecordingMetricsSink;
pub use providers::FakeActiveProviderSource;
pub use queue::FakeQueueAdapter;
