//! The work handler contract: the piece supplied by each job type
//! (deal probe, retrieval probe, metrics collection, ...) that the worker
//! runtime invokes once a job is claimed.

use tokio_util::sync::CancellationToken;

use crate::model::QueueJob;

/// The outcome of running a handler against a claimed job.
///
/// Deliberately coarser than the teacher's `FailureKind` retry split: per
/// spec §7.7, probe jobs are not retried individually — a failure is
/// logged and metered, and the next scheduled run is expected to cover the
/// same ground. `Aborted` exists separately from `Error` so the worker
/// runtime can distinguish "the handler ran and failed" from "the handler
/// never got to run" (e.g. cancelled by a maintenance window deadline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The handler completed its work successfully.
    Success,
    /// The handler ran and encountered an error; `reason` is recorded to
    /// the metrics sink and logs, not retried.
    Error { reason: String },
    /// The handler was cancelled before completing, e.g. because its
    /// provider entered a maintenance window or the worker is shutting
    /// down.
    Aborted { reason: String },
}

impl HandlerOutcome {
    /// Short label suitable for metric tags / log fields.
    pub fn label(&self) -> &'static str {
        match self {
            HandlerOutcome::Success => "success",
            HandlerOutcome::Error { .. } => "error",
            HandlerOutcome::Aborted { .. } => "aborted",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, HandlerOutcome::Success)
    }
}

/// Implemented once per job type and registered with the worker runtime.
///
/// Handlers are invoked with the raw [`QueueJob`] rather than a
/// pre-decoded payload type — each handler owns its own payload schema
/// and deserializes it itself, the way the teacher's `CommandRegistry`
/// leaves deserialization to the registered type rather than the caller.
#[async_trait::async_trait]
pub trait WorkHandler: Send + Sync {
    /// Stable identifier this handler is registered under (matches a
    /// [`crate::model::JobType::as_str`] value).
    fn job_type(&self) -> &'static str;

    /// Execute the job. `cancel` is fused to the job's configured timeout
    /// and the worker's shutdown signal; implementations that do blocking
    /// or long-running I/O should poll it at safe points and return early
    /// when it fires. A handler that ignores `cancel` still runs to
    /// completion, but the worker runtime races the future against the
    /// same deadline and records `aborted` if it doesn't finish in time.
    async fn handle(&self, job: &QueueJob, cancel: &CancellationToken) -> HandlerOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels_are_stable() {
        assert_eq!(HandlerOutcome::Success.label(), "success");
        assert_eq!(
            HandlerOutcome::Error {
                reason: "boom".into()
            }
            .label(),
            "error"
        );
        assert_eq!(
            HandlerOutcome::Aborted {
                reason: "maintenance window".into()
            }
            .label(),
            "aborted"
        );
    }

    #[test]
    fn only_success_reports_is_success() {
        assert!(HandlerOutcome::Success.is_success());
        assert!(!HandlerOutcome::Error {
            reason: "x".into()
        }
        .is_success());
        assert!(!HandlerOutcome::Aborted {
            reason: "x".into()
        }
        .is_success());
    }
}
