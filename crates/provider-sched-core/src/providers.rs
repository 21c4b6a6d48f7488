//! The external collaborator the Schedule Reconciler consults to learn
//! which providers are currently active. Owned by whatever system tracks
//! the provider fleet; the scheduler only depends on this trait.

use crate::error::SchedulerError;

/// Supplies the current set of active storage-provider addresses.
///
/// Implementations are expected to be cheap to call repeatedly (the
/// reconciler calls this once per tick) and to return a consistent
/// snapshot rather than a partial/paginated view.
#[async_trait::async_trait]
pub trait ActiveProviderSource: Send + Sync {
    /// The addresses of all providers that should have schedule rows for
    /// every per-provider job type. An empty result is valid (spec §5
    /// "empty active set") and must not be treated as an error by the
    /// reconciler itself — callers that need to distinguish "no providers"
    /// from "source unavailable" should use [`SchedulerError::Database`]
    /// or a transport error for the latter.
    async fn list_active_providers(&self) -> Result<Vec<String>, SchedulerError>;
}
