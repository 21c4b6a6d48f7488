//! In-memory [`QueueAdapter`] double.

use std::collections::VecDeque;

use chrono::Utc;
use dashmap::DashMap;
use provider_sched_core::{QueueAdapter, QueueJob, SchedulerError, SendOptions, SendOutcome, WorkOptions};
use tokio::sync::Mutex;
use uuid::Uuid;

struct StoredJob {
    job: QueueJob,
    singleton_key: Option<String>,
}

/// A fake queue, sufficient for unit-testing the enqueue loop and worker
/// runtime. Not thread-contention-hardened the way the Postgres adapter
/// is — it's a test double, not a second production implementation.
#[derive(Default)]
pub struct FakeQueueAdapter {
    queues: DashMap<String, Mutex<VecDeque<StoredJob>>>,
    singleton_locks: DashMap<String, Uuid>,
}

impl FakeQueueAdapter {
    pub fn new() -> Self {
        FakeQueueAdapter {
            queues: DashMap::new(),
            singleton_locks: DashMap::new(),
        }
    }

    /// Count of jobs currently queued (not yet claimed) across all
    /// queues, for test assertions.
    pub async fn queued_count(&self) -> usize {
        let mut total = 0;
        for entry in self.queues.iter() {
            total += entry.value().lock().await.len();
        }
        total
    }
}

#[async_trait::async_trait]
impl QueueAdapter for FakeQueueAdapter {
    async fn create_queue(&self, queue_name: &str) -> Result<(), SchedulerError> {
        self.queues
            .entry(queue_name.to_string())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        Ok(())
    }

    async fn send(
        &self,
        queue_name: &str,
        payload: serde_json::Value,
        options: SendOptions,
    ) -> Result<SendOutcome, SchedulerError> {
        let job_id = Uuid::new_v4();

        if let Some(key) = &options.singleton_key {
            if self.singleton_locks.contains_key(key) {
                return Ok(SendOutcome::AlreadyQueued);
            }
            self.singleton_locks.insert(key.clone(), job_id);
        }

        let now = Utc::now();
        let job = QueueJob {
            id: job_id,
            queue_name: queue_name.to_string(),
            data: payload,
            created_at: now,
            started_at: now,
        };

        let queue = self
            .queues
            .entry(queue_name.to_string())
            .or_insert_with(|| Mutex::new(VecDeque::new()));
        queue.lock().await.push_back(StoredJob {
            job,
            singleton_key: options.singleton_key,
        });

        Ok(SendOutcome::Sent(job_id))
    }

    async fn work(&self, options: WorkOptions) -> Result<Option<QueueJob>, SchedulerError> {
        let Some(queue) = self.queues.get(&options.queue_name) else {
            return Ok(None);
        };
        let mut queue = queue.lock().await;
        Ok(queue.pop_front().map(|stored| stored.job))
    }

    async fn complete(&self, job_id: Uuid) -> Result<(), SchedulerError> {
        self.singleton_locks.retain(|_, v| *v != job_id);
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, _reason: &str) -> Result<(), SchedulerError> {
        self.complete(job_id).await
    }

    async fn count_states(&self) -> Result<Vec<(String, String, i64)>, SchedulerError> {
        let mut counts = Vec::new();
        for entry in self.queues.iter() {
            let queue = entry.value().lock().await;
            if !queue.is_empty() {
                counts.push((entry.key().clone(), "queued".to_string(), queue.len() as i64));
            }
        }
        Ok(counts)
    }

    async fn oldest_age_seconds(&self, state: &str) -> Result<Vec<(String, i64)>, SchedulerError> {
        if state != "queued" && state != "created" {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        let mut ages = Vec::new();
        for entry in self.queues.iter() {
            let queue = entry.value().lock().await;
            if let Some(oldest) = queue.front() {
                ages.push((entry.key().clone(), (now - oldest.job.created_at).num_seconds()));
            }
        }
        Ok(ages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider_sched_core::SendOptions;

    #[tokio::test]
    async fn send_then_work_round_trips_a_job() {
        let adapter = FakeQueueAdapter::new();
        adapter.create_queue("deal").await.unwrap();
        let outcome = adapter
            .send("deal", serde_json::json!({"sp_address": "f01"}), SendOptions::default())
            .await
            .unwrap();
        assert!(matches!(outcome, SendOutcome::Sent(_)));

        let claimed = adapter
            .work(WorkOptions {
                queue_name: "deal".to_string(),
                lease_seconds: 60,
            })
            .await
            .unwrap();
        assert!(claimed.is_some());
    }

    #[tokio::test]
    async fn singleton_key_collapses_second_send() {
        let adapter = FakeQueueAdapter::new();
        let opts = SendOptions {
            singleton_key: Some("deal:f01".to_string()),
            run_at: None,
        };
        let first = adapter
            .send("deal", serde_json::json!({}), opts.clone())
            .await
            .unwrap();
        let second = adapter.send("deal", serde_json::json!({}), opts).await.unwrap();

        assert!(matches!(first, SendOutcome::Sent(_)));
        assert_eq!(second, SendOutcome::AlreadyQueued);
    }

    #[tokio::test]
    async fn completing_a_job_releases_its_singleton_key() {
        let adapter = FakeQueueAdapter::new();
        let opts = SendOptions {
            singleton_key: Some("deal:f01".to_string()),
            run_at: None,
        };
        let job_id = match adapter.send("deal", serde_json::json!({}), opts.clone()).await.unwrap() {
            SendOutcome::Sent(id) => id,
            SendOutcome::AlreadyQueued => panic!("expected first send to succeed"),
        };
        adapter.complete(job_id).await.unwrap();

        let second = adapter.send("deal", serde_json::json!({}), opts).await.unwrap();
        assert!(matches!(second, SendOutcome::Sent(_)));
    }
}
