//! In-memory [`ActiveProviderSource`] double.

use provider_sched_core::{ActiveProviderSource, SchedulerError};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct FakeActiveProviderSource {
    addresses: Mutex<Vec<String>>,
}

impl FakeActiveProviderSource {
    pub fn new(addresses: Vec<String>) -> Self {
        FakeActiveProviderSource {
            addresses: Mutex::new(addresses),
        }
    }

    pub async fn set_active(&self, addresses: Vec<String>) {
        *self.addresses.lock().await = addresses;
    }
}

#[async_trait::async_trait]
impl ActiveProviderSource for FakeActiveProviderSource {
    async fn list_active_providers(&self) -> Result<Vec<String>, SchedulerError> {
        Ok(self.addresses.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_configured_addresses() {
        let source = FakeActiveProviderSource::new(vec!["f01".into(), "f02".into()]);
        let active = source.list_active_providers().await.unwrap();
        assert_eq!(active, vec!["f01".to_string(), "f02".to_string()]);
    }

    #[tokio::test]
    async fn set_active_replaces_the_snapshot() {
        let source = FakeActiveProviderSource::new(vec!["f01".into()]);
        source.set_active(vec![]).await;
        assert!(source.list_active_providers().await.unwrap().is_empty());
    }
}
