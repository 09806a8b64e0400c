use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::defs::{DeliveryRecord, Destination, DestinationConfig, ItemStore};

/// Item store kept in process memory.
///
/// Nothing survives a restart, so this is only suitable for tests and
/// throwaway runs.
#[derive(Default)]
pub struct MemoryItemStore {
    records: RwLock<HashMap<String, DeliveryRecord>>,
    config: RwLock<Option<DestinationConfig>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_destination(destination: Destination) -> Self {
        let store = Self::new();
        *store.config.write().await = Some(DestinationConfig { news_channel: destination });
        store
    }

    pub async fn records(&self) -> Vec<DeliveryRecord> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn find_delivery_record(&self, entry_id: &str) -> Result<Option<DeliveryRecord>> {
        Ok(self.records.read().await.get(entry_id).cloned())
    }

    async fn insert_delivery_record(&self, record: &DeliveryRecord) -> Result<bool> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.entry_id) {
            return Ok(false);
        }
        records.insert(record.entry_id.clone(), record.clone());
        Ok(true)
    }

    async fn get_destination_config(&self) -> Result<Option<DestinationConfig>> {
        Ok(self.config.read().await.clone())
    }

    async fn set_destination_config(&self, destination: &Destination) -> Result<()> {
        *self.config.write().await = Some(DestinationConfig {
            news_channel: destination.clone(),
        });
        Ok(())
    }
}
