use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::StoredRecord;
use crate::store::{ProfileStore, StoreError};

/// Process-local store. Nothing survives a restart; used for local runs and tests.
#[derive(Default)]
pub struct MemoryProfileStore {
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, employee_number: &str) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self.records.read().await.get(employee_number).cloned())
    }

    async fn put(&self, record: &StoredRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.employee_number.clone(), record.clone());
        Ok(())
    }

    async fn check_ready(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileSnapshot;
    use chrono::{TimeZone, Utc};

    fn record(employee_number: &str, name: &str) -> StoredRecord {
        StoredRecord {
            employee_number: employee_number.to_string(),
            name: name.to_string(),
            last_interaction: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
            profile: ProfileSnapshot {
                age: 41,
                dependents: 2,
                ..Default::default()
            },
            recommendations: Some("Pick the PPO.".to_string()),
        }
    }

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let store = MemoryProfileStore::new();
        assert!(store.get("E00001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_get_returns_equal_record() {
        let store = MemoryProfileStore::new();
        let rec = record("E12345", "Alice");
        store.put(&rec).await.unwrap();
        assert_eq!(store.get("E12345").await.unwrap(), Some(rec));
    }

    #[tokio::test]
    async fn test_put_overwrites_whole_record() {
        let store = MemoryProfileStore::new();
        store.put(&record("E12345", "Alice")).await.unwrap();
        let mut second = record("E12345", "Alicia");
        second.recommendations = None;
        store.put(&second).await.unwrap();

        let got = store.get("E12345").await.unwrap().unwrap();
        assert_eq!(got.name, "Alicia");
        assert!(got.recommendations.is_none());
        assert_eq!(store.len().await, 1);
    }
}
