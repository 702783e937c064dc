// libs/calendar-sync-cell/src/store/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{SyncError, SyncRecord, SyncStatus};
use crate::store::SyncRecordStore;

/// In-process sync-record store. Used by tests and local runs; mirrors the
/// selection semantics of the SQL-backed store.
#[derive(Default)]
pub struct MemorySyncStore {
    records: RwLock<HashMap<Uuid, SyncRecord>>,
}

impl MemorySyncStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncRecordStore for MemorySyncStore {
    async fn create_sync_record(
        &self,
        booking_id: Uuid,
        max_attempts: i32,
    ) -> Result<SyncRecord, SyncError> {
        let record = SyncRecord::new(booking_id, max_attempts);
        let mut records = self.records.write().await;
        records.insert(booking_id, record.clone());
        Ok(record)
    }

    async fn get_by_booking(&self, booking_id: Uuid) -> Result<Option<SyncRecord>, SyncError> {
        let records = self.records.read().await;
        Ok(records.get(&booking_id).cloned())
    }

    async fn list_due_sync_records(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SyncRecord>, SyncError> {
        let records = self.records.read().await;
        let mut due: Vec<SyncRecord> = records
            .values()
            .filter(|r| matches!(r.status, SyncStatus::Error | SyncStatus::Retrying))
            .filter(|r| r.next_retry_at.is_some_and(|at| at <= now))
            .filter(|r| !r.attempts_exhausted())
            .cloned()
            .collect();
        due.sort_by_key(|r| r.next_retry_at);
        Ok(due)
    }

    async fn update_sync_record(&self, record: &SyncRecord) -> Result<(), SyncError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.booking_id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(SyncError::RecordNotFound),
        }
    }
}
