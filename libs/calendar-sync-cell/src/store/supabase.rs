// libs/calendar-sync-cell/src/store/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{SyncError, SyncRecord};
use crate::store::SyncRecordStore;

pub struct SupabaseSyncStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseSyncStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn returning_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}

#[async_trait]
impl SyncRecordStore for SupabaseSyncStore {
    async fn create_sync_record(
        &self,
        booking_id: Uuid,
        max_attempts: i32,
    ) -> Result<SyncRecord, SyncError> {
        let record = SyncRecord::new(booking_id, max_attempts);

        let result: Vec<SyncRecord> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/sync_records",
                Some(serde_json::to_value(&record).map_err(|e| SyncError::Storage(e.to_string()))?),
                Some(Self::returning_headers()),
            )
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::Storage("sync record insert returned no rows".to_string()))
    }

    async fn get_by_booking(&self, booking_id: Uuid) -> Result<Option<SyncRecord>, SyncError> {
        let path = format!("/rest/v1/sync_records?booking_id=eq.{}&limit=1", booking_id);
        let result: Vec<SyncRecord> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    async fn list_due_sync_records(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SyncRecord>, SyncError> {
        // PostgREST cannot compare two columns, so the attempt budget is
        // filtered client-side after the status/due-time selection.
        let path = format!(
            "/rest/v1/sync_records?status=in.(error,retrying)&next_retry_at=lte.{}&order=next_retry_at.asc",
            now.to_rfc3339()
        );
        let result: Vec<SyncRecord> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        Ok(result.into_iter().filter(|r| !r.attempts_exhausted()).collect())
    }

    async fn update_sync_record(&self, record: &SyncRecord) -> Result<(), SyncError> {
        let path = format!("/rest/v1/sync_records?id=eq.{}", record.id);
        let body = json!({
            "external_event_id": record.external_event_id,
            "status": record.status,
            "attempt_count": record.attempt_count,
            "last_attempt_at": record.last_attempt_at,
            "next_retry_at": record.next_retry_at,
            "last_error": record.last_error,
            "updated_at": Utc::now(),
        });

        let _: Vec<Value> = self
            .supabase
            .request(Method::PATCH, &path, Some(body))
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        Ok(())
    }
}
