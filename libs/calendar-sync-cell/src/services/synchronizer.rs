// libs/calendar-sync-cell/src/services/synchronizer.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    BookingSyncContext, CalendarEvent, SyncConfig, SyncError, SyncRecord, SyncStatus,
};
use crate::provider::CalendarProvider;
use crate::store::SyncRecordStore;

/// Projects confirmed bookings into the external calendar. The internal
/// booking record stays authoritative: a failed or slow projection is
/// captured on the sync record and retried later, never surfaced to the
/// booking path.
pub struct HybridSynchronizer {
    provider: Arc<dyn CalendarProvider>,
    records: Arc<dyn SyncRecordStore>,
    config: SyncConfig,
}

impl HybridSynchronizer {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        records: Arc<dyn SyncRecordStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            provider,
            records,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Build the external event payload. Only name, phone and booking id are
    /// legible on the calendar surface.
    pub fn build_event(ctx: &BookingSyncContext, timezone: &str) -> CalendarEvent {
        let phone = ctx.patient_phone.as_deref().unwrap_or("n/a");
        let description = format!(
            "Patient: {}\nTel: {}\nPractitioner: {}\n\nBooking ID: {}\nSystem: clinic-scheduler",
            ctx.patient_name, phone, ctx.practitioner_name, ctx.booking_id
        );

        let mut private_properties = HashMap::new();
        private_properties.insert("booking_id".to_string(), ctx.booking_id.to_string());
        private_properties.insert("system".to_string(), "clinic-scheduler".to_string());

        CalendarEvent {
            summary: format!("Consultation - {}", ctx.patient_name),
            description,
            start_time: ctx.start_time,
            end_time: ctx.end_time,
            timezone: timezone.to_string(),
            private_properties,
            color_id: Some("11".to_string()),
        }
    }

    /// One bounded insert attempt against the provider. A timeout is a
    /// failure like any other; the caller decides what to do with the record.
    pub async fn attempt_insert(&self, ctx: &BookingSyncContext) -> Result<String, SyncError> {
        let event = Self::build_event(ctx, &self.config.timezone);
        let budget = std::time::Duration::from_secs(self.config.insert_timeout_seconds);

        match timeout(budget, self.provider.insert_event(&self.config.calendar_id, &event)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout {
                seconds: self.config.insert_timeout_seconds,
            }),
        }
    }

    /// First synchronization pass, run right after a booking is confirmed.
    /// Creates the sync record, makes one insert attempt, and records the
    /// outcome. Returns the record in its post-attempt state; provider
    /// failures are data here, not errors.
    pub async fn sync_booking(&self, ctx: &BookingSyncContext) -> Result<SyncRecord, SyncError> {
        let mut record = self
            .records
            .create_sync_record(ctx.booking_id, self.config.max_attempts)
            .await?;

        let now = Utc::now();
        record.attempt_count = 1;
        record.last_attempt_at = Some(now);

        match self.attempt_insert(ctx).await {
            Ok(event_id) => {
                info!(
                    "Booking {} projected to calendar as event {}",
                    ctx.booking_id, event_id
                );
                record.status = SyncStatus::Synced;
                record.external_event_id = Some(event_id);
                record.next_retry_at = None;
                record.last_error = None;
            }
            Err(e) => {
                warn!(
                    "Calendar projection failed for booking {}: {} (queued for retry)",
                    ctx.booking_id, e
                );
                record.status = SyncStatus::Error;
                record.last_error = Some(e.to_string());
                record.next_retry_at =
                    Some(now + Duration::minutes(self.config.retry_interval_minutes));
            }
        }

        self.records.update_sync_record(&record).await?;
        debug!(
            "Sync record for booking {} now {}",
            ctx.booking_id, record.status
        );

        Ok(record)
    }

    pub async fn record_for(&self, booking_id: Uuid) -> Result<Option<SyncRecord>, SyncError> {
        self.records.get_by_booking(booking_id).await
    }
}
