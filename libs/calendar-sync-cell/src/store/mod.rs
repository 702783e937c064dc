// libs/calendar-sync-cell/src/store/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{BookingSyncContext, SyncError, SyncRecord};

mod memory;
mod supabase;

pub use memory::MemorySyncStore;
pub use supabase::SupabaseSyncStore;

/// Persistence seam for sync records. One record per booking.
#[async_trait]
pub trait SyncRecordStore: Send + Sync {
    async fn create_sync_record(
        &self,
        booking_id: Uuid,
        max_attempts: i32,
    ) -> Result<SyncRecord, SyncError>;

    async fn get_by_booking(&self, booking_id: Uuid) -> Result<Option<SyncRecord>, SyncError>;

    /// Records eligible for a retry attempt: status in {error, retrying},
    /// due, and not yet exhausted.
    async fn list_due_sync_records(&self, now: DateTime<Utc>) -> Result<Vec<SyncRecord>, SyncError>;

    async fn update_sync_record(&self, record: &SyncRecord) -> Result<(), SyncError>;
}

/// Resolves the booking-side details needed to rebuild an event payload when
/// a retry runs long after the original confirmation.
#[async_trait]
pub trait BookingContextSource: Send + Sync {
    async fn booking_context(&self, booking_id: Uuid) -> Result<BookingSyncContext, SyncError>;
}
