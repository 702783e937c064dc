// libs/scheduling-cell/src/store/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Patient, Practitioner, SchedulingError, TurnState};

mod memory;
mod supabase;

pub use memory::MemorySchedulingStore;
pub use supabase::SupabaseSchedulingStore;

/// Storage seam for the scheduling engine. Two operations carry atomicity
/// requirements: `create_booking` combines the conflict check and the insert
/// in one unit so "check then insert" is never a race window, and
/// `commit_turn_state` is a linearizable read-modify-write on the singleton
/// turn record.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn get_practitioner(&self, id: Uuid) -> Result<Option<Practitioner>, SchedulingError>;

    /// Active practitioners in rotation order.
    async fn list_practitioners(&self) -> Result<Vec<Practitioner>, SchedulingError>;

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, SchedulingError>;

    /// Confirmed bookings overlapping `[start, end)` for one practitioner,
    /// half-open rule: `existing.start < end && existing.end > start`.
    async fn list_confirmed_bookings_overlapping(
        &self,
        practitioner_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, SchedulingError>;

    /// Atomic conflict-checked insert. Exactly one of two racing calls for
    /// an overlapping window succeeds; the loser gets `Conflict`.
    async fn create_booking(
        &self,
        practitioner_id: Uuid,
        patient_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Booking, SchedulingError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, SchedulingError>;

    async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, SchedulingError>;

    async fn read_turn_state(&self) -> Result<TurnState, SchedulingError>;

    /// Atomically set `last_assigned` and bump the practitioner's counter.
    async fn commit_turn_state(&self, practitioner_id: Uuid) -> Result<TurnState, SchedulingError>;
}
