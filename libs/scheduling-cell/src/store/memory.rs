// libs/scheduling-cell/src/store/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use calendar_sync_cell::{BookingContextSource, BookingSyncContext, SyncError};

use crate::models::{Booking, BookingStatus, Patient, Practitioner, SchedulingError, TurnState};
use crate::store::SchedulingStore;

struct MemoryState {
    practitioners: Vec<Practitioner>,
    patients: HashMap<Uuid, Patient>,
    bookings: Vec<Booking>,
    turn_state: TurnState,
}

/// In-process store. A single lock around the whole state gives the same
/// guarantees the SQL functions give in production: conflict check + insert
/// happen in one critical section, and turn commits are serialized.
pub struct MemorySchedulingStore {
    inner: Mutex<MemoryState>,
}

impl MemorySchedulingStore {
    pub fn new(practitioners: Vec<Practitioner>) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                practitioners,
                patients: HashMap::new(),
                bookings: Vec::new(),
                turn_state: TurnState::default(),
            }),
        }
    }

    pub async fn add_patient(&self, patient: Patient) {
        let mut state = self.inner.lock().await;
        state.patients.insert(patient.id, patient);
    }

    fn overlaps(booking: &Booking, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        booking.start_time < end && booking.end_time > start
    }
}

#[async_trait]
impl SchedulingStore for MemorySchedulingStore {
    async fn get_practitioner(&self, id: Uuid) -> Result<Option<Practitioner>, SchedulingError> {
        let state = self.inner.lock().await;
        Ok(state.practitioners.iter().find(|p| p.id == id).cloned())
    }

    async fn list_practitioners(&self) -> Result<Vec<Practitioner>, SchedulingError> {
        let state = self.inner.lock().await;
        Ok(state
            .practitioners
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, SchedulingError> {
        let state = self.inner.lock().await;
        Ok(state.patients.get(&id).cloned())
    }

    async fn list_confirmed_bookings_overlapping(
        &self,
        practitioner_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, SchedulingError> {
        let state = self.inner.lock().await;
        Ok(state
            .bookings
            .iter()
            .filter(|b| {
                b.practitioner_id == practitioner_id
                    && b.status == BookingStatus::Confirmed
                    && Self::overlaps(b, start, end)
            })
            .cloned()
            .collect())
    }

    async fn create_booking(
        &self,
        practitioner_id: Uuid,
        patient_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Booking, SchedulingError> {
        let mut state = self.inner.lock().await;

        // Conflict check and insert under the same lock.
        if let Some(existing) = state.bookings.iter().find(|b| {
            b.practitioner_id == practitioner_id
                && b.status == BookingStatus::Confirmed
                && Self::overlaps(b, start, end)
        }) {
            return Err(SchedulingError::Conflict {
                booking_id: existing.id,
            });
        }

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            practitioner_id,
            patient_id,
            start_time: start,
            end_time: end,
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        state.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, SchedulingError> {
        let state = self.inner.lock().await;
        Ok(state.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, SchedulingError> {
        let mut state = self.inner.lock().await;
        let booking = state
            .bookings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(SchedulingError::BookingNotFound)?;
        booking.status = status;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn read_turn_state(&self) -> Result<TurnState, SchedulingError> {
        let state = self.inner.lock().await;
        Ok(state.turn_state.clone())
    }

    async fn commit_turn_state(&self, practitioner_id: Uuid) -> Result<TurnState, SchedulingError> {
        let mut state = self.inner.lock().await;
        state.turn_state.last_assigned = Some(practitioner_id);
        *state
            .turn_state
            .assignment_counts
            .entry(practitioner_id)
            .or_insert(0) += 1;
        state.turn_state.updated_at = Some(Utc::now());

        if let Some(practitioner) = state
            .practitioners
            .iter_mut()
            .find(|p| p.id == practitioner_id)
        {
            practitioner.total_assigned += 1;
        }

        Ok(state.turn_state.clone())
    }
}

#[async_trait]
impl BookingContextSource for MemorySchedulingStore {
    async fn booking_context(&self, booking_id: Uuid) -> Result<BookingSyncContext, SyncError> {
        let state = self.inner.lock().await;
        let booking = state
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| SyncError::ContextUnavailable("booking not found".to_string()))?;

        let practitioner = state
            .practitioners
            .iter()
            .find(|p| p.id == booking.practitioner_id)
            .ok_or_else(|| SyncError::ContextUnavailable("practitioner not found".to_string()))?;
        let patient = state
            .patients
            .get(&booking.patient_id)
            .ok_or_else(|| SyncError::ContextUnavailable("patient not found".to_string()))?;

        Ok(BookingSyncContext {
            booking_id,
            patient_name: patient.full_name.clone(),
            patient_phone: patient.phone.clone(),
            practitioner_name: practitioner.full_name.clone(),
            start_time: booking.start_time,
            end_time: booking.end_time,
        })
    }
}
