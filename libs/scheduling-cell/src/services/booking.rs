// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use calendar_sync_cell::{BookingSyncContext, HybridSynchronizer};

use crate::models::{Booking, BookingStatus, BookingStatusResponse, Practitioner, SchedulingError};
use crate::services::availability::{AvailabilityCache, AvailabilityChecker};
use crate::services::slots::parse_slot_id;
use crate::services::turns::TurnAllocator;
use crate::store::SchedulingStore;

/// Confirmation flow: resolve the practitioner by turn, re-check availability
/// at booking time, insert atomically, then commit the turn and trigger the
/// calendar projection. The projection outcome never affects the booking.
pub struct BookingService {
    store: Arc<dyn SchedulingStore>,
    allocator: Arc<TurnAllocator>,
    checker: Arc<AvailabilityChecker>,
    cache: Arc<AvailabilityCache>,
    synchronizer: Arc<HybridSynchronizer>,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        allocator: Arc<TurnAllocator>,
        checker: Arc<AvailabilityChecker>,
        cache: Arc<AvailabilityCache>,
        synchronizer: Arc<HybridSynchronizer>,
    ) -> Self {
        Self {
            store,
            allocator,
            checker,
            cache,
            synchronizer,
        }
    }

    pub async fn confirm_booking(
        &self,
        slot_id: &str,
        patient_id: Uuid,
    ) -> Result<Booking, SchedulingError> {
        let start = parse_slot_id(slot_id).ok_or_else(|| {
            SchedulingError::Validation(format!("Malformed slot id '{}'", slot_id))
        })?;

        if start <= Utc::now() {
            return Err(SchedulingError::Validation(
                "Requested slot is in the past".to_string(),
            ));
        }

        let end = start + self.checker.schedule().slot_duration();
        self.checker.validate_hours(start, end)?;

        let patient = self
            .store
            .get_patient(patient_id)
            .await?
            .ok_or_else(|| SchedulingError::Validation(format!("Unknown patient {}", patient_id)))?;

        let practitioner = self.resolve_practitioner(start, end).await?;

        // Conflict check + insert run atomically in the store; a race loser
        // gets Conflict here even though the pre-check above passed.
        let booking = self
            .store
            .create_booking(practitioner.id, patient_id, start, end)
            .await?;

        info!(
            "Booking {} confirmed with {} for {}",
            booking.id,
            practitioner.full_name,
            start.format("%Y-%m-%d %H:%M")
        );

        // The booking is already durable; a failed turn commit only skews the
        // rotation by one and is corrected by the next successful commit.
        if let Err(e) = self.allocator.commit(practitioner.id).await {
            warn!(
                "Turn commit failed after booking {}: {} (booking stands)",
                booking.id, e
            );
        }

        self.cache.invalidate_practitioner(practitioner.id).await;

        let ctx = BookingSyncContext {
            booking_id: booking.id,
            patient_name: patient.full_name,
            patient_phone: patient.phone,
            practitioner_name: practitioner.full_name,
            start_time: booking.start_time,
            end_time: booking.end_time,
        };

        if let Err(e) = self.synchronizer.sync_booking(&ctx).await {
            warn!(
                "Could not record calendar sync state for booking {}: {}",
                booking.id, e
            );
        }

        Ok(booking)
    }

    /// Turn candidate first, one alternate if the candidate is busy. Both
    /// busy means the slot is gone.
    async fn resolve_practitioner(
        &self,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
    ) -> Result<Practitioner, SchedulingError> {
        let candidate = self.allocator.peek_next().await?;
        let availability = self.checker.check(candidate.id, start, end).await?;
        if availability.available {
            return Ok(candidate);
        }

        debug!(
            "Turn candidate {} busy at {}, trying alternate",
            candidate.full_name,
            start.format("%Y-%m-%d %H:%M")
        );

        if let Some(alternate) = self.allocator.get_alternate(candidate.id).await? {
            let fallback = self.checker.check(alternate.id, start, end).await?;
            if fallback.available {
                return Ok(alternate);
            }
        }

        match availability.conflict_with {
            Some(booking_id) => Err(SchedulingError::Conflict { booking_id }),
            None => Err(SchedulingError::Validation(
                availability
                    .detail
                    .unwrap_or_else(|| "Slot is not available".to_string()),
            )),
        }
    }

    pub async fn get_booking_status(
        &self,
        booking_id: Uuid,
    ) -> Result<BookingStatusResponse, SchedulingError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(SchedulingError::BookingNotFound)?;

        let record = match self.synchronizer.record_for(booking_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Sync record lookup failed for booking {}: {}", booking_id, e);
                None
            }
        };

        Ok(BookingStatusResponse {
            booking_id: booking.id,
            status: booking.status,
            sync_status: record.as_ref().map(|r| r.status),
            external_event_id: record.and_then(|r| r.external_event_id),
        })
    }

    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking, SchedulingError> {
        let booking = self
            .store
            .update_booking_status(booking_id, BookingStatus::Cancelled)
            .await?;

        self.cache
            .invalidate_practitioner(booking.practitioner_id)
            .await;

        info!("Booking {} cancelled", booking_id);
        Ok(booking)
    }
}
