// libs/scheduling-cell/src/store/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use calendar_sync_cell::{BookingContextSource, BookingSyncContext, SyncError};
use shared_database::SupabaseClient;

use crate::models::{Booking, BookingStatus, Patient, Practitioner, SchedulingError, TurnState};
use crate::store::SchedulingStore;

/// Production store over PostgREST. The two atomic operations delegate to
/// SQL functions (`create_booking_guarded`, `commit_turn_state`) so the
/// conflict check + insert and the turn read-modify-write run inside a
/// database transaction.
pub struct SupabaseSchedulingStore {
    supabase: Arc<SupabaseClient>,
}

/// Shape returned by the guarded-insert SQL function.
#[derive(Debug, Deserialize)]
struct GuardedInsertResult {
    ok: bool,
    booking: Option<Booking>,
    conflict_with: Option<Uuid>,
}

impl SupabaseSchedulingStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl SchedulingStore for SupabaseSchedulingStore {
    async fn get_practitioner(&self, id: Uuid) -> Result<Option<Practitioner>, SchedulingError> {
        let path = format!("/rest/v1/practitioners?id=eq.{}&limit=1", id);
        let result: Vec<Practitioner> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SchedulingError::System(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    async fn list_practitioners(&self) -> Result<Vec<Practitioner>, SchedulingError> {
        let path = "/rest/v1/practitioners?is_active=eq.true&order=id.asc";
        self.supabase
            .request(Method::GET, path, None)
            .await
            .map_err(|e| SchedulingError::System(e.to_string()))
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, SchedulingError> {
        let path = format!("/rest/v1/patients?id=eq.{}&limit=1", id);
        let result: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SchedulingError::System(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    async fn list_confirmed_bookings_overlapping(
        &self,
        practitioner_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, SchedulingError> {
        // Half-open overlap: existing.start < end AND existing.end > start.
        let path = format!(
            "/rest/v1/bookings?practitioner_id=eq.{}&status=eq.confirmed&start_time=lt.{}&end_time=gt.{}&order=start_time.asc",
            practitioner_id,
            end.to_rfc3339(),
            start.to_rfc3339()
        );
        self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SchedulingError::System(e.to_string()))
    }

    async fn create_booking(
        &self,
        practitioner_id: Uuid,
        patient_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Booking, SchedulingError> {
        let args = json!({
            "p_practitioner_id": practitioner_id,
            "p_patient_id": patient_id,
            "p_start_time": start.to_rfc3339(),
            "p_end_time": end.to_rfc3339(),
        });

        let result: GuardedInsertResult = self
            .supabase
            .rpc("create_booking_guarded", args)
            .await
            .map_err(|e| SchedulingError::System(e.to_string()))?;

        if !result.ok {
            return Err(match result.conflict_with {
                Some(booking_id) => SchedulingError::Conflict { booking_id },
                None => SchedulingError::System(
                    "guarded insert refused without a conflict id".to_string(),
                ),
            });
        }

        result
            .booking
            .ok_or_else(|| SchedulingError::System("guarded insert returned no booking".to_string()))
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, SchedulingError> {
        let path = format!("/rest/v1/bookings?id=eq.{}&limit=1", id);
        let result: Vec<Booking> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SchedulingError::System(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    async fn update_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> Result<Booking, SchedulingError> {
        let path = format!("/rest/v1/bookings?id=eq.{}", id);
        let body = json!({
            "status": status,
            "updated_at": Utc::now(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Booking> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(body), Some(headers))
            .await
            .map_err(|e| SchedulingError::System(e.to_string()))?;

        result.into_iter().next().ok_or(SchedulingError::BookingNotFound)
    }

    async fn read_turn_state(&self) -> Result<TurnState, SchedulingError> {
        let result: Vec<TurnState> = self
            .supabase
            .request(Method::GET, "/rest/v1/turn_state?limit=1", None)
            .await
            .map_err(|e| SchedulingError::System(e.to_string()))?;

        Ok(result.into_iter().next().unwrap_or_default())
    }

    async fn commit_turn_state(&self, practitioner_id: Uuid) -> Result<TurnState, SchedulingError> {
        let args = json!({ "p_practitioner_id": practitioner_id });
        self.supabase
            .rpc("commit_turn_state", args)
            .await
            .map_err(|e| SchedulingError::System(e.to_string()))
    }
}

#[async_trait]
impl BookingContextSource for SupabaseSchedulingStore {
    async fn booking_context(&self, booking_id: Uuid) -> Result<BookingSyncContext, SyncError> {
        let booking = self
            .get_booking(booking_id)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?
            .ok_or_else(|| SyncError::ContextUnavailable("booking not found".to_string()))?;

        let practitioner = self
            .get_practitioner(booking.practitioner_id)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?
            .ok_or_else(|| SyncError::ContextUnavailable("practitioner not found".to_string()))?;

        let patient = self
            .get_patient(booking.patient_id)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?
            .ok_or_else(|| SyncError::ContextUnavailable("patient not found".to_string()))?;

        Ok(BookingSyncContext {
            booking_id,
            patient_name: patient.full_name,
            patient_phone: patient.phone,
            practitioner_name: practitioner.full_name,
            start_time: booking.start_time,
            end_time: booking.end_time,
        })
    }
}
