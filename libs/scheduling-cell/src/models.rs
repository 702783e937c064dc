// libs/scheduling-cell/src/models.rs
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use calendar_sync_cell::SyncStatus;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Practitioner {
    pub id: Uuid,
    pub full_name: String,
    pub specialty: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub total_assigned: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
}

/// Singleton rotation record. Only the turn allocator's commit path mutates
/// it, and always atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnState {
    pub last_assigned: Option<Uuid>,
    pub assignment_counts: HashMap<Uuid, i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TurnState {
    pub fn count_for(&self, practitioner_id: Uuid) -> i64 {
        self.assignment_counts
            .get(&practitioner_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_assigned(&self) -> i64 {
        self.assignment_counts.values().sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnStats {
    pub total_assigned: i64,
    pub last_assigned: Option<Uuid>,
    pub per_practitioner: Vec<PractitionerShare>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PractitionerShare {
    pub practitioner_id: Uuid,
    pub full_name: String,
    pub assigned: i64,
    pub share_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub practitioner_id: Uuid,
    pub patient_id: Uuid,
    pub start_time: DateTime<Utc>,
    /// Exclusive: two bookings may touch at this instant without conflict.
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// SLOTS
// ==============================================================================

/// Slot as resolved during generation. Carries the practitioner that would
/// take the booking; this variant never crosses the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalSlot {
    pub slot_id: String,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub practitioner_id: Uuid,
    pub turn_number: u32,
}

/// Externally exposed slot. Practitioner identity is stripped here by
/// construction; it is revealed only at confirmation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicSlot {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub slot_id: String,
}

impl From<&InternalSlot> for PublicSlot {
    fn from(slot: &InternalSlot) -> Self {
        Self {
            date: slot.date,
            start_time: slot.start_time.format("%H:%M").to_string(),
            end_time: slot.end_time.format("%H:%M").to_string(),
            slot_id: slot.slot_id.clone(),
        }
    }
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    ClosedDay,
    OutsideHours,
    PractitionerBusy,
    PractitionerNotFound,
}

/// Structured availability outcome. Business-rule refusals are data, not
/// errors; only storage faults surface as `SchedulingError::System`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub available: bool,
    pub reason: Option<UnavailableReason>,
    pub conflict_with: Option<Uuid>,
    pub detail: Option<String>,
}

impl AvailabilityResult {
    pub fn available() -> Self {
        Self {
            available: true,
            reason: None,
            conflict_with: None,
            detail: None,
        }
    }

    pub fn unavailable(reason: UnavailableReason, detail: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason),
            conflict_with: None,
            detail: Some(detail.into()),
        }
    }

    pub fn conflict(booking_id: Uuid, detail: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(UnavailableReason::PractitionerBusy),
            conflict_with: Some(booking_id),
            detail: Some(detail.into()),
        }
    }
}

// ==============================================================================
// CLINIC SCHEDULE
// ==============================================================================

/// Operating-hours policy shared by the availability checker and the slot
/// generator. Weekday and weekend windows differ.
#[derive(Debug, Clone)]
pub struct ClinicSchedule {
    pub open_days: Vec<Weekday>,
    pub weekday_open: NaiveTime,
    pub weekday_close: NaiveTime,
    pub weekend_open: NaiveTime,
    pub weekend_close: NaiveTime,
    pub slot_duration_minutes: i64,
    pub default_horizon_days: i64,
}

impl Default for ClinicSchedule {
    fn default() -> Self {
        Self {
            open_days: vec![
                Weekday::Mon,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
            weekday_open: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            weekday_close: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            weekend_open: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            weekend_close: NaiveTime::from_hms_opt(17, 30, 0).unwrap(),
            slot_duration_minutes: 60,
            default_horizon_days: 7,
        }
    }
}

impl ClinicSchedule {
    pub fn slot_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.slot_duration_minutes)
    }

    /// Operating window for a day, or None when the clinic is closed.
    pub fn window_for(&self, day: Weekday) -> Option<(NaiveTime, NaiveTime)> {
        if !self.open_days.contains(&day) {
            return None;
        }
        match day {
            Weekday::Sat | Weekday::Sun => Some((self.weekend_open, self.weekend_close)),
            _ => Some((self.weekday_open, self.weekday_close)),
        }
    }

    /// Hours-only validation (open day + operating window), reusable outside
    /// the full availability check. Assumes `end > start`.
    pub fn validate_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), UnavailableReason> {
        let (open, close) = self
            .window_for(start.weekday())
            .ok_or(UnavailableReason::ClosedDay)?;

        if start.date_naive() != end.date_naive() {
            return Err(UnavailableReason::OutsideHours);
        }

        let start_time = start.time();
        let end_time = end.time();
        if start_time < open || start_time >= close || end_time > close {
            return Err(UnavailableReason::OutsideHours);
        }

        Ok(())
    }
}

// ==============================================================================
// API REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmBookingRequest {
    pub slot_id: String,
    pub patient_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingStatusResponse {
    pub booking_id: Uuid,
    pub status: BookingStatus,
    pub sync_status: Option<SyncStatus>,
    pub external_event_id: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Clinic is closed on the requested day")]
    ClosedDay,

    #[error("Requested time is outside clinic operating hours")]
    OutsideHours,

    #[error("Requested window conflicts with booking {booking_id}")]
    Conflict { booking_id: Uuid },

    #[error("Practitioner not found")]
    PractitionerNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("No practitioners configured")]
    NoPractitioners,

    #[error("Storage error: {0}")]
    System(String),
}

impl SchedulingError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            SchedulingError::Validation(_) => "validation_error",
            SchedulingError::ClosedDay => "closed_day",
            SchedulingError::OutsideHours => "outside_hours",
            SchedulingError::Conflict { .. } => "conflict",
            SchedulingError::PractitionerNotFound => "practitioner_not_found",
            SchedulingError::BookingNotFound => "booking_not_found",
            SchedulingError::NoPractitioners => "no_practitioners",
            SchedulingError::System(_) => "system_error",
        }
    }
}
