// libs/calendar-sync-cell/src/models.rs
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_config::AppConfig;

// ==============================================================================
// SYNC RECORD
// ==============================================================================

/// Tracks projection of one booking into the external calendar. The booking
/// itself is the source of truth; nothing in this record ever affects booking
/// validity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub external_event_id: Option<String>,
    pub status: SyncStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncRecord {
    pub fn new(booking_id: Uuid, max_attempts: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            external_event_id: None,
            status: SyncStatus::Pending,
            attempt_count: 0,
            max_attempts,
            last_attempt_at: None,
            next_retry_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SyncStatus::Synced | SyncStatus::PermanentError)
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Error,
    Retrying,
    Synced,
    PermanentError,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Pending => write!(f, "pending"),
            SyncStatus::Error => write!(f, "error"),
            SyncStatus::Retrying => write!(f, "retrying"),
            SyncStatus::Synced => write!(f, "synced"),
            SyncStatus::PermanentError => write!(f, "permanent_error"),
        }
    }
}

// ==============================================================================
// EXTERNAL EVENT PAYLOAD
// ==============================================================================

/// What the booking side hands over for projection. Carries only the fields
/// staff need to see on the calendar; clinical details never leave the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSyncContext {
    pub booking_id: Uuid,
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub practitioner_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub timezone: String,
    pub private_properties: HashMap<String, String>,
    pub color_id: Option<String>,
}

// ==============================================================================
// CONFIGURATION
// ==============================================================================

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub calendar_id: String,
    pub timezone: String,
    pub insert_timeout_seconds: u64,
    pub retry_interval_minutes: i64,
    pub max_attempts: i32,
    pub worker_interval_seconds: u64,
}

impl SyncConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            calendar_id: config.calendar_id.clone(),
            timezone: config.clinic_timezone.clone(),
            insert_timeout_seconds: config.sync_insert_timeout_seconds,
            retry_interval_minutes: config.sync_retry_interval_minutes,
            max_attempts: config.sync_max_attempts,
            worker_interval_seconds: config.retry_worker_interval_seconds,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            timezone: "America/Tijuana".to_string(),
            insert_timeout_seconds: 10,
            retry_interval_minutes: 15,
            max_attempts: 5,
            worker_interval_seconds: 3600,
        }
    }
}

// ==============================================================================
// RETRY REPORTING
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryRunReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub exhausted: usize,
    pub skipped: bool,
}

impl RetryRunReport {
    /// Report for a run that found another run still in flight.
    pub fn overlapped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SyncError {
    #[error("Calendar provider error: {0}")]
    Provider(String),

    #[error("Calendar insert timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Sync record not found")]
    RecordNotFound,

    #[error("Booking context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("Sync storage error: {0}")]
    Storage(String),
}
