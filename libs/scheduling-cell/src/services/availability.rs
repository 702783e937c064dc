// libs/scheduling-cell/src/services/availability.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{AvailabilityResult, ClinicSchedule, SchedulingError, UnavailableReason};
use crate::store::SchedulingStore;

const DEFAULT_CACHE_TTL_SECONDS: u64 = 60;
const DEFAULT_CACHE_MAX_ENTRIES: usize = 500;

/// Explicit availability cache, injected into the checker rather than hidden
/// module state. Keyed by practitioner + window start; booking creation
/// invalidates the affected practitioner's entries.
pub struct AvailabilityCache {
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, (Instant, AvailabilityResult)>>,
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            DEFAULT_CACHE_MAX_ENTRIES,
        )
    }
}

impl AvailabilityCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(practitioner_id: Uuid, start: DateTime<Utc>) -> String {
        format!("{}|{}", practitioner_id, start.to_rfc3339())
    }

    pub async fn get(
        &self,
        practitioner_id: Uuid,
        start: DateTime<Utc>,
    ) -> Option<AvailabilityResult> {
        let entries = self.entries.read().await;
        let (inserted_at, result) = entries.get(&Self::key(practitioner_id, start))?;
        if inserted_at.elapsed() > self.ttl {
            return None;
        }
        Some(result.clone())
    }

    pub async fn put(
        &self,
        practitioner_id: Uuid,
        start: DateTime<Utc>,
        result: AvailabilityResult,
    ) {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, (inserted_at, _)| inserted_at.elapsed() <= ttl);
            if entries.len() >= self.max_entries {
                entries.clear();
            }
        }
        entries.insert(Self::key(practitioner_id, start), (Instant::now(), result));
    }

    /// Invalidation hook for booking creation and cancellation.
    pub async fn invalidate_practitioner(&self, practitioner_id: Uuid) {
        let prefix = format!("{}|", practitioner_id);
        let mut entries = self.entries.write().await;
        entries.retain(|key, _| !key.starts_with(&prefix));
    }
}

/// Decides whether one practitioner can take one `[start, end)` window.
/// Checks run in order and short-circuit: practitioner exists and is active,
/// clinic open that day, window inside operating hours, no overlapping
/// confirmed booking.
pub struct AvailabilityChecker {
    store: Arc<dyn SchedulingStore>,
    schedule: ClinicSchedule,
    cache: Arc<AvailabilityCache>,
}

impl AvailabilityChecker {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        schedule: ClinicSchedule,
        cache: Arc<AvailabilityCache>,
    ) -> Self {
        Self {
            store,
            schedule,
            cache,
        }
    }

    pub fn schedule(&self) -> &ClinicSchedule {
        &self.schedule
    }

    pub async fn check(
        &self,
        practitioner_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AvailabilityResult, SchedulingError> {
        if let Some(cached) = self.cache.get(practitioner_id, start).await {
            debug!("Availability cache hit for {} at {}", practitioner_id, start);
            return Ok(cached);
        }

        let result = self.check_uncached(practitioner_id, start, end).await?;
        self.cache.put(practitioner_id, start, result.clone()).await;
        Ok(result)
    }

    async fn check_uncached(
        &self,
        practitioner_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AvailabilityResult, SchedulingError> {
        let practitioner = match self.store.get_practitioner(practitioner_id).await? {
            Some(p) if p.is_active => p,
            _ => {
                return Ok(AvailabilityResult::unavailable(
                    UnavailableReason::PractitionerNotFound,
                    format!("Practitioner {} not found or inactive", practitioner_id),
                ))
            }
        };

        if let Err(reason) = self.schedule.validate_window(start, end) {
            let detail = match reason {
                UnavailableReason::ClosedDay => {
                    format!("Clinic is closed on {}", start.format("%A"))
                }
                _ => "Requested window is outside operating hours".to_string(),
            };
            return Ok(AvailabilityResult::unavailable(reason, detail));
        }

        let overlapping = self
            .store
            .list_confirmed_bookings_overlapping(practitioner_id, start, end)
            .await?;

        if let Some(conflicting) = overlapping.first() {
            return Ok(AvailabilityResult::conflict(
                conflicting.id,
                format!(
                    "{} already has a booking from {} to {}",
                    practitioner.full_name,
                    conflicting.start_time.format("%Y-%m-%d %H:%M"),
                    conflicting.end_time.format("%H:%M")
                ),
            ));
        }

        debug!(
            "Practitioner {} available {} - {}",
            practitioner.full_name,
            start.format("%Y-%m-%d %H:%M"),
            end.format("%H:%M")
        );
        Ok(AvailabilityResult::available())
    }

    /// Hours-only validation (open day + operating window) as a scheduling
    /// error, for validation paths that have no practitioner yet.
    pub fn validate_hours(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        self.schedule
            .validate_window(start, end)
            .map_err(|reason| match reason {
                UnavailableReason::ClosedDay => SchedulingError::ClosedDay,
                _ => SchedulingError::OutsideHours,
            })
    }
}
