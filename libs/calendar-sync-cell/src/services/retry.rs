// libs/calendar-sync-cell/src/services/retry.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::models::{RetryRunReport, SyncError, SyncRecord, SyncStatus};
use crate::services::synchronizer::HybridSynchronizer;
use crate::store::{BookingContextSource, SyncRecordStore};

/// Periodic reconciliation of failed calendar projections. Runs outside the
/// booking request path; performs no business validation.
pub struct RetryWorker {
    synchronizer: Arc<HybridSynchronizer>,
    records: Arc<dyn SyncRecordStore>,
    context_source: Arc<dyn BookingContextSource>,
    is_shutdown: tokio::sync::RwLock<bool>,
    run_guard: tokio::sync::Mutex<()>,
}

impl RetryWorker {
    pub fn new(
        synchronizer: Arc<HybridSynchronizer>,
        records: Arc<dyn SyncRecordStore>,
        context_source: Arc<dyn BookingContextSource>,
    ) -> Self {
        Self {
            synchronizer,
            records,
            context_source,
            is_shutdown: tokio::sync::RwLock::new(false),
            run_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Drain every due sync record once. Safe to invoke from any host
    /// scheduler; overlapping invocations are skipped, and a run that finds
    /// nothing due is a no-op.
    #[instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RetryRunReport, SyncError> {
        let _guard = match self.run_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Retry run already in flight, skipping");
                return Ok(RetryRunReport::overlapped());
            }
        };

        let due = self.records.list_due_sync_records(now).await?;
        if due.is_empty() {
            debug!("No sync records due for retry");
            return Ok(RetryRunReport::default());
        }

        info!("Retrying {} pending calendar projections", due.len());

        let mut report = RetryRunReport::default();
        for record in due {
            report.attempted += 1;
            match self.process_record(record, now).await {
                Ok(SyncStatus::Synced) => report.succeeded += 1,
                Ok(SyncStatus::PermanentError) => report.exhausted += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    warn!("Retry pass failed to update a sync record: {}", e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Retry run complete: {} attempted, {} synced, {} rescheduled, {} exhausted",
            report.attempted, report.succeeded, report.failed, report.exhausted
        );

        Ok(report)
    }

    async fn process_record(
        &self,
        mut record: SyncRecord,
        now: DateTime<Utc>,
    ) -> Result<SyncStatus, SyncError> {
        debug!(
            "Retrying booking {} (attempt {}/{})",
            record.booking_id,
            record.attempt_count + 1,
            record.max_attempts
        );

        record.status = SyncStatus::Retrying;
        record.attempt_count += 1;
        record.last_attempt_at = Some(now);
        self.records.update_sync_record(&record).await?;

        // A partial prior success already holds an event id; re-inserting
        // would duplicate the event on the calendar.
        if record.external_event_id.is_some() {
            record.status = SyncStatus::Synced;
            record.next_retry_at = None;
            record.last_error = None;
            self.records.update_sync_record(&record).await?;
            info!(
                "Booking {} already has a calendar event, marked synced",
                record.booking_id
            );
            return Ok(record.status);
        }

        let attempt = match self.context_source.booking_context(record.booking_id).await {
            Ok(ctx) => self.synchronizer.attempt_insert(&ctx).await,
            Err(e) => Err(e),
        };

        match attempt {
            Ok(event_id) => {
                record.status = SyncStatus::Synced;
                record.external_event_id = Some(event_id);
                record.next_retry_at = None;
                record.last_error = None;
                info!("Booking {} synced on retry", record.booking_id);
            }
            Err(e) => {
                record.last_error = Some(e.to_string());
                if record.attempts_exhausted() {
                    record.status = SyncStatus::PermanentError;
                    record.next_retry_at = None;
                    // Booking stays valid; this is an operator follow-up item.
                    error!(
                        "Booking {} exhausted {} sync attempts: {}",
                        record.booking_id, record.max_attempts, e
                    );
                } else {
                    let interval = self.synchronizer.config().retry_interval_minutes;
                    record.next_retry_at = Some(now + Duration::minutes(interval));
                    warn!(
                        "Booking {} sync attempt {} failed, next retry at {:?}",
                        record.booking_id, record.attempt_count, record.next_retry_at
                    );
                }
            }
        }

        self.records.update_sync_record(&record).await?;
        Ok(record.status)
    }

    /// Long-running loop for in-process hosting. External schedulers can skip
    /// this and call `run_once` directly.
    pub async fn start(&self) -> Result<(), SyncError> {
        let period =
            std::time::Duration::from_secs(self.synchronizer.config().worker_interval_seconds);
        info!("Retry worker started, interval {:?}", period);

        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;

            if *self.is_shutdown.read().await {
                info!("Retry worker shutting down");
                break;
            }

            if let Err(e) = self.run_once(Utc::now()).await {
                error!("Retry run failed: {}", e);
            }
        }

        Ok(())
    }

    pub async fn shutdown(&self) {
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }
}
