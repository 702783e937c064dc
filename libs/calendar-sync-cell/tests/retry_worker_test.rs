use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use calendar_sync_cell::{
    BookingContextSource, BookingSyncContext, CalendarEvent, CalendarProvider, HybridSynchronizer,
    MemorySyncStore, RetryWorker, SyncConfig, SyncError, SyncRecordStore, SyncStatus,
};

/// Fails the first `failures` inserts, then succeeds. Counts every call.
struct FlakyProvider {
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyProvider {
    fn failing(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarProvider for FlakyProvider {
    async fn insert_event(
        &self,
        _calendar_id: &str,
        _event: &CalendarEvent,
    ) -> Result<String, SyncError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(SyncError::Provider("flaky upstream".to_string()))
        } else {
            Ok(format!("evt-{}", call))
        }
    }
}

/// Parks inside the insert long enough for a second run to collide.
struct SleepyProvider;

#[async_trait]
impl CalendarProvider for SleepyProvider {
    async fn insert_event(
        &self,
        _calendar_id: &str,
        _event: &CalendarEvent,
    ) -> Result<String, SyncError> {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        Ok("evt-slow".to_string())
    }
}

struct StaticContextSource {
    ctx: BookingSyncContext,
}

#[async_trait]
impl BookingContextSource for StaticContextSource {
    async fn booking_context(&self, _booking_id: Uuid) -> Result<BookingSyncContext, SyncError> {
        Ok(self.ctx.clone())
    }
}

struct NoContextSource;

#[async_trait]
impl BookingContextSource for NoContextSource {
    async fn booking_context(&self, _booking_id: Uuid) -> Result<BookingSyncContext, SyncError> {
        Err(SyncError::ContextUnavailable("booking was purged".to_string()))
    }
}

fn ctx() -> BookingSyncContext {
    BookingSyncContext {
        booking_id: Uuid::new_v4(),
        patient_name: "Ana Torres".to_string(),
        patient_phone: Some("+52 664 123 4567".to_string()),
        practitioner_name: "Dr. Vega".to_string(),
        start_time: Utc.with_ymd_and_hms(2030, 1, 3, 10, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2030, 1, 3, 11, 0, 0).unwrap(),
    }
}

struct Fixture {
    provider: Arc<FlakyProvider>,
    records: Arc<MemorySyncStore>,
    synchronizer: Arc<HybridSynchronizer>,
    worker: RetryWorker,
    ctx: BookingSyncContext,
}

fn fixture(failures: usize) -> Fixture {
    let provider = Arc::new(FlakyProvider::failing(failures));
    let records = Arc::new(MemorySyncStore::new());
    let synchronizer = Arc::new(HybridSynchronizer::new(
        provider.clone(),
        records.clone(),
        SyncConfig::default(),
    ));
    let ctx = ctx();
    let worker = RetryWorker::new(
        synchronizer.clone(),
        records.clone(),
        Arc::new(StaticContextSource { ctx: ctx.clone() }),
    );
    Fixture {
        provider,
        records,
        synchronizer,
        worker,
        ctx,
    }
}

#[tokio::test]
async fn record_recovers_after_transient_failures() {
    // Three failures: the initial sync plus two retries, then success.
    let f = fixture(3);

    let record = f.synchronizer.sync_booking(&f.ctx).await.unwrap();
    assert_eq!(record.status, SyncStatus::Error);

    let mut now = Utc::now();
    for expected_attempt in 2..=3 {
        now += Duration::minutes(16);
        let report = f.worker.run_once(now).await.unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(report.failed, 1);

        let current = f.records.get_by_booking(f.ctx.booking_id).await.unwrap().unwrap();
        assert_eq!(current.attempt_count, expected_attempt);
        assert_eq!(current.status, SyncStatus::Retrying);
    }

    now += Duration::minutes(16);
    let report = f.worker.run_once(now).await.unwrap();
    assert_eq!(report.succeeded, 1);

    let synced = f.records.get_by_booking(f.ctx.booking_id).await.unwrap().unwrap();
    assert_eq!(synced.status, SyncStatus::Synced);
    assert!(synced.external_event_id.is_some());
    assert!(synced.next_retry_at.is_none());
    assert_eq!(f.provider.call_count(), 4);
}

#[tokio::test]
async fn exhausted_record_goes_permanent_and_leaves_the_queue() {
    let f = fixture(usize::MAX);

    let record = f.synchronizer.sync_booking(&f.ctx).await.unwrap();
    assert_eq!(record.attempt_count, 1);

    let mut now = Utc::now();
    for _ in 0..4 {
        now += Duration::minutes(16);
        f.worker.run_once(now).await.unwrap();
    }

    let dead = f.records.get_by_booking(f.ctx.booking_id).await.unwrap().unwrap();
    assert_eq!(dead.status, SyncStatus::PermanentError);
    assert_eq!(dead.attempt_count, 5);
    assert!(dead.next_retry_at.is_none());

    // Nothing left to do.
    now += Duration::minutes(16);
    let report = f.worker.run_once(now).await.unwrap();
    assert_eq!(report.attempted, 0);
    assert_eq!(f.provider.call_count(), 5);
}

#[tokio::test]
async fn record_with_an_event_id_is_not_reinserted() {
    let f = fixture(0);

    let mut record = f
        .records
        .create_sync_record(f.ctx.booking_id, 5)
        .await
        .unwrap();
    record.status = SyncStatus::Error;
    record.attempt_count = 1;
    record.external_event_id = Some("evt-existing".to_string());
    record.next_retry_at = Some(Utc::now() - Duration::minutes(1));
    f.records.update_sync_record(&record).await.unwrap();

    let report = f.worker.run_once(Utc::now()).await.unwrap();
    assert_eq!(report.succeeded, 1);

    let synced = f.records.get_by_booking(f.ctx.booking_id).await.unwrap().unwrap();
    assert_eq!(synced.status, SyncStatus::Synced);
    assert_eq!(synced.external_event_id.as_deref(), Some("evt-existing"));
    // The provider was never called.
    assert_eq!(f.provider.call_count(), 0);
}

#[tokio::test]
async fn empty_queue_run_is_a_noop() {
    let f = fixture(0);
    let report = f.worker.run_once(Utc::now()).await.unwrap();
    assert_eq!(report.attempted, 0);
    assert!(!report.skipped);
}

#[tokio::test]
async fn records_are_not_retried_before_they_are_due() {
    let f = fixture(usize::MAX);
    f.synchronizer.sync_booking(&f.ctx).await.unwrap();

    // Due in 15 minutes; running now must leave it alone.
    let report = f.worker.run_once(Utc::now()).await.unwrap();
    assert_eq!(report.attempted, 0);
    assert_eq!(f.provider.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn overlapping_runs_are_skipped() {
    let records = Arc::new(MemorySyncStore::new());
    let synchronizer = Arc::new(HybridSynchronizer::new(
        Arc::new(SleepyProvider),
        records.clone(),
        SyncConfig::default(),
    ));
    let ctx = ctx();
    let worker = Arc::new(RetryWorker::new(
        synchronizer,
        records.clone(),
        Arc::new(StaticContextSource { ctx: ctx.clone() }),
    ));

    let mut record = records.create_sync_record(ctx.booking_id, 5).await.unwrap();
    record.status = SyncStatus::Error;
    record.attempt_count = 1;
    record.next_retry_at = Some(Utc::now() - Duration::minutes(1));
    records.update_sync_record(&record).await.unwrap();

    let first = tokio::spawn({
        let worker = worker.clone();
        async move { worker.run_once(Utc::now()).await }
    });
    // Give the first run a chance to take the guard and park in the provider.
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }

    let second = worker.run_once(Utc::now()).await.unwrap();
    assert!(second.skipped);
    assert_eq!(second.attempted, 0);

    let report = first.await.unwrap().unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.succeeded, 1);
}

#[tokio::test]
async fn missing_booking_context_reschedules_the_record() {
    let provider = Arc::new(FlakyProvider::failing(0));
    let records = Arc::new(MemorySyncStore::new());
    let synchronizer = Arc::new(HybridSynchronizer::new(
        provider.clone(),
        records.clone(),
        SyncConfig::default(),
    ));
    let worker = RetryWorker::new(synchronizer, records.clone(), Arc::new(NoContextSource));

    let booking_id = Uuid::new_v4();
    let mut record = records.create_sync_record(booking_id, 5).await.unwrap();
    record.status = SyncStatus::Error;
    record.attempt_count = 1;
    record.next_retry_at = Some(Utc::now() - Duration::minutes(1));
    records.update_sync_record(&record).await.unwrap();

    let report = worker.run_once(Utc::now()).await.unwrap();
    assert_eq!(report.failed, 1);

    let rescheduled = records.get_by_booking(booking_id).await.unwrap().unwrap();
    assert_eq!(rescheduled.status, SyncStatus::Retrying);
    assert!(rescheduled.last_error.as_deref().unwrap().contains("purged"));
    assert!(rescheduled.next_retry_at.is_some());
    assert_eq!(provider.call_count(), 0);
}
