use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use scheduling_cell::{
    AvailabilityCache, AvailabilityChecker, ClinicSchedule, MemorySchedulingStore, Practitioner,
    SchedulingStore, UnavailableReason,
};

fn practitioner(name: &str) -> Practitioner {
    Practitioner {
        id: Uuid::new_v4(),
        full_name: name.to_string(),
        specialty: "General".to_string(),
        phone: None,
        is_active: true,
        total_assigned: 0,
    }
}

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

struct Fixture {
    store: Arc<MemorySchedulingStore>,
    checker: AvailabilityChecker,
    cache: Arc<AvailabilityCache>,
    practitioner: Practitioner,
}

fn fixture() -> Fixture {
    let p = practitioner("Dr. Vega");
    let store = Arc::new(MemorySchedulingStore::new(vec![p.clone()]));
    let cache = Arc::new(AvailabilityCache::default());
    let checker = AvailabilityChecker::new(
        store.clone() as Arc<dyn SchedulingStore>,
        ClinicSchedule::default(),
        cache.clone(),
    );
    Fixture {
        store,
        checker,
        cache,
        practitioner: p,
    }
}

// 2030-01-01 is a Tuesday; the clinic opens Mon/Thu/Fri/Sat/Sun.
#[tokio::test]
async fn closed_day_is_unavailable() {
    let f = fixture();
    let result = f
        .checker
        .check(f.practitioner.id, at(2030, 1, 1, 10, 0), at(2030, 1, 1, 11, 0))
        .await
        .unwrap();

    assert!(!result.available);
    assert_eq!(result.reason, Some(UnavailableReason::ClosedDay));
}

#[tokio::test]
async fn weekday_window_edges() {
    let f = fixture();

    // Thursday 2030-01-03, hours 08:30 - 18:30.
    let first = f
        .checker
        .check(f.practitioner.id, at(2030, 1, 3, 8, 30), at(2030, 1, 3, 9, 30))
        .await
        .unwrap();
    assert!(first.available);

    let last = f
        .checker
        .check(f.practitioner.id, at(2030, 1, 3, 17, 30), at(2030, 1, 3, 18, 30))
        .await
        .unwrap();
    assert!(last.available);

    let before_open = f
        .checker
        .check(f.practitioner.id, at(2030, 1, 3, 7, 30), at(2030, 1, 3, 8, 30))
        .await
        .unwrap();
    assert_eq!(before_open.reason, Some(UnavailableReason::OutsideHours));

    let past_close = f
        .checker
        .check(f.practitioner.id, at(2030, 1, 3, 18, 0), at(2030, 1, 3, 19, 0))
        .await
        .unwrap();
    assert_eq!(past_close.reason, Some(UnavailableReason::OutsideHours));
}

#[tokio::test]
async fn weekend_uses_the_shorter_window() {
    let f = fixture();

    // Saturday 2030-01-05, hours 10:30 - 17:30.
    let early = f
        .checker
        .check(f.practitioner.id, at(2030, 1, 5, 9, 30), at(2030, 1, 5, 10, 30))
        .await
        .unwrap();
    assert_eq!(early.reason, Some(UnavailableReason::OutsideHours));

    let open = f
        .checker
        .check(f.practitioner.id, at(2030, 1, 5, 10, 30), at(2030, 1, 5, 11, 30))
        .await
        .unwrap();
    assert!(open.available);
}

#[tokio::test]
async fn overlapping_booking_reports_the_conflict() {
    let f = fixture();
    let patient = Uuid::new_v4();

    let existing = f
        .store
        .create_booking(
            f.practitioner.id,
            patient,
            at(2030, 1, 3, 10, 0),
            at(2030, 1, 3, 11, 0),
        )
        .await
        .unwrap();

    let result = f
        .checker
        .check(
            f.practitioner.id,
            at(2030, 1, 3, 10, 30),
            at(2030, 1, 3, 11, 30),
        )
        .await
        .unwrap();

    assert!(!result.available);
    assert_eq!(result.reason, Some(UnavailableReason::PractitionerBusy));
    assert_eq!(result.conflict_with, Some(existing.id));
}

#[tokio::test]
async fn touching_bookings_do_not_conflict() {
    let f = fixture();

    f.store
        .create_booking(
            f.practitioner.id,
            Uuid::new_v4(),
            at(2030, 1, 3, 10, 0),
            at(2030, 1, 3, 11, 0),
        )
        .await
        .unwrap();

    // End is exclusive: the 11:00 slot starts exactly where the first ends.
    let result = f
        .checker
        .check(f.practitioner.id, at(2030, 1, 3, 11, 0), at(2030, 1, 3, 12, 0))
        .await
        .unwrap();

    assert!(result.available);
}

#[tokio::test]
async fn unknown_practitioner_is_unavailable() {
    let f = fixture();
    let result = f
        .checker
        .check(Uuid::new_v4(), at(2030, 1, 3, 10, 0), at(2030, 1, 3, 11, 0))
        .await
        .unwrap();

    assert_eq!(result.reason, Some(UnavailableReason::PractitionerNotFound));
}

#[tokio::test]
async fn cached_result_is_served_until_invalidated() {
    let f = fixture();
    let start = at(2030, 1, 3, 10, 0);
    let end = at(2030, 1, 3, 11, 0);

    let first = f.checker.check(f.practitioner.id, start, end).await.unwrap();
    assert!(first.available);

    // Booking inserted behind the cache's back.
    f.store
        .create_booking(f.practitioner.id, Uuid::new_v4(), start, end)
        .await
        .unwrap();

    let stale = f.checker.check(f.practitioner.id, start, end).await.unwrap();
    assert!(stale.available, "expected the cached answer");

    f.cache.invalidate_practitioner(f.practitioner.id).await;

    let fresh = f.checker.check(f.practitioner.id, start, end).await.unwrap();
    assert!(!fresh.available);
    assert_eq!(fresh.reason, Some(UnavailableReason::PractitionerBusy));
}

#[tokio::test]
async fn cache_entries_expire_after_ttl() {
    let cache = AvailabilityCache::new(Duration::from_millis(20), 16);
    let practitioner_id = Uuid::new_v4();
    let start = at(2030, 1, 3, 10, 0);

    cache
        .put(
            practitioner_id,
            start,
            scheduling_cell::AvailabilityResult::available(),
        )
        .await;
    assert!(cache.get(practitioner_id, start).await.is_some());

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(cache.get(practitioner_id, start).await.is_none());
}
