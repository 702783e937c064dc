use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use scheduling_cell::{
    MemorySchedulingStore, Practitioner, SchedulingError, SchedulingStore, TurnAllocator,
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

fn allocator_with(practitioners: Vec<Practitioner>) -> (TurnAllocator, Arc<MemorySchedulingStore>) {
    let store = Arc::new(MemorySchedulingStore::new(practitioners));
    let allocator = TurnAllocator::new(store.clone() as Arc<dyn SchedulingStore>);
    (allocator, store)
}

#[tokio::test]
async fn rotation_alternates_between_two_practitioners() {
    let a = practitioner("Dr. A");
    let b = practitioner("Dr. B");
    let (allocator, _store) = allocator_with(vec![a.clone(), b.clone()]);

    let first = allocator.peek_next().await.unwrap();
    assert_eq!(first.id, a.id);
    allocator.commit(first.id).await.unwrap();

    let second = allocator.peek_next().await.unwrap();
    assert_eq!(second.id, b.id);
    allocator.commit(second.id).await.unwrap();

    let third = allocator.peek_next().await.unwrap();
    assert_eq!(third.id, a.id);
}

#[tokio::test]
async fn peek_does_not_advance_the_rotation() {
    let (allocator, _store) = allocator_with(vec![practitioner("A"), practitioner("B")]);

    let first = allocator.peek_next().await.unwrap();
    let again = allocator.peek_next().await.unwrap();
    assert_eq!(first.id, again.id);
}

#[tokio::test]
async fn long_run_assignment_counts_stay_balanced() {
    let roster = vec![practitioner("A"), practitioner("B"), practitioner("C")];
    let (allocator, _store) = allocator_with(roster);

    for _ in 0..100 {
        let next = allocator.peek_next().await.unwrap();
        allocator.commit(next.id).await.unwrap();
    }

    let stats = allocator.get_stats().await.unwrap();
    assert_eq!(stats.total_assigned, 100);

    let counts: Vec<i64> = stats.per_practitioner.iter().map(|p| p.assigned).collect();
    let max = counts.iter().max().unwrap();
    let min = counts.iter().min().unwrap();
    assert!(max - min <= 1, "counts diverged: {:?}", counts);
}

#[tokio::test]
async fn stats_report_share_percentages() {
    let (allocator, _store) = allocator_with(vec![practitioner("A"), practitioner("B")]);

    for _ in 0..4 {
        let next = allocator.peek_next().await.unwrap();
        allocator.commit(next.id).await.unwrap();
    }

    let stats = allocator.get_stats().await.unwrap();
    for share in &stats.per_practitioner {
        assert_eq!(share.assigned, 2);
        assert!((share.share_percent - 50.0).abs() < f64::EPSILON);
    }
}

#[tokio::test]
async fn empty_pool_is_an_error() {
    let (allocator, _store) = allocator_with(vec![]);
    assert_matches!(
        allocator.peek_next().await,
        Err(SchedulingError::NoPractitioners)
    );
}

#[tokio::test]
async fn inactive_practitioners_are_outside_the_rotation() {
    let mut inactive = practitioner("Inactive");
    inactive.is_active = false;
    let active = practitioner("Active");
    let (allocator, _store) = allocator_with(vec![inactive.clone(), active.clone()]);

    for _ in 0..3 {
        let next = allocator.peek_next().await.unwrap();
        assert_eq!(next.id, active.id);
        allocator.commit(next.id).await.unwrap();
    }
}
