// libs/scheduling-cell/src/services/turns.rs
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Practitioner, PractitionerShare, SchedulingError, TurnState, TurnStats};
use crate::store::SchedulingStore;

/// Pure rotation rule. One implementation serves both the committing path
/// (confirmation) and the non-committing simulation (slot generation).
pub fn next_in_rotation(roster: &[Practitioner], last: Option<Uuid>) -> Option<&Practitioner> {
    if roster.is_empty() {
        return None;
    }
    let next_index = match last.and_then(|id| roster.iter().position(|p| p.id == id)) {
        Some(pos) => (pos + 1) % roster.len(),
        None => 0,
    };
    roster.get(next_index)
}

/// Next ordered candidate different from `current`, skipping any already
/// excluded. Generalizes the two-practitioner "other one" fallback to N.
pub fn alternate_after<'a>(
    roster: &'a [Practitioner],
    current: Uuid,
    excluded: &[Uuid],
) -> Option<&'a Practitioner> {
    if roster.len() < 2 {
        return None;
    }
    let start = roster.iter().position(|p| p.id == current).unwrap_or(0);
    (1..roster.len())
        .map(|offset| &roster[(start + offset) % roster.len()])
        .find(|p| p.id != current && !excluded.contains(&p.id))
}

/// Round-robin allocation across the fixed practitioner pool. Reads are pure
/// over the stored turn state; the only mutation is `commit`, which the store
/// serializes.
pub struct TurnAllocator {
    store: Arc<dyn SchedulingStore>,
}

impl TurnAllocator {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Active practitioners in rotation order. Empty pool is fatal to any
    /// scheduling attempt.
    pub async fn roster(&self) -> Result<Vec<Practitioner>, SchedulingError> {
        let roster = self.store.list_practitioners().await?;
        if roster.is_empty() {
            return Err(SchedulingError::NoPractitioners);
        }
        Ok(roster)
    }

    pub async fn turn_state(&self) -> Result<TurnState, SchedulingError> {
        self.store.read_turn_state().await
    }

    /// Who takes the next confirmed booking. Does not mutate anything.
    pub async fn peek_next(&self) -> Result<Practitioner, SchedulingError> {
        let roster = self.roster().await?;
        let state = self.store.read_turn_state().await?;
        let next = next_in_rotation(&roster, state.last_assigned)
            .ok_or(SchedulingError::NoPractitioners)?;
        debug!("Next in rotation: {}", next.full_name);
        Ok(next.clone())
    }

    /// Finalize a turn after a booking insert succeeds. Linearizable with
    /// respect to other commits via the store.
    pub async fn commit(&self, practitioner_id: Uuid) -> Result<TurnState, SchedulingError> {
        let state = self.store.commit_turn_state(practitioner_id).await?;
        info!(
            "Turn committed to {} (total {})",
            practitioner_id,
            state.count_for(practitioner_id)
        );
        Ok(state)
    }

    pub async fn get_alternate(
        &self,
        practitioner_id: Uuid,
    ) -> Result<Option<Practitioner>, SchedulingError> {
        let roster = self.roster().await?;
        Ok(alternate_after(&roster, practitioner_id, &[]).cloned())
    }

    /// Reporting snapshot only; scheduling decisions never read this.
    pub async fn get_stats(&self) -> Result<TurnStats, SchedulingError> {
        let roster = self.roster().await?;
        let state = self.store.read_turn_state().await?;
        let total = state.total_assigned();

        let per_practitioner = roster
            .iter()
            .map(|p| {
                let assigned = state.count_for(p.id);
                PractitionerShare {
                    practitioner_id: p.id,
                    full_name: p.full_name.clone(),
                    assigned,
                    share_percent: if total > 0 {
                        assigned as f64 * 100.0 / total as f64
                    } else {
                        0.0
                    },
                }
            })
            .collect();

        Ok(TurnStats {
            total_assigned: total,
            last_assigned: state.last_assigned,
            per_practitioner,
        })
    }
}
