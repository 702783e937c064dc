// libs/scheduling-cell/src/services/slots.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{InternalSlot, PublicSlot, SchedulingError};
use crate::services::availability::AvailabilityChecker;
use crate::services::turns::{alternate_after, next_in_rotation, TurnAllocator};

pub const SLOT_ID_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub fn parse_slot_id(slot_id: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(slot_id, SLOT_ID_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Enumerates candidate slots over a horizon. Strictly read-only: the turn
/// rotation is simulated on a local copy of the state and never committed,
/// so repeated calls cannot bias the real rotation.
pub struct SlotGenerator {
    allocator: Arc<TurnAllocator>,
    checker: Arc<AvailabilityChecker>,
}

impl SlotGenerator {
    pub fn new(allocator: Arc<TurnAllocator>, checker: Arc<AvailabilityChecker>) -> Self {
        Self { allocator, checker }
    }

    /// Slots across the whole pool, practitioner resolved per window by the
    /// simulated rotation with a single alternate fallback. Windows where
    /// nobody is free are skipped entirely.
    pub async fn generate(
        &self,
        horizon_days: Option<i64>,
    ) -> Result<Vec<InternalSlot>, SchedulingError> {
        let schedule = self.checker.schedule().clone();
        let horizon = horizon_days.unwrap_or(schedule.default_horizon_days);
        let now = Utc::now();

        let roster = self.allocator.roster().await?;
        let mut simulated_last = self.allocator.turn_state().await?.last_assigned;
        let mut turn_number: u32 = 0;

        let mut slots = Vec::new();

        for day_offset in 0..=horizon {
            let date = now.date_naive() + Duration::days(day_offset);
            let Some((open, close)) = schedule.window_for(date.weekday()) else {
                continue;
            };

            let mut window_start = date.and_time(open).and_utc();
            let day_close = date.and_time(close).and_utc();

            while window_start + schedule.slot_duration() <= day_close {
                let window_end = window_start + schedule.slot_duration();

                if window_start <= now {
                    window_start = window_end;
                    continue;
                }

                let candidate = next_in_rotation(&roster, simulated_last)
                    .ok_or(SchedulingError::NoPractitioners)?
                    .clone();
                simulated_last = Some(candidate.id);
                turn_number += 1;

                match self
                    .resolve_window(&roster, &candidate.id, window_start, window_end)
                    .await?
                {
                    Some(practitioner_id) => {
                        slots.push(InternalSlot {
                            slot_id: window_start.format(SLOT_ID_FORMAT).to_string(),
                            date,
                            start_time: window_start,
                            end_time: window_end,
                            practitioner_id,
                            turn_number,
                        });
                    }
                    None => {
                        debug!(
                            "No practitioner free {} - {}, skipping window",
                            window_start.format("%Y-%m-%d %H:%M"),
                            window_end.format("%H:%M")
                        );
                    }
                }

                window_start = window_end;
            }
        }

        info!("Generated {} available slots over {} days", slots.len(), horizon);
        Ok(slots)
    }

    /// Administrative view: slots for one fixed practitioner, no rotation.
    pub async fn generate_for_practitioner(
        &self,
        practitioner_id: Uuid,
        horizon_days: Option<i64>,
    ) -> Result<Vec<InternalSlot>, SchedulingError> {
        let schedule = self.checker.schedule().clone();
        let horizon = horizon_days.unwrap_or(schedule.default_horizon_days);
        let now = Utc::now();

        let mut slots = Vec::new();

        for day_offset in 0..=horizon {
            let date = now.date_naive() + Duration::days(day_offset);
            let Some((open, close)) = schedule.window_for(date.weekday()) else {
                continue;
            };

            let mut window_start = date.and_time(open).and_utc();
            let day_close = date.and_time(close).and_utc();

            while window_start + schedule.slot_duration() <= day_close {
                let window_end = window_start + schedule.slot_duration();

                if window_start <= now {
                    window_start = window_end;
                    continue;
                }

                let availability = self
                    .checker
                    .check(practitioner_id, window_start, window_end)
                    .await?;

                if availability.available {
                    slots.push(InternalSlot {
                        slot_id: window_start.format(SLOT_ID_FORMAT).to_string(),
                        date,
                        start_time: window_start,
                        end_time: window_end,
                        practitioner_id,
                        turn_number: 0,
                    });
                }

                window_start = window_end;
            }
        }

        Ok(slots)
    }

    async fn resolve_window(
        &self,
        roster: &[crate::models::Practitioner],
        candidate_id: &Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<Uuid>, SchedulingError> {
        let availability = self.checker.check(*candidate_id, start, end).await?;
        if availability.available {
            return Ok(Some(*candidate_id));
        }

        if let Some(alternate) = alternate_after(roster, *candidate_id, &[]) {
            let fallback = self.checker.check(alternate.id, start, end).await?;
            if fallback.available {
                debug!(
                    "Window {} reassigned {} -> {}",
                    start.format("%Y-%m-%d %H:%M"),
                    candidate_id,
                    alternate.id
                );
                return Ok(Some(alternate.id));
            }
        }

        Ok(None)
    }
}

/// The only path from internal to externally visible slots; practitioner
/// identity does not survive the conversion.
pub fn public_slots(slots: &[InternalSlot]) -> Vec<PublicSlot> {
    slots.iter().map(PublicSlot::from).collect()
}

pub fn group_by_day(slots: Vec<PublicSlot>) -> BTreeMap<NaiveDate, Vec<PublicSlot>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<PublicSlot>> = BTreeMap::new();
    for slot in slots {
        grouped.entry(slot.date).or_default().push(slot);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_id_round_trips() {
        let start = parse_slot_id("2030-01-03T10:00").unwrap();
        assert_eq!(start.format(SLOT_ID_FORMAT).to_string(), "2030-01-03T10:00");
    }

    #[test]
    fn malformed_slot_ids_are_rejected() {
        assert!(parse_slot_id("not-a-slot").is_none());
        assert!(parse_slot_id("2030-01-03").is_none());
        assert!(parse_slot_id("2030-13-90T99:99").is_none());
    }
}
