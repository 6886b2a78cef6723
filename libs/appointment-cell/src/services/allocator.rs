// libs/appointment-cell/src/services/allocator.rs
use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use tracing::{debug, info};

use crate::models::{BookingError, PlaceOutcome, SeriesRequest, SlotAssignment};

/// Five parallel treatment stations per (day, time) cell, numbered 1-5.
pub const SLOT_CAPACITY: u8 = 5;

/// Occupancy seam between the allocator and the appointment table.
///
/// `place` must persist the assignment before the allocator's next
/// `occupied_slots` read: within one series each placement has to be visible
/// to the reads that follow it, so the walk is strictly sequential.
#[async_trait]
pub trait SlotStore {
    /// Slot numbers claimed by non-cancelled appointments at (day, time).
    async fn occupied_slots(
        &self,
        day: NaiveDate,
        time: NaiveTime,
    ) -> Result<BTreeSet<u8>, BookingError>;

    async fn place(&self, assignment: &SlotAssignment) -> Result<PlaceOutcome, BookingError>;
}

pub struct SlotAllocator {
    capacity: u8,
    scan_ceiling_days: u32,
}

impl SlotAllocator {
    pub fn new(scan_ceiling_days: u32) -> Self {
        Self {
            capacity: SLOT_CAPACITY,
            scan_ceiling_days,
        }
    }

    /// Walk forward one calendar day at a time from the start date and fill
    /// the series: on each target weekday take the lowest free slot, skip
    /// saturated days without consuming a session, stop once the requested
    /// count is placed or the scan ceiling is reached. Returns whatever was
    /// placed; callers detect partial fulfillment by comparing lengths.
    pub async fn allocate<S>(
        &self,
        request: &SeriesRequest,
        store: &S,
    ) -> Result<Vec<SlotAssignment>, BookingError>
    where
        S: SlotStore + ?Sized,
    {
        let mut placed: Vec<SlotAssignment> = Vec::new();
        let mut day = request.start_date;
        let mut visited = 0u32;

        while (placed.len() as u32) < request.sessions && visited < self.scan_ceiling_days {
            visited += 1;
            let current = day;
            day += Duration::days(1);

            if !request.weekdays.contains(&current.weekday()) {
                continue;
            }

            if let Some(assignment) = self
                .claim_day(request, store, current, placed.len() as u32)
                .await?
            {
                placed.push(assignment);
            }
        }

        if (placed.len() as u32) < request.sessions {
            info!(
                "Series truncated at {} of {} sessions after visiting {} days",
                placed.len(),
                request.sessions,
                visited
            );
        }

        Ok(placed)
    }

    /// Claim the lowest free slot on `day`. A lost race (another booking took
    /// the slot between the read and the write) is retried once against fresh
    /// occupancy; after that the day is given up and the scan moves on.
    async fn claim_day<S>(
        &self,
        request: &SeriesRequest,
        store: &S,
        day: NaiveDate,
        already_placed: u32,
    ) -> Result<Option<SlotAssignment>, BookingError>
    where
        S: SlotStore + ?Sized,
    {
        for attempt in 0..2 {
            let occupied = store.occupied_slots(day, request.time).await?;
            let free = (1..=self.capacity).find(|slot| !occupied.contains(slot));

            let Some(slot_number) = free else {
                debug!("All slots taken on {} at {}, skipping day", day, request.time);
                return Ok(None);
            };

            let assignment = SlotAssignment {
                date: day,
                slot_number,
                session_number: already_placed + 1,
                is_first_session: already_placed == 0,
            };

            match store.place(&assignment).await? {
                PlaceOutcome::Placed => return Ok(Some(assignment)),
                PlaceOutcome::SlotTaken => {
                    debug!(
                        "Lost slot {} on {} to a concurrent booking (attempt {})",
                        slot_number, day, attempt
                    );
                }
            }
        }

        Ok(None)
    }
}
