// libs/appointment-cell/tests/allocator_test.rs
//
// Allocator behavior against an in-memory slot store: weekday walking,
// lowest-slot tie-break, saturation skips, the scan ceiling and lost races.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

use appointment_cell::models::{
    BookingError, PlaceOutcome, SeriesRequest, SlotAssignment,
};
use appointment_cell::services::allocator::{SlotAllocator, SlotStore, SLOT_CAPACITY};

// ==============================================================================
// TEST FIXTURES
// ==============================================================================

const CEILING: u32 = 150;

fn ten_oclock() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).unwrap()
}

/// 2025-03-10 is a Monday.
fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn weekdays(days: &[Weekday]) -> HashSet<Weekday> {
    days.iter().copied().collect()
}

/// Occupancy map plus an optional script of slots a "concurrent booking"
/// steals at the moment the allocator tries to place them.
struct InMemorySlotStore {
    occupancy: Mutex<HashMap<(NaiveDate, NaiveTime), BTreeSet<u8>>>,
    steal_once: Mutex<Vec<(NaiveDate, u8)>>,
}

impl InMemorySlotStore {
    fn new() -> Self {
        Self {
            occupancy: Mutex::new(HashMap::new()),
            steal_once: Mutex::new(Vec::new()),
        }
    }

    fn occupy(&self, day: NaiveDate, time: NaiveTime, slots: &[u8]) {
        let mut occupancy = self.occupancy.lock().unwrap();
        occupancy.entry((day, time)).or_default().extend(slots);
    }

    fn steal(&self, day: NaiveDate, slot: u8) {
        self.steal_once.lock().unwrap().push((day, slot));
    }

    fn slots_at(&self, day: NaiveDate, time: NaiveTime) -> BTreeSet<u8> {
        self.occupancy
            .lock()
            .unwrap()
            .get(&(day, time))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl SlotStore for InMemorySlotStore {
    async fn occupied_slots(
        &self,
        day: NaiveDate,
        time: NaiveTime,
    ) -> Result<BTreeSet<u8>, BookingError> {
        Ok(self.slots_at(day, time))
    }

    async fn place(&self, assignment: &SlotAssignment) -> Result<PlaceOutcome, BookingError> {
        let mut steal_once = self.steal_once.lock().unwrap();
        if let Some(pos) = steal_once
            .iter()
            .position(|(day, slot)| *day == assignment.date && *slot == assignment.slot_number)
        {
            // The rival booking commits first; the unique index rejects ours.
            steal_once.remove(pos);
            self.occupy(assignment.date, ten_oclock(), &[assignment.slot_number]);
            return Ok(PlaceOutcome::SlotTaken);
        }
        drop(steal_once);

        let mut occupancy = self.occupancy.lock().unwrap();
        let slots = occupancy
            .entry((assignment.date, ten_oclock()))
            .or_default();
        if !slots.insert(assignment.slot_number) {
            return Ok(PlaceOutcome::SlotTaken);
        }

        Ok(PlaceOutcome::Placed)
    }
}

async fn allocate(
    allocator: &SlotAllocator,
    store: &InMemorySlotStore,
    request: &SeriesRequest,
) -> Vec<SlotAssignment> {
    allocator.allocate(request, store).await.unwrap()
}

// ==============================================================================
// SCENARIOS
// ==============================================================================

#[tokio::test]
async fn monday_wednesday_series_fills_slot_one() {
    let allocator = SlotAllocator::new(CEILING);
    let store = InMemorySlotStore::new();
    let request = SeriesRequest::new(
        monday(),
        ten_oclock(),
        weekdays(&[Weekday::Mon, Weekday::Wed]),
        4,
    );

    let placed = allocate(&allocator, &store, &request).await;

    let dates: Vec<NaiveDate> = placed.iter().map(|a| a.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 17).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 19).unwrap(),
        ]
    );
    assert!(placed.iter().all(|a| a.slot_number == 1));
    assert!(placed[0].is_first_session);
    assert!(placed[1..].iter().all(|a| !a.is_first_session));
    assert_eq!(
        placed.iter().map(|a| a.session_number).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
}

#[tokio::test]
async fn occupied_first_slot_pushes_series_to_slot_two() {
    let allocator = SlotAllocator::new(CEILING);
    let store = InMemorySlotStore::new();
    store.occupy(monday(), ten_oclock(), &[1]);

    let request = SeriesRequest::new(
        monday(),
        ten_oclock(),
        weekdays(&[Weekday::Mon, Weekday::Wed]),
        4,
    );
    let placed = allocate(&allocator, &store, &request).await;

    assert_eq!(placed.len(), 4);
    assert_eq!(placed[0].slot_number, 2);
    assert!(placed[0].is_first_session);
    assert!(placed[1..].iter().all(|a| a.slot_number == 1));
}

#[tokio::test]
async fn saturated_day_is_skipped_without_consuming_a_session() {
    let allocator = SlotAllocator::new(CEILING);
    let store = InMemorySlotStore::new();
    let full_wednesday = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
    store.occupy(full_wednesday, ten_oclock(), &[1, 2, 3, 4, 5]);

    let request = SeriesRequest::new(
        monday(),
        ten_oclock(),
        weekdays(&[Weekday::Mon, Weekday::Wed]),
        4,
    );
    let placed = allocate(&allocator, &store, &request).await;

    let dates: Vec<NaiveDate> = placed.iter().map(|a| a.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 17).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 19).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 24).unwrap(),
        ]
    );
    assert_eq!(placed.len(), 4);
}

#[tokio::test]
async fn lost_race_retries_once_with_next_slot() {
    let allocator = SlotAllocator::new(CEILING);
    let store = InMemorySlotStore::new();
    // A rival booking grabs slot 1 on the first Monday right before we do.
    store.steal(monday(), 1);

    let request = SeriesRequest::new(monday(), ten_oclock(), weekdays(&[Weekday::Mon]), 2);
    let placed = allocate(&allocator, &store, &request).await;

    assert_eq!(placed.len(), 2);
    assert_eq!(placed[0].date, monday());
    assert_eq!(placed[0].slot_number, 2);
    assert!(placed[0].is_first_session);

    let slots = store.slots_at(monday(), ten_oclock());
    assert!(slots.contains(&1));
    assert!(slots.contains(&2));
}

#[tokio::test]
async fn scan_ceiling_truncates_the_series() {
    let allocator = SlotAllocator::new(CEILING);
    let store = InMemorySlotStore::new();

    let request = SeriesRequest::new(monday(), ten_oclock(), weekdays(&[Weekday::Mon]), 30);
    let placed = allocate(&allocator, &store, &request).await;

    // 150 scanned days starting on a Monday contain exactly 22 Mondays.
    assert_eq!(placed.len(), 22);
    assert!(placed.windows(2).all(|pair| pair[0].date < pair[1].date));
}

#[tokio::test]
async fn unreachable_weekday_yields_empty_series() {
    // A three-day ceiling never reaches the following Friday.
    let allocator = SlotAllocator::new(3);
    let store = InMemorySlotStore::new();

    let request = SeriesRequest::new(monday(), ten_oclock(), weekdays(&[Weekday::Fri]), 5);
    let placed = allocate(&allocator, &store, &request).await;

    assert!(placed.is_empty());
}

// ==============================================================================
// PROPERTIES
// ==============================================================================

#[tokio::test]
async fn placements_stay_inside_the_weekday_set_in_ascending_order() {
    let allocator = SlotAllocator::new(CEILING);
    let store = InMemorySlotStore::new();
    let targets = weekdays(&[Weekday::Tue, Weekday::Fri]);

    let request = SeriesRequest::new(monday(), ten_oclock(), targets.clone(), 6);
    let placed = allocate(&allocator, &store, &request).await;

    assert_eq!(placed.len(), 6);
    assert!(placed.iter().all(|a| targets.contains(&a.date.weekday())));
    assert!(placed.windows(2).all(|pair| pair[0].date < pair[1].date));
}

#[tokio::test]
async fn a_cell_never_exceeds_capacity_and_never_duplicates_slots() {
    let allocator = SlotAllocator::new(CEILING);
    let store = InMemorySlotStore::new();

    // Six single-session series all aiming at the same Monday.
    for expected_slot in 1..=6u8 {
        let request =
            SeriesRequest::new(monday(), ten_oclock(), weekdays(&[Weekday::Mon]), 1);
        let placed = allocate(&allocator, &store, &request).await;
        assert_eq!(placed.len(), 1);

        if expected_slot <= SLOT_CAPACITY {
            assert_eq!(placed[0].date, monday());
            assert_eq!(placed[0].slot_number, expected_slot);
        } else {
            // The sixth series finds Monday full and rolls to the next week.
            assert_eq!(placed[0].date, monday() + chrono::Duration::days(7));
            assert_eq!(placed[0].slot_number, 1);
        }
    }

    let slots = store.slots_at(monday(), ten_oclock());
    assert_eq!(slots, (1..=SLOT_CAPACITY).collect::<BTreeSet<u8>>());
}

#[tokio::test]
async fn requested_count_below_one_still_books_a_session() {
    let allocator = SlotAllocator::new(CEILING);
    let store = InMemorySlotStore::new();

    let request = SeriesRequest::new(monday(), ten_oclock(), weekdays(&[Weekday::Mon]), 0);
    assert_eq!(request.sessions, 1);

    let placed = allocate(&allocator, &store, &request).await;
    assert_eq!(placed.len(), 1);
}
