use std::sync::Arc;

use uuid::Uuid;

use trax_core::models::SeatClass;
use trax_core::repository::SeatRepository;
use trax_core::{BookingResult, Segment};

use crate::conflict::ConflictDetector;

/// Counts seats of a class with no active lock over an interval. Backs both
/// search display and capacity checks, and intentionally shares its filter
/// (for-sale seats + [`ConflictDetector`]) with the allocator so the two can
/// never drift apart.
#[derive(Clone)]
pub struct AvailabilityCounter {
    seats: Arc<dyn SeatRepository>,
    detector: ConflictDetector,
}

impl AvailabilityCounter {
    pub fn new(seats: Arc<dyn SeatRepository>, detector: ConflictDetector) -> Self {
        Self { seats, detector }
    }

    pub async fn count_available(
        &self,
        schedule_id: Uuid,
        segment: Segment,
        seat_class: SeatClass,
    ) -> BookingResult<usize> {
        let mut free = 0;
        for seat in self.seats.seats_for_class(schedule_id, seat_class).await? {
            if !self.detector.conflicts(seat.id, segment).await? {
                free += 1;
            }
        }
        Ok(free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trax_core::models::ScheduleSeat;
    use trax_core::repository::LockRepository;
    use trax_store::MemoryStore;

    fn seat(schedule_id: Uuid, train_id: Uuid, car: i16, number: &str) -> ScheduleSeat {
        ScheduleSeat {
            id: Uuid::new_v4(),
            schedule_id,
            train_id,
            car_number: car,
            seat_number: number.to_string(),
            seat_class: SeatClass::Second,
            base_price_cents: 10000,
            for_sale: true,
        }
    }

    #[tokio::test]
    async fn test_count_tracks_locks_and_releases() {
        let store = Arc::new(MemoryStore::new());
        let schedule_id = Uuid::new_v4();
        let train_id = Uuid::new_v4();

        let a = seat(schedule_id, train_id, 1, "01A");
        let b = seat(schedule_id, train_id, 1, "01B");
        store.add_seat(a.clone());
        store.add_seat(b.clone());

        let counter = AvailabilityCounter::new(
            store.clone() as Arc<dyn SeatRepository>,
            ConflictDetector::new(store.clone()),
        );

        let trip = Segment::new(1, 4).unwrap();
        assert_eq!(
            counter
                .count_available(schedule_id, trip, SeatClass::Second)
                .await
                .unwrap(),
            2
        );

        let order = Uuid::new_v4();
        store
            .lock(a.id, order, Segment::new(2, 5).unwrap())
            .await
            .unwrap();
        assert_eq!(
            counter
                .count_available(schedule_id, trip, SeatClass::Second)
                .await
                .unwrap(),
            1
        );

        store.release_order(order).await.unwrap();
        assert_eq!(
            counter
                .count_available(schedule_id, trip, SeatClass::Second)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_withdrawn_seats_are_never_counted() {
        let store = Arc::new(MemoryStore::new());
        let schedule_id = Uuid::new_v4();
        let mut withdrawn = seat(schedule_id, Uuid::new_v4(), 2, "11C");
        withdrawn.for_sale = false;
        store.add_seat(withdrawn);

        let counter = AvailabilityCounter::new(
            store.clone() as Arc<dyn SeatRepository>,
            ConflictDetector::new(store.clone()),
        );

        assert_eq!(
            counter
                .count_available(schedule_id, Segment::new(0, 3).unwrap(), SeatClass::Second)
                .await
                .unwrap(),
            0
        );
    }
}
