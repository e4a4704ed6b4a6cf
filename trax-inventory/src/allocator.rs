use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use trax_core::models::{SeatClass, SeatOffer};
use trax_core::repository::SeatRepository;
use trax_core::{BookingError, BookingResult, Segment};

use crate::conflict::ConflictDetector;
use crate::pricing::SegmentPriceCalculator;

/// Finds free seats of a class for an interval.
///
/// Purely a read: nothing is reserved here. Concurrent allocations may offer
/// the same seat to two callers; the lock transaction downstream fails the
/// loser. Seats come back in (car, seat number) order so repeated calls are
/// reproducible.
#[derive(Clone)]
pub struct SeatAllocator {
    seats: Arc<dyn SeatRepository>,
    detector: ConflictDetector,
    pricing: SegmentPriceCalculator,
}

impl SeatAllocator {
    pub fn new(
        seats: Arc<dyn SeatRepository>,
        detector: ConflictDetector,
        pricing: SegmentPriceCalculator,
    ) -> Self {
        Self {
            seats,
            detector,
            pricing,
        }
    }

    /// Up to `count` conflict-free seats, each annotated with the fare for
    /// the requested segment. A list shorter than `count` means the run is
    /// short on inventory; callers must treat that as a failed request, not
    /// a partial success.
    pub async fn find_seats(
        &self,
        schedule_id: Uuid,
        train_id: Uuid,
        segment: Segment,
        seat_class: SeatClass,
        count: usize,
    ) -> BookingResult<Vec<SeatOffer>> {
        if count == 0 {
            return Err(BookingError::Validation(
                "seat count must be at least 1".to_string(),
            ));
        }

        let mut offers = Vec::with_capacity(count);
        for seat in self.seats.seats_for_class(schedule_id, seat_class).await? {
            if offers.len() == count {
                break;
            }
            if self.detector.conflicts(seat.id, segment).await? {
                continue;
            }
            let price_cents = self
                .pricing
                .price_for(train_id, seat_class, segment, seat.base_price_cents)
                .await?;
            offers.push(SeatOffer { seat, price_cents });
        }

        debug!(
            %schedule_id,
            class = seat_class.as_str(),
            %segment,
            requested = count,
            offered = offers.len(),
            "seat allocation scan"
        );
        Ok(offers)
    }
}
