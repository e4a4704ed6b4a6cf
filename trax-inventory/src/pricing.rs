use std::sync::Arc;

use uuid::Uuid;

use trax_core::models::SeatClass;
use trax_core::repository::FareRepository;
use trax_core::{BookingResult, Segment};

/// Aggregates per-leg fares for a sub-journey.
///
/// Leg rows are assumed to partition the route exactly, so summing the legs
/// fully contained in the travelled segment yields the exact fare. When no
/// leg rows exist at all for a train/class, the seat's full-route base price
/// is charged instead. A leg straddling a boundary would mean malformed
/// import data and is simply not counted.
#[derive(Clone)]
pub struct SegmentPriceCalculator {
    fares: Arc<dyn FareRepository>,
}

impl SegmentPriceCalculator {
    pub fn new(fares: Arc<dyn FareRepository>) -> Self {
        Self { fares }
    }

    pub async fn price_for(
        &self,
        train_id: Uuid,
        seat_class: SeatClass,
        segment: Segment,
        base_price_cents: i64,
    ) -> BookingResult<i64> {
        let legs = self.fares.leg_fares(train_id, seat_class).await?;
        if legs.is_empty() {
            return Ok(base_price_cents);
        }
        Ok(legs
            .iter()
            .filter(|fare| segment.contains(&fare.leg))
            .map(|fare| fare.price_cents)
            .sum())
    }
}
