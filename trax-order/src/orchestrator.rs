use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use trax_core::models::{SeatClass, SeatOffer};
use trax_core::order::{Order, OrderState, TicketLineItem};
use trax_core::repository::{
    FareRepository, LockRepository, OrderRepository, SeatLockRequest, SeatRepository,
    StopRepository,
};
use trax_core::{BookingError, BookingResult, Segment};
use trax_inventory::{ConflictDetector, SeatAllocator, SegmentPriceCalculator};

use crate::models::{PassengerSpec, SubmitRequest};

/// Composes the allocator, the lock ledger and the order aggregate into the
/// submit / confirm-payment / cancel / expiry-sweep lifecycle.
///
/// Everything here depends on the repository traits, never on a concrete
/// store; coordination between concurrent requests happens entirely inside
/// the lock transaction.
pub struct BookingOrchestrator {
    stops: Arc<dyn StopRepository>,
    locks: Arc<dyn LockRepository>,
    orders: Arc<dyn OrderRepository>,
    allocator: SeatAllocator,
    hold: Duration,
}

impl BookingOrchestrator {
    pub fn new(
        stops: Arc<dyn StopRepository>,
        seats: Arc<dyn SeatRepository>,
        fares: Arc<dyn FareRepository>,
        locks: Arc<dyn LockRepository>,
        orders: Arc<dyn OrderRepository>,
        hold: Duration,
    ) -> Self {
        let allocator = SeatAllocator::new(
            seats,
            ConflictDetector::new(locks.clone()),
            SegmentPriceCalculator::new(fares),
        );
        Self {
            stops,
            locks,
            orders,
            allocator,
            hold,
        }
    }

    /// Books seats for every passenger, all-or-nothing.
    ///
    /// Allocation is optimistic and unlocked; the multi-row lock transaction
    /// afterwards decides any race. When locking fails the freshly created
    /// order is rolled back wholesale; `lock_all` is atomic, so there is
    /// never a partial lock set to clean up.
    pub async fn submit(&self, req: SubmitRequest) -> BookingResult<Order> {
        if req.passengers.is_empty() {
            return Err(BookingError::Validation(
                "an order needs at least one passenger".to_string(),
            ));
        }
        let segment = self.resolve_segment(req.train_id, &req.origin, &req.destination).await?;

        // Deterministic class order keeps allocation reproducible.
        let mut by_class: BTreeMap<SeatClass, Vec<&PassengerSpec>> = BTreeMap::new();
        for passenger in &req.passengers {
            by_class.entry(passenger.seat_class).or_default().push(passenger);
        }

        let mut assignments: Vec<(&PassengerSpec, SeatOffer)> = Vec::new();
        for (seat_class, group) in &by_class {
            let offers = self
                .allocator
                .find_seats(req.schedule_id, req.train_id, segment, *seat_class, group.len())
                .await?;
            if offers.len() < group.len() {
                info!(
                    schedule_id = %req.schedule_id,
                    class = seat_class.as_str(),
                    requested = group.len(),
                    available = offers.len(),
                    "submission aborted: not enough seats"
                );
                return Err(BookingError::Inventory {
                    requested: group.len(),
                    available: offers.len(),
                });
            }
            assignments.extend(group.iter().copied().zip(offers));
        }

        let total_cents = assignments.iter().map(|(_, offer)| offer.price_cents).sum();
        let order = Order::new(
            req.user_id.clone(),
            req.schedule_id,
            req.train_id,
            segment,
            total_cents,
            self.hold,
        );
        let items: Vec<TicketLineItem> = assignments
            .iter()
            .map(|(passenger, offer)| {
                TicketLineItem::new(
                    order.id,
                    passenger.name.clone(),
                    offer.seat.id,
                    offer.seat.car_number,
                    offer.seat.seat_number.clone(),
                    offer.seat.seat_class,
                    offer.price_cents,
                )
            })
            .collect();

        self.orders.create(&order, &items).await?;

        let lock_requests: Vec<SeatLockRequest> = items
            .iter()
            .map(|item| SeatLockRequest {
                seat_id: item.seat_id,
                segment,
            })
            .collect();
        if let Err(lock_err) = self.locks.lock_all(order.id, &lock_requests).await {
            // Another request won the window between allocation and locking.
            // Compensate by removing the order and its items entirely.
            if let Err(rollback_err) = self.orders.delete(order.id).await {
                error!(
                    order_id = %order.id,
                    error = %rollback_err,
                    "failed to roll back order after lock conflict"
                );
                return Err(rollback_err);
            }
            return Err(lock_err);
        }

        info!(
            order_id = %order.id,
            user_id = %order.user_id,
            seats = items.len(),
            total_cents,
            %segment,
            "order submitted"
        );
        Ok(order)
    }

    /// Marks an order paid, or reconciles it when the hold already lapsed.
    ///
    /// A late confirmation is not a generic failure: the caller gets
    /// `HoldExpired` so it can show "session expired" rather than "payment
    /// failed", and the seats are released on the spot.
    pub async fn confirm_payment(&self, order_id: Uuid) -> BookingResult<Order> {
        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| BookingError::not_found("order", order_id))?;

        if order.state != OrderState::Unpaid {
            return Err(BookingError::NotAllowed(format!(
                "order {} is {} and cannot be paid",
                order.id,
                order.state.as_str()
            )));
        }

        let now = Utc::now();
        if order.is_expired(now) {
            // Win the state machine before touching the ledger, so a racing
            // cancel or sweep cannot reconcile the same order twice.
            if !self
                .orders
                .transition_state(order.id, OrderState::Unpaid, OrderState::Cancelled)
                .await?
            {
                return Err(BookingError::NotAllowed(format!(
                    "order {} is no longer unpaid and cannot be paid",
                    order.id
                )));
            }
            let released = self.locks.release_order(order.id).await?;
            warn!(
                order_id = %order.id,
                released,
                expired_at = %order.expires_at,
                "payment arrived after the hold expired"
            );
            return Err(BookingError::HoldExpired(order.id));
        }

        if !self
            .orders
            .transition_state(order.id, OrderState::Unpaid, OrderState::Paid)
            .await?
        {
            return Err(BookingError::NotAllowed(format!(
                "order {} is no longer unpaid and cannot be paid",
                order.id
            )));
        }
        self.locks.confirm_order(order.id).await?;
        order.mark_paid()?;
        info!(order_id = %order.id, total_cents = order.total_cents, "payment confirmed");
        Ok(order)
    }

    /// Owner-initiated cancellation of an unpaid order.
    ///
    /// Never an idempotent success: a repeat cancel, a foreign requester or a
    /// paid order all fail with `NotAllowed` and cause no side effects.
    pub async fn cancel(&self, order_id: Uuid, requester: &str) -> BookingResult<()> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| BookingError::not_found("order", order_id))?;

        if order.user_id != requester {
            return Err(BookingError::NotAllowed(format!(
                "order {} does not belong to {}",
                order.id, requester
            )));
        }
        // The compare-and-set is the only gate: of any number of concurrent
        // cancels (or a racing payment), exactly one transitions the order,
        // and only that caller runs the side effects below.
        if !self
            .orders
            .transition_state(order.id, OrderState::Unpaid, OrderState::Cancelled)
            .await?
        {
            return Err(BookingError::NotAllowed(format!(
                "order {} is no longer unpaid and cannot be cancelled",
                order.id
            )));
        }

        self.locks.release_order(order.id).await?;
        self.orders.delete_items(order.id).await?;
        let count = self
            .orders
            .bump_cancellation_count(&order.user_id, Utc::now().date_naive())
            .await?;
        info!(
            order_id = %order.id,
            user_id = %order.user_id,
            cancellations_today = count,
            "order cancelled"
        );
        Ok(())
    }

    /// Reconciles unpaid orders whose owner never came back: same
    /// release-and-cancel as a timed-out payment. Returns how many orders
    /// were swept; a failure on one order is logged and does not stop the
    /// sweep.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> BookingResult<usize> {
        let expired = self.orders.expired_unpaid(now).await?;
        let mut swept = 0;
        for order in expired {
            // Skip orders that were paid or cancelled since the scan.
            match self
                .orders
                .transition_state(order.id, OrderState::Unpaid, OrderState::Cancelled)
                .await
            {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    error!(order_id = %order.id, error = %e, "sweep failed to cancel order");
                    continue;
                }
            }
            let released = match self.locks.release_order(order.id).await {
                Ok(n) => n,
                Err(e) => {
                    error!(order_id = %order.id, error = %e, "sweep failed to release locks");
                    continue;
                }
            };
            info!(
                order_id = %order.id,
                released,
                expired_at = %order.expires_at,
                "expired order reclaimed"
            );
            swept += 1;
        }
        Ok(swept)
    }

    async fn resolve_segment(
        &self,
        train_id: Uuid,
        origin: &str,
        destination: &str,
    ) -> BookingResult<Segment> {
        let from = self
            .stops
            .sequence_of(train_id, origin)
            .await?
            .ok_or_else(|| BookingError::not_found("station", origin))?;
        let to = self
            .stops
            .sequence_of(train_id, destination)
            .await?
            .ok_or_else(|| BookingError::not_found("station", destination))?;
        if from >= to {
            return Err(BookingError::Validation(format!(
                "{origin} (seq {from}) does not precede {destination} (seq {to}) on this route"
            )));
        }
        Segment::new(from, to)
    }
}
