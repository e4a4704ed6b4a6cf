use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{LegFare, ScheduleSeat, SeatClass, SegmentLock};
use crate::order::{Order, OrderState, TicketLineItem};
use crate::segment::Segment;
use crate::BookingResult;

/// Read-only stop-sequence index, built by data import.
#[async_trait]
pub trait StopRepository: Send + Sync {
    /// Position of a station along one train's route, or None when the train
    /// does not call there.
    async fn sequence_of(&self, train_id: Uuid, station: &str) -> BookingResult<Option<i32>>;
}

/// Read-only seat inventory for scheduled runs, built by seat generation.
#[async_trait]
pub trait SeatRepository: Send + Sync {
    /// For-sale seats of one class on one run, ordered by (car, seat number)
    /// so allocation is deterministic.
    async fn seats_for_class(
        &self,
        schedule_id: Uuid,
        seat_class: SeatClass,
    ) -> BookingResult<Vec<ScheduleSeat>>;

    async fn seat(&self, seat_id: Uuid) -> BookingResult<Option<ScheduleSeat>>;
}

/// Read-only per-leg fares, built by data import.
#[async_trait]
pub trait FareRepository: Send + Sync {
    async fn leg_fares(
        &self,
        train_id: Uuid,
        seat_class: SeatClass,
    ) -> BookingResult<Vec<LegFare>>;
}

/// One seat to reserve as part of a multi-seat lock transaction.
#[derive(Debug, Clone, Copy)]
pub struct SeatLockRequest {
    pub seat_id: Uuid,
    pub segment: Segment,
}

/// The segment-lock ledger.
///
/// `lock` and `lock_all` are the engine's only serialization point: each
/// backend re-checks for overlapping active locks and inserts inside one
/// transaction, so at most one holder exists per overlapping interval.
/// State transitions never delete ledger rows.
#[async_trait]
pub trait LockRepository: Send + Sync {
    /// Reserved/Confirmed locks on a seat.
    async fn active_locks(&self, seat_id: Uuid) -> BookingResult<Vec<SegmentLock>>;

    /// Atomic check-then-insert of a single Reserved lock. Fails with
    /// `BookingError::Conflict` when an active lock overlaps.
    async fn lock(
        &self,
        seat_id: Uuid,
        order_id: Uuid,
        segment: Segment,
    ) -> BookingResult<SegmentLock>;

    /// Reserves every requested seat in one transaction, or none of them.
    async fn lock_all(
        &self,
        order_id: Uuid,
        requests: &[SeatLockRequest],
    ) -> BookingResult<Vec<SegmentLock>>;

    /// Reserved → Confirmed for all of an order's locks. Returns how many
    /// rows changed.
    async fn confirm_order(&self, order_id: Uuid) -> BookingResult<usize>;

    /// Reserved/Confirmed → Cancelled for all of an order's locks. Returns
    /// how many rows changed.
    async fn release_order(&self, order_id: Uuid) -> BookingResult<usize>;

    async fn locks_for_order(&self, order_id: Uuid) -> BookingResult<Vec<SegmentLock>>;

    /// Full ledger history for one seat, all states, oldest first. Audit.
    async fn seat_history(&self, seat_id: Uuid) -> BookingResult<Vec<SegmentLock>>;
}

/// Order aggregate persistence. An order exclusively owns its line items.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists the order and all of its line items in one transaction.
    async fn create(&self, order: &Order, items: &[TicketLineItem]) -> BookingResult<()>;

    async fn get(&self, order_id: Uuid) -> BookingResult<Option<Order>>;

    async fn items(&self, order_id: Uuid) -> BookingResult<Vec<TicketLineItem>>;

    /// Compare-and-set on the order state machine. Returns false when the
    /// order is missing or no longer in `from`; callers rely on this as the
    /// serialization point between concurrent lifecycle calls, so it must be
    /// atomic and must happen before any dependent side effect.
    async fn transition_state(
        &self,
        order_id: Uuid,
        from: OrderState,
        to: OrderState,
    ) -> BookingResult<bool>;

    /// Full rollback of a failed submission: removes the order and its line
    /// items entirely.
    async fn delete(&self, order_id: Uuid) -> BookingResult<()>;

    /// Removes the line items but keeps the order row (explicit cancel).
    async fn delete_items(&self, order_id: Uuid) -> BookingResult<()>;

    /// Unpaid orders whose hold lapsed before `now`. Feed for the sweep.
    async fn expired_unpaid(&self, now: DateTime<Utc>) -> BookingResult<Vec<Order>>;

    /// Per-user per-day cancellation counter, consumed by an external
    /// anti-abuse policy. Returns the new count.
    async fn bump_cancellation_count(&self, user_id: &str, day: NaiveDate) -> BookingResult<i32>;
}
