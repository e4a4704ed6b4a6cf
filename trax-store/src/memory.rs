use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use trax_core::models::{LegFare, LockState, ScheduleSeat, SeatClass, SegmentLock, Stop};
use trax_core::order::{Order, OrderState, TicketLineItem};
use trax_core::repository::{
    FareRepository, LockRepository, OrderRepository, SeatLockRequest, SeatRepository,
    StopRepository,
};
use trax_core::{BookingError, BookingResult, Segment};

#[derive(Default)]
struct Inner {
    stops: Vec<Stop>,
    seats: HashMap<Uuid, ScheduleSeat>,
    fares: Vec<LegFare>,
    locks: Vec<SegmentLock>,
    orders: HashMap<Uuid, Order>,
    items: HashMap<Uuid, Vec<TicketLineItem>>,
    cancellations: HashMap<(String, NaiveDate), i32>,
}

/// In-memory implementation of every repository trait.
///
/// All mutations go through one mutex, which makes `lock_all`'s
/// check-then-insert trivially atomic, the same guarantee the Postgres
/// backend gets from row locks and its exclusion constraint. Used by the
/// integration tests and as an embedded backend; the `add_*` loaders stand in
/// for the external data-import collaborators.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn add_stop(&self, stop: Stop) {
        self.guard().stops.push(stop);
    }

    pub fn add_seat(&self, seat: ScheduleSeat) {
        self.guard().seats.insert(seat.id, seat);
    }

    pub fn add_leg_fare(&self, fare: LegFare) {
        self.guard().fares.push(fare);
    }

    /// Ledger rows for assertions, all seats and states.
    pub fn all_locks(&self) -> Vec<SegmentLock> {
        self.guard().locks.clone()
    }

    /// Number of persisted orders, for rollback assertions.
    pub fn order_count(&self) -> usize {
        self.guard().orders.len()
    }

    pub fn cancellation_count(&self, user_id: &str, day: NaiveDate) -> i32 {
        self.guard()
            .cancellations
            .get(&(user_id.to_string(), day))
            .copied()
            .unwrap_or(0)
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn overlapping_active(inner: &Inner, seat_id: Uuid, segment: Segment) -> bool {
    inner
        .locks
        .iter()
        .any(|l| l.seat_id == seat_id && l.state.is_active() && l.segment.overlaps(&segment))
}

#[async_trait]
impl StopRepository for MemoryStore {
    async fn sequence_of(&self, train_id: Uuid, station: &str) -> BookingResult<Option<i32>> {
        Ok(self
            .guard()
            .stops
            .iter()
            .find(|s| s.train_id == train_id && s.station == station)
            .map(|s| s.sequence))
    }
}

#[async_trait]
impl SeatRepository for MemoryStore {
    async fn seats_for_class(
        &self,
        schedule_id: Uuid,
        seat_class: SeatClass,
    ) -> BookingResult<Vec<ScheduleSeat>> {
        let mut seats: Vec<ScheduleSeat> = self
            .guard()
            .seats
            .values()
            .filter(|s| s.schedule_id == schedule_id && s.seat_class == seat_class && s.for_sale)
            .cloned()
            .collect();
        seats.sort_by(|a, b| {
            (a.car_number, a.seat_number.as_str()).cmp(&(b.car_number, b.seat_number.as_str()))
        });
        Ok(seats)
    }

    async fn seat(&self, seat_id: Uuid) -> BookingResult<Option<ScheduleSeat>> {
        Ok(self.guard().seats.get(&seat_id).cloned())
    }
}

#[async_trait]
impl FareRepository for MemoryStore {
    async fn leg_fares(
        &self,
        train_id: Uuid,
        seat_class: SeatClass,
    ) -> BookingResult<Vec<LegFare>> {
        Ok(self
            .guard()
            .fares
            .iter()
            .filter(|f| f.train_id == train_id && f.seat_class == seat_class)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LockRepository for MemoryStore {
    async fn active_locks(&self, seat_id: Uuid) -> BookingResult<Vec<SegmentLock>> {
        Ok(self
            .guard()
            .locks
            .iter()
            .filter(|l| l.seat_id == seat_id && l.state.is_active())
            .cloned()
            .collect())
    }

    async fn lock(
        &self,
        seat_id: Uuid,
        order_id: Uuid,
        segment: Segment,
    ) -> BookingResult<SegmentLock> {
        let mut inner = self.guard();
        if overlapping_active(&inner, seat_id, segment) {
            return Err(BookingError::Conflict { seat_id });
        }
        let lock = SegmentLock::reserve(seat_id, order_id, segment);
        inner.locks.push(lock.clone());
        Ok(lock)
    }

    async fn lock_all(
        &self,
        order_id: Uuid,
        requests: &[SeatLockRequest],
    ) -> BookingResult<Vec<SegmentLock>> {
        // Check every seat before inserting anything: all or nothing under
        // one mutex guard.
        let mut inner = self.guard();
        for req in requests {
            if overlapping_active(&inner, req.seat_id, req.segment) {
                return Err(BookingError::Conflict {
                    seat_id: req.seat_id,
                });
            }
        }
        let locks: Vec<SegmentLock> = requests
            .iter()
            .map(|req| SegmentLock::reserve(req.seat_id, order_id, req.segment))
            .collect();
        inner.locks.extend(locks.iter().cloned());
        Ok(locks)
    }

    async fn confirm_order(&self, order_id: Uuid) -> BookingResult<usize> {
        let mut changed = 0;
        for lock in self.guard().locks.iter_mut() {
            if lock.order_id == order_id && lock.state == LockState::Reserved {
                lock.state = LockState::Confirmed;
                lock.updated_at = Utc::now();
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn release_order(&self, order_id: Uuid) -> BookingResult<usize> {
        let mut changed = 0;
        for lock in self.guard().locks.iter_mut() {
            if lock.order_id == order_id && lock.state.is_active() {
                lock.state = LockState::Cancelled;
                lock.updated_at = Utc::now();
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn locks_for_order(&self, order_id: Uuid) -> BookingResult<Vec<SegmentLock>> {
        Ok(self
            .guard()
            .locks
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn seat_history(&self, seat_id: Uuid) -> BookingResult<Vec<SegmentLock>> {
        let mut history: Vec<SegmentLock> = self
            .guard()
            .locks
            .iter()
            .filter(|l| l.seat_id == seat_id)
            .cloned()
            .collect();
        history.sort_by_key(|l| l.created_at);
        Ok(history)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn create(&self, order: &Order, items: &[TicketLineItem]) -> BookingResult<()> {
        let mut inner = self.guard();
        if inner.orders.contains_key(&order.id) {
            return Err(BookingError::Storage(format!(
                "order {} already exists",
                order.id
            )));
        }
        inner.orders.insert(order.id, order.clone());
        inner.items.insert(order.id, items.to_vec());
        Ok(())
    }

    async fn get(&self, order_id: Uuid) -> BookingResult<Option<Order>> {
        Ok(self.guard().orders.get(&order_id).cloned())
    }

    async fn items(&self, order_id: Uuid) -> BookingResult<Vec<TicketLineItem>> {
        Ok(self.guard().items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn transition_state(
        &self,
        order_id: Uuid,
        from: OrderState,
        to: OrderState,
    ) -> BookingResult<bool> {
        let mut inner = self.guard();
        match inner.orders.get_mut(&order_id) {
            Some(order) if order.state == from => {
                order.state = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, order_id: Uuid) -> BookingResult<()> {
        let mut inner = self.guard();
        inner.orders.remove(&order_id);
        inner.items.remove(&order_id);
        Ok(())
    }

    async fn delete_items(&self, order_id: Uuid) -> BookingResult<()> {
        self.guard().items.remove(&order_id);
        Ok(())
    }

    async fn expired_unpaid(&self, now: DateTime<Utc>) -> BookingResult<Vec<Order>> {
        Ok(self
            .guard()
            .orders
            .values()
            .filter(|o| o.state == OrderState::Unpaid && o.is_expired(now))
            .cloned()
            .collect())
    }

    async fn bump_cancellation_count(&self, user_id: &str, day: NaiveDate) -> BookingResult<i32> {
        let mut inner = self.guard();
        let count = inner
            .cancellations
            .entry((user_id.to_string(), day))
            .or_insert(0);
        *count += 1;
        Ok(*count)
    }
}
