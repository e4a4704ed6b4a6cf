use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::segment::Segment;

/// Seat classes sold on a scheduled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatClass {
    Business,
    First,
    Second,
}

impl SeatClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatClass::Business => "BUSINESS",
            SeatClass::First => "FIRST",
            SeatClass::Second => "SECOND",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUSINESS" => Some(SeatClass::Business),
            "FIRST" => Some(SeatClass::First),
            "SECOND" => Some(SeatClass::Second),
            _ => None,
        }
    }
}

/// One station call along a train's route. `sequence` is strictly increasing
/// along the route; immutable once imported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub train_id: Uuid,
    pub station: String,
    pub sequence: i32,
    pub arrival: Option<DateTime<Utc>>,
    pub departure: Option<DateTime<Utc>>,
}

/// One physical seat on one scheduled run.
///
/// `for_sale` is a coarse "withdrawn from sale" override only. Per-segment
/// availability is decided exclusively by the segment-lock ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSeat {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub train_id: Uuid,
    pub car_number: i16,
    pub seat_number: String,
    pub seat_class: SeatClass,
    pub base_price_cents: i64,
    pub for_sale: bool,
}

/// Lifecycle state of a segment lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockState {
    Reserved,
    Confirmed,
    Cancelled,
}

impl LockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockState::Reserved => "RESERVED",
            LockState::Confirmed => "CONFIRMED",
            LockState::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RESERVED" => Some(LockState::Reserved),
            "CONFIRMED" => Some(LockState::Confirmed),
            "CANCELLED" => Some(LockState::Cancelled),
            _ => None,
        }
    }

    /// Active locks block overlapping bookings; cancelled ones are history.
    pub fn is_active(&self) -> bool {
        matches!(self, LockState::Reserved | LockState::Confirmed)
    }
}

/// One entry in the per-seat booking ledger.
///
/// Invariant: for a fixed seat, all active locks are pairwise disjoint under
/// half-open semantics. Locks transition state but are never deleted; the
/// ledger stays queryable to answer "why is seat X unavailable for [a, b)"
/// long after the owning order is gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentLock {
    pub id: Uuid,
    pub seat_id: Uuid,
    pub order_id: Uuid,
    pub segment: Segment,
    pub state: LockState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SegmentLock {
    pub fn reserve(seat_id: Uuid, order_id: Uuid, segment: Segment) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            seat_id,
            order_id,
            segment,
            state: LockState::Reserved,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Stored fare for one leg of a route, per seat class. Leg rows are produced
/// by data import and are assumed to partition the route exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegFare {
    pub train_id: Uuid,
    pub seat_class: SeatClass,
    pub leg: Segment,
    pub price_cents: i64,
}

/// A candidate seat returned by the allocator, annotated with the fare for
/// the requested sub-journey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatOffer {
    pub seat: ScheduleSeat,
    pub price_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_class_round_trip() {
        for class in [SeatClass::Business, SeatClass::First, SeatClass::Second] {
            assert_eq!(SeatClass::parse(class.as_str()), Some(class));
        }
        assert_eq!(SeatClass::parse("COACH"), None);
    }

    #[test]
    fn test_lock_state_activity() {
        assert!(LockState::Reserved.is_active());
        assert!(LockState::Confirmed.is_active());
        assert!(!LockState::Cancelled.is_active());
    }
}
