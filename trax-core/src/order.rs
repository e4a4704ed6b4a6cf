use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::SeatClass;
use crate::segment::Segment;
use crate::{BookingError, BookingResult};

/// Order status in the lifecycle. One-way machine: Unpaid is the only
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    Unpaid,
    Paid,
    Cancelled,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Unpaid => "UNPAID",
            OrderState::Paid => "PAID",
            OrderState::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(OrderState::Unpaid),
            "PAID" => Some(OrderState::Paid),
            "CANCELLED" => Some(OrderState::Cancelled),
            _ => None,
        }
    }
}

/// A customer's booking of one or more seats over one sub-journey.
///
/// Ids are opaque v4 UUIDs; callers must not assume structure or ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: String,
    pub schedule_id: Uuid,
    pub train_id: Uuid,
    pub segment: Segment,
    pub total_cents: i64,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        user_id: String,
        schedule_id: Uuid,
        train_id: Uuid,
        segment: Segment,
        total_cents: i64,
        hold: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            schedule_id,
            train_id,
            segment,
            total_cents,
            state: OrderState::Unpaid,
            created_at: now,
            expires_at: now + hold,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Unpaid → Paid. Any other starting state is rejected.
    pub fn mark_paid(&mut self) -> BookingResult<()> {
        self.transition(OrderState::Paid)
    }

    /// Unpaid → Cancelled. Any other starting state is rejected.
    pub fn mark_cancelled(&mut self) -> BookingResult<()> {
        self.transition(OrderState::Cancelled)
    }

    fn transition(&mut self, to: OrderState) -> BookingResult<()> {
        if self.state != OrderState::Unpaid {
            return Err(BookingError::NotAllowed(format!(
                "order {} is {} and cannot become {}",
                self.id,
                self.state.as_str(),
                to.as_str()
            )));
        }
        self.state = to;
        Ok(())
    }
}

/// One ticket within an order: one passenger, one seat, one segment lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketLineItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub passenger_name: String,
    pub seat_id: Uuid,
    pub car_number: i16,
    pub seat_number: String,
    pub seat_class: SeatClass,
    pub price_cents: i64,
}

impl TicketLineItem {
    pub fn new(
        order_id: Uuid,
        passenger_name: String,
        seat_id: Uuid,
        car_number: i16,
        seat_number: String,
        seat_class: SeatClass,
        price_cents: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            passenger_name,
            seat_id,
            car_number,
            seat_number,
            seat_class,
            price_cents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new(
            "user-1".to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Segment::new(1, 4).unwrap(),
            12000,
            Duration::minutes(20),
        )
    }

    #[test]
    fn test_unpaid_to_paid() {
        let mut o = order();
        o.mark_paid().unwrap();
        assert_eq!(o.state, OrderState::Paid);
    }

    #[test]
    fn test_terminal_states_never_transition() {
        let mut paid = order();
        paid.mark_paid().unwrap();
        assert!(paid.mark_cancelled().is_err());
        assert!(paid.mark_paid().is_err());

        let mut cancelled = order();
        cancelled.mark_cancelled().unwrap();
        assert!(cancelled.mark_paid().is_err());
        assert!(cancelled.mark_cancelled().is_err());
    }

    #[test]
    fn test_expiry_is_wall_clock() {
        let o = order();
        assert!(!o.is_expired(o.created_at));
        assert!(!o.is_expired(o.expires_at));
        assert!(o.is_expired(o.expires_at + Duration::seconds(1)));
    }
}
