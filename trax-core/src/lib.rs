pub mod models;
pub mod order;
pub mod repository;
pub mod segment;

pub use models::{LegFare, LockState, ScheduleSeat, SeatClass, SegmentLock, Stop};
pub use order::{Order, OrderState, TicketLineItem};
pub use segment::Segment;

use uuid::Uuid;

/// Unified error taxonomy for the booking engine.
///
/// `Inventory`, `Conflict` and `HoldExpired` are expected control flow: the
/// orchestrator matches on them to drive compensating actions or to surface a
/// distinguishable "session expired" signal. `Storage` always means the
/// surrounding transaction was rolled back.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("insufficient inventory: requested {requested}, available {available}")]
    Inventory { requested: usize, available: usize },

    #[error("seat {seat_id} is already locked for an overlapping segment")]
    Conflict { seat_id: Uuid },

    #[error("order {0} hold expired before payment was confirmed")]
    HoldExpired(Uuid),

    #[error("operation not allowed: {0}")]
    NotAllowed(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl BookingError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
