use std::sync::Arc;

use uuid::Uuid;

use trax_core::repository::LockRepository;
use trax_core::{BookingResult, Segment};

/// The shared overlap predicate over the lock ledger.
///
/// Search, counting, allocation and the lock transaction all decide "is this
/// seat taken for this interval" through this one component, so there is a
/// single definition of conflict system-wide (pairwise comparison itself
/// lives in [`Segment::overlaps`]).
#[derive(Clone)]
pub struct ConflictDetector {
    locks: Arc<dyn LockRepository>,
}

impl ConflictDetector {
    pub fn new(locks: Arc<dyn LockRepository>) -> Self {
        Self { locks }
    }

    /// True iff any active (reserved or confirmed) lock on the seat overlaps
    /// the candidate segment.
    pub async fn conflicts(&self, seat_id: Uuid, segment: Segment) -> BookingResult<bool> {
        let active = self.locks.active_locks(seat_id).await?;
        Ok(active.iter().any(|lock| lock.segment.overlaps(&segment)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trax_store::MemoryStore;

    #[tokio::test]
    async fn test_cancelled_locks_do_not_conflict() {
        let store = Arc::new(MemoryStore::new());
        let detector = ConflictDetector::new(store.clone());
        let seat = Uuid::new_v4();
        let order = Uuid::new_v4();

        store
            .lock(seat, order, Segment::new(2, 5).unwrap())
            .await
            .unwrap();
        assert!(detector
            .conflicts(seat, Segment::new(4, 6).unwrap())
            .await
            .unwrap());

        store.release_order(order).await.unwrap();
        assert!(!detector
            .conflicts(seat, Segment::new(4, 6).unwrap())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_boundary_touch_is_not_a_conflict() {
        let store = Arc::new(MemoryStore::new());
        let detector = ConflictDetector::new(store.clone());
        let seat = Uuid::new_v4();

        store
            .lock(seat, Uuid::new_v4(), Segment::new(2, 5).unwrap())
            .await
            .unwrap();

        assert!(!detector
            .conflicts(seat, Segment::new(5, 8).unwrap())
            .await
            .unwrap());
        assert!(detector
            .conflicts(seat, Segment::new(1, 3).unwrap())
            .await
            .unwrap());
    }
}
