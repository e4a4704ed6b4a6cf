use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;

use trax_core::models::{LockState, SegmentLock};
use trax_core::repository::{LockRepository, SeatLockRequest};
use trax_core::{BookingError, BookingResult, Segment};

use crate::storage_err;

/// The one SQL spelling of the half-open overlap test. Mirrors
/// `Segment::overlaps`: an existing row `[from_seq, to_seq)` conflicts with a
/// candidate `[$2, $3)` iff `from_seq < $3 AND to_seq > $2`.
const ACTIVE_OVERLAP_COUNT: &str = r#"
    SELECT COUNT(*) FROM segment_locks
    WHERE seat_id = $1
      AND state IN ('RESERVED', 'CONFIRMED')
      AND from_seq < $3
      AND to_seq > $2
"#;

/// Postgres segment-lock ledger.
///
/// The check-then-insert in `lock`/`lock_all` runs after taking `FOR UPDATE`
/// row locks on the seats (in seat-id order, so two competing multi-seat
/// transactions cannot deadlock). The schema additionally carries a GiST
/// exclusion constraint over active lock ranges, so the disjointness
/// invariant holds even if a future caller bypasses this path.
pub struct PgLockRepository {
    pool: PgPool,
}

impl PgLockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn reserve_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
        req: &SeatLockRequest,
    ) -> BookingResult<SegmentLock> {
        // Serialize against concurrent lockers of the same seat.
        let seat_exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM schedule_seats WHERE id = $1 FOR UPDATE")
                .bind(req.seat_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(storage_err)?;
        if seat_exists.is_none() {
            return Err(BookingError::not_found("seat", req.seat_id));
        }

        let overlapping: i64 = sqlx::query_scalar(ACTIVE_OVERLAP_COUNT)
            .bind(req.seat_id)
            .bind(req.segment.from_seq())
            .bind(req.segment.to_seq())
            .fetch_one(&mut **tx)
            .await
            .map_err(storage_err)?;
        if overlapping > 0 {
            warn!(seat_id = %req.seat_id, segment = %req.segment, "lock lost the race");
            return Err(BookingError::Conflict {
                seat_id: req.seat_id,
            });
        }

        let lock = SegmentLock::reserve(req.seat_id, order_id, req.segment);
        sqlx::query(
            r#"
            INSERT INTO segment_locks (id, seat_id, order_id, from_seq, to_seq, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(lock.id)
        .bind(lock.seat_id)
        .bind(lock.order_id)
        .bind(lock.segment.from_seq())
        .bind(lock.segment.to_seq())
        .bind(lock.state.as_str())
        .bind(lock.created_at)
        .bind(lock.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(storage_err)?;

        Ok(lock)
    }

    async fn transition_order(
        &self,
        order_id: Uuid,
        from_states: &[&str],
        to: LockState,
    ) -> BookingResult<usize> {
        let from_states: Vec<String> = from_states.iter().map(|s| s.to_string()).collect();
        let result = sqlx::query(
            r#"
            UPDATE segment_locks
            SET state = $1, updated_at = NOW()
            WHERE order_id = $2 AND state = ANY($3)
            "#,
        )
        .bind(to.as_str())
        .bind(order_id)
        .bind(&from_states)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(result.rows_affected() as usize)
    }
}

#[derive(sqlx::FromRow)]
struct LockRow {
    id: Uuid,
    seat_id: Uuid,
    order_id: Uuid,
    from_seq: i32,
    to_seq: i32,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LockRow {
    fn into_lock(self) -> BookingResult<SegmentLock> {
        let state = LockState::parse(&self.state).ok_or_else(|| {
            BookingError::Storage(format!("unknown lock state in store: {}", self.state))
        })?;
        let segment = Segment::new(self.from_seq, self.to_seq)
            .map_err(|e| BookingError::Storage(format!("corrupt lock row: {e}")))?;
        Ok(SegmentLock {
            id: self.id,
            seat_id: self.seat_id,
            order_id: self.order_id,
            segment,
            state,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_LOCK: &str = r#"
    SELECT id, seat_id, order_id, from_seq, to_seq, state, created_at, updated_at
    FROM segment_locks
"#;

#[async_trait]
impl LockRepository for PgLockRepository {
    async fn active_locks(&self, seat_id: Uuid) -> BookingResult<Vec<SegmentLock>> {
        let rows: Vec<LockRow> = sqlx::query_as(&format!(
            "{SELECT_LOCK} WHERE seat_id = $1 AND state IN ('RESERVED', 'CONFIRMED')"
        ))
        .bind(seat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(LockRow::into_lock).collect()
    }

    async fn lock(
        &self,
        seat_id: Uuid,
        order_id: Uuid,
        segment: Segment,
    ) -> BookingResult<SegmentLock> {
        let mut locks = self
            .lock_all(order_id, &[SeatLockRequest { seat_id, segment }])
            .await?;
        Ok(locks.remove(0))
    }

    async fn lock_all(
        &self,
        order_id: Uuid,
        requests: &[SeatLockRequest],
    ) -> BookingResult<Vec<SegmentLock>> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        // Deterministic locking order across competing transactions.
        let mut ordered: Vec<&SeatLockRequest> = requests.iter().collect();
        ordered.sort_by_key(|req| req.seat_id);

        let mut locks = Vec::with_capacity(ordered.len());
        for req in ordered {
            match Self::reserve_in_tx(&mut tx, order_id, req).await {
                Ok(lock) => locks.push(lock),
                Err(e) => {
                    tx.rollback().await.map_err(storage_err)?;
                    return Err(e);
                }
            }
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(locks)
    }

    async fn confirm_order(&self, order_id: Uuid) -> BookingResult<usize> {
        self.transition_order(order_id, &["RESERVED"], LockState::Confirmed)
            .await
    }

    async fn release_order(&self, order_id: Uuid) -> BookingResult<usize> {
        self.transition_order(order_id, &["RESERVED", "CONFIRMED"], LockState::Cancelled)
            .await
    }

    async fn locks_for_order(&self, order_id: Uuid) -> BookingResult<Vec<SegmentLock>> {
        let rows: Vec<LockRow> = sqlx::query_as(&format!("{SELECT_LOCK} WHERE order_id = $1"))
            .bind(order_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.into_iter().map(LockRow::into_lock).collect()
    }

    async fn seat_history(&self, seat_id: Uuid) -> BookingResult<Vec<SegmentLock>> {
        let rows: Vec<LockRow> =
            sqlx::query_as(&format!("{SELECT_LOCK} WHERE seat_id = $1 ORDER BY created_at"))
                .bind(seat_id)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_err)?;
        rows.into_iter().map(LockRow::into_lock).collect()
    }
}
