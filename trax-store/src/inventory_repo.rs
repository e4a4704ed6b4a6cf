use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use trax_core::models::{LegFare, ScheduleSeat, SeatClass};
use trax_core::repository::{FareRepository, SeatRepository, StopRepository};
use trax_core::{BookingError, BookingResult, Segment};

use crate::storage_err;

/// Postgres-backed read side: stop index, seat inventory and leg fares.
/// All three tables are written by external import jobs and only read here.
pub struct PgInventoryRepository {
    pool: PgPool,
}

impl PgInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: Uuid,
    schedule_id: Uuid,
    train_id: Uuid,
    car_number: i16,
    seat_number: String,
    seat_class: String,
    base_price_cents: i64,
    for_sale: bool,
}

impl SeatRow {
    fn into_seat(self) -> BookingResult<ScheduleSeat> {
        let seat_class = SeatClass::parse(&self.seat_class).ok_or_else(|| {
            BookingError::Storage(format!("unknown seat class in store: {}", self.seat_class))
        })?;
        Ok(ScheduleSeat {
            id: self.id,
            schedule_id: self.schedule_id,
            train_id: self.train_id,
            car_number: self.car_number,
            seat_number: self.seat_number,
            seat_class,
            base_price_cents: self.base_price_cents,
            for_sale: self.for_sale,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FareRow {
    train_id: Uuid,
    seat_class: String,
    from_seq: i32,
    to_seq: i32,
    price_cents: i64,
}

impl FareRow {
    fn into_fare(self) -> BookingResult<LegFare> {
        let seat_class = SeatClass::parse(&self.seat_class).ok_or_else(|| {
            BookingError::Storage(format!("unknown seat class in store: {}", self.seat_class))
        })?;
        let leg = Segment::new(self.from_seq, self.to_seq)
            .map_err(|e| BookingError::Storage(format!("corrupt fare leg row: {e}")))?;
        Ok(LegFare {
            train_id: self.train_id,
            seat_class,
            leg,
            price_cents: self.price_cents,
        })
    }
}

#[async_trait]
impl StopRepository for PgInventoryRepository {
    async fn sequence_of(&self, train_id: Uuid, station: &str) -> BookingResult<Option<i32>> {
        let seq: Option<i32> = sqlx::query_scalar(
            "SELECT sequence FROM stops WHERE train_id = $1 AND station = $2",
        )
        .bind(train_id)
        .bind(station)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(seq)
    }
}

#[async_trait]
impl SeatRepository for PgInventoryRepository {
    async fn seats_for_class(
        &self,
        schedule_id: Uuid,
        seat_class: SeatClass,
    ) -> BookingResult<Vec<ScheduleSeat>> {
        let rows: Vec<SeatRow> = sqlx::query_as(
            r#"
            SELECT id, schedule_id, train_id, car_number, seat_number, seat_class,
                   base_price_cents, for_sale
            FROM schedule_seats
            WHERE schedule_id = $1 AND seat_class = $2 AND for_sale
            ORDER BY car_number, seat_number
            "#,
        )
        .bind(schedule_id)
        .bind(seat_class.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(SeatRow::into_seat).collect()
    }

    async fn seat(&self, seat_id: Uuid) -> BookingResult<Option<ScheduleSeat>> {
        let row: Option<SeatRow> = sqlx::query_as(
            r#"
            SELECT id, schedule_id, train_id, car_number, seat_number, seat_class,
                   base_price_cents, for_sale
            FROM schedule_seats
            WHERE id = $1
            "#,
        )
        .bind(seat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(SeatRow::into_seat).transpose()
    }
}

#[async_trait]
impl FareRepository for PgInventoryRepository {
    async fn leg_fares(
        &self,
        train_id: Uuid,
        seat_class: SeatClass,
    ) -> BookingResult<Vec<LegFare>> {
        let rows: Vec<FareRow> = sqlx::query_as(
            r#"
            SELECT train_id, seat_class, from_seq, to_seq, price_cents
            FROM leg_fares
            WHERE train_id = $1 AND seat_class = $2
            ORDER BY from_seq
            "#,
        )
        .bind(train_id)
        .bind(seat_class.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(FareRow::into_fare).collect()
    }
}
