use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use trax_core::models::SeatClass;
use trax_core::order::{Order, OrderState, TicketLineItem};
use trax_core::repository::OrderRepository;
use trax_core::{BookingError, BookingResult, Segment};

use crate::storage_err;

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: String,
    schedule_id: Uuid,
    train_id: Uuid,
    from_seq: i32,
    to_seq: i32,
    total_cents: i64,
    state: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> BookingResult<Order> {
        let state = OrderState::parse(&self.state).ok_or_else(|| {
            BookingError::Storage(format!("unknown order state in store: {}", self.state))
        })?;
        let segment = Segment::new(self.from_seq, self.to_seq)
            .map_err(|e| BookingError::Storage(format!("corrupt order row: {e}")))?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            schedule_id: self.schedule_id,
            train_id: self.train_id,
            segment,
            total_cents: self.total_cents,
            state,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    order_id: Uuid,
    passenger_name: String,
    seat_id: Uuid,
    car_number: i16,
    seat_number: String,
    seat_class: String,
    price_cents: i64,
}

impl ItemRow {
    fn into_item(self) -> BookingResult<TicketLineItem> {
        let seat_class = SeatClass::parse(&self.seat_class).ok_or_else(|| {
            BookingError::Storage(format!("unknown seat class in store: {}", self.seat_class))
        })?;
        Ok(TicketLineItem {
            id: self.id,
            order_id: self.order_id,
            passenger_name: self.passenger_name,
            seat_id: self.seat_id,
            car_number: self.car_number,
            seat_number: self.seat_number,
            seat_class,
            price_cents: self.price_cents,
        })
    }
}

const SELECT_ORDER: &str = r#"
    SELECT id, user_id, schedule_id, train_id, from_seq, to_seq, total_cents,
           state, created_at, expires_at
    FROM orders
"#;

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create(&self, order: &Order, items: &[TicketLineItem]) -> BookingResult<()> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, schedule_id, train_id, from_seq, to_seq,
                                total_cents, state, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id)
        .bind(&order.user_id)
        .bind(order.schedule_id)
        .bind(order.train_id)
        .bind(order.segment.from_seq())
        .bind(order.segment.to_seq())
        .bind(order.total_cents)
        .bind(order.state.as_str())
        .bind(order.created_at)
        .bind(order.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO ticket_line_items (id, order_id, passenger_name, seat_id,
                                               car_number, seat_number, seat_class, price_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(&item.passenger_name)
            .bind(item.seat_id)
            .bind(item.car_number)
            .bind(&item.seat_number)
            .bind(item.seat_class.as_str())
            .bind(item.price_cents)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn get(&self, order_id: Uuid) -> BookingResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(OrderRow::into_order).transpose()
    }

    async fn items(&self, order_id: Uuid) -> BookingResult<Vec<TicketLineItem>> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, passenger_name, seat_id, car_number, seat_number,
                   seat_class, price_cents
            FROM ticket_line_items
            WHERE order_id = $1
            ORDER BY car_number, seat_number
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(ItemRow::into_item).collect()
    }

    async fn transition_state(
        &self,
        order_id: Uuid,
        from: OrderState,
        to: OrderState,
    ) -> BookingResult<bool> {
        let result = sqlx::query("UPDATE orders SET state = $1 WHERE id = $2 AND state = $3")
            .bind(to.as_str())
            .bind(order_id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, order_id: Uuid) -> BookingResult<()> {
        // Line items cascade with the order row.
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn delete_items(&self, order_id: Uuid) -> BookingResult<()> {
        sqlx::query("DELETE FROM ticket_line_items WHERE order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn expired_unpaid(&self, now: DateTime<Utc>) -> BookingResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE state = 'UNPAID' AND expires_at < $1 ORDER BY expires_at"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(OrderRow::into_order).collect()
    }

    async fn bump_cancellation_count(&self, user_id: &str, day: NaiveDate) -> BookingResult<i32> {
        let count: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO cancellation_counts (user_id, day, count)
            VALUES ($1, $2, 1)
            ON CONFLICT (user_id, day)
            DO UPDATE SET count = cancellation_counts.count + 1
            RETURNING count
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(count)
    }
}
