use async_trait::async_trait;
use tracing::debug;

use super::{CommitOutcome, SeatStore, StoreError};
use crate::database::Database;
use crate::models::{Seat, SeatKey, UserId};

type SeatRow = (i32, i32, Option<UserId>);

fn seat_from_row((row, seat_number, reserved_by): SeatRow) -> Seat {
    Seat { row, seat_number, reserved_by }
}

/// Хранилище мест в Postgres. Каждый `commit` - отдельная транзакция,
/// блокирующая целевые строки в порядке (ряд, номер).
#[derive(Clone)]
pub struct PgSeatStore {
    db: Database,
}

impl PgSeatStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SeatStore for PgSeatStore {
    async fn snapshot(&self) -> Result<Vec<Seat>, StoreError> {
        // один SELECT - одна точка во времени
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT seat_row, seat_number, reserved_by FROM seats ORDER BY seat_row, seat_number",
        )
        .fetch_all(&self.db.pool)
        .await?;

        Ok(rows.into_iter().map(seat_from_row).collect())
    }

    async fn commit(&self, keys: &[SeatKey], user_id: UserId) -> Result<CommitOutcome, StoreError> {
        let mut sorted = keys.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let (rows, numbers): (Vec<i32>, Vec<i32>) =
            sorted.iter().map(|k| (k.row, k.seat_number)).unzip();

        let mut tx = self.db.pool.begin().await?;

        // 1) Блокируем строки в фиксированном порядке, чтобы пересекающиеся коммиты не ловили дедлок
        let locked = sqlx::query_as::<_, SeatRow>(
            r#"
            SELECT s.seat_row, s.seat_number, s.reserved_by
            FROM seats s
            JOIN UNNEST($1::int4[], $2::int4[]) AS t(seat_row, seat_number)
              ON s.seat_row = t.seat_row AND s.seat_number = t.seat_number
            ORDER BY s.seat_row, s.seat_number
            FOR UPDATE OF s
            "#,
        )
        .bind(&rows)
        .bind(&numbers)
        .fetch_all(&mut *tx)
        .await?;

        // 2) Все места должны существовать и быть свободны
        if locked.len() != sorted.len() || locked.iter().any(|(_, _, owner)| owner.is_some()) {
            tx.rollback().await?;
            debug!("commit for user {} conflicts, rolled back", user_id);
            return Ok(CommitOutcome::Conflict);
        }

        // 3) Занимаем
        sqlx::query(
            r#"
            UPDATE seats s
            SET is_reserved = TRUE, reserved_by = $3
            FROM UNNEST($1::int4[], $2::int4[]) AS t(seat_row, seat_number)
            WHERE s.seat_row = t.seat_row AND s.seat_number = t.seat_number
            "#,
        )
        .bind(&rows)
        .bind(&numbers)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CommitOutcome::Committed)
    }

    async fn release(&self, user_id: UserId) -> Result<Vec<Seat>, StoreError> {
        let rows = sqlx::query_as::<_, SeatRow>(
            r#"
            UPDATE seats
            SET is_reserved = FALSE, reserved_by = NULL
            WHERE reserved_by = $1
            RETURNING seat_row, seat_number, reserved_by
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        let mut released: Vec<Seat> = rows.into_iter().map(seat_from_row).collect();
        released.sort_by_key(Seat::key);
        Ok(released)
    }
}
