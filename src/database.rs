use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::models::SeatKey;
use crate::venue::SeatMap;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("seats table does not match venue layout: {missing} seats missing, {unknown} seats not in layout")]
    LayoutMismatch { missing: usize, unknown: usize },
}

#[derive(Clone)]
pub struct Database {
    pub pool: Pool<Postgres>,
}

impl Database {
    pub async fn new(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    /// Подключение, миграции, заведение мест (если включено) и сверка таблицы `seats` со схемой зала.
    pub async fn prepare(
        database_url: &str,
        config: &DatabaseConfig,
        map: &SeatMap,
    ) -> Result<Self, DatabaseError> {
        let db = Self::new(database_url, config.pool_size).await?;
        info!("Database connected");

        db.run_migrations().await?;
        if config.seed_seats {
            db.seed_seats(map).await?;
        }
        db.verify_layout(map).await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }

    /// Создать места по схеме зала. Повторный вызов ничего не меняет.
    pub async fn seed_seats(&self, map: &SeatMap) -> Result<u64, sqlx::Error> {
        let (rows, numbers): (Vec<i32>, Vec<i32>) =
            map.keys().map(|k| (k.row, k.seat_number)).unzip();

        let inserted = sqlx::query(
            r#"
            INSERT INTO seats (seat_row, seat_number, is_reserved, reserved_by)
            SELECT t.seat_row, t.seat_number, FALSE, NULL
            FROM UNNEST($1::int4[], $2::int4[]) AS t(seat_row, seat_number)
            ON CONFLICT (seat_row, seat_number) DO NOTHING
            "#,
        )
        .bind(&rows)
        .bind(&numbers)
        .execute(&self.pool)
        .await?
        .rows_affected();

        info!("Seeded {} new seats ({} in layout)", inserted, map.capacity());
        Ok(inserted)
    }

    /// Места в БД должны в точности совпадать со схемой: лишнее место попало бы в распределение
    /// без сквозного номера, недостающее никогда бы не выдавалось.
    pub async fn verify_layout(&self, map: &SeatMap) -> Result<(), DatabaseError> {
        let existing: Vec<SeatKey> =
            sqlx::query_as::<_, (i32, i32)>("SELECT seat_row, seat_number FROM seats")
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|(row, seat_number)| SeatKey::new(row, seat_number))
                .collect();

        let (missing, unknown) = layout_diff(map, &existing);
        if missing > 0 || unknown > 0 {
            warn!("seats table: {} missing, {} unknown", missing, unknown);
            return Err(DatabaseError::LayoutMismatch { missing, unknown });
        }
        Ok(())
    }
}

/// (мест схемы нет в БД, мест БД нет в схеме)
fn layout_diff(map: &SeatMap, existing: &[SeatKey]) -> (usize, usize) {
    let existing: BTreeSet<SeatKey> = existing.iter().copied().collect();
    let missing = map.keys().filter(|k| !existing.contains(k)).count();
    let unknown = existing.iter().filter(|k| !map.contains(**k)).count();
    (missing, unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_diff_counts_both_directions() {
        let map = SeatMap::from_row_sizes(&[2, 1]).unwrap();
        let all: Vec<SeatKey> = map.keys().collect();
        assert_eq!(layout_diff(&map, &all), (0, 0));

        let partial = [SeatKey::new(1, 1), SeatKey::new(2, 1), SeatKey::new(3, 1), SeatKey::new(1, 9)];
        assert_eq!(layout_diff(&map, &partial), (1, 2));

        assert_eq!(layout_diff(&map, &[]), (3, 0));
    }
}
