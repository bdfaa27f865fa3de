//! Хранилища состояния зала и пользователей.
//!
//! Единственный разделяемый изменяемый ресурс - `SeatStore`. Все изменения
//! мест проходят через `commit` и `release`, других писателей нет.

pub mod memory;
pub mod postgres;
pub mod users;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Seat, SeatKey, UserId};

pub use memory::InMemorySeatStore;
pub use postgres::PgSeatStore;
pub use users::{InMemoryUserStore, PgUserStore, UserStore, UserStoreError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("seat store lock poisoned")]
    Poisoned,
}

/// Результат атомарной попытки занять набор мест.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Хотя бы одно место уже не свободно (или не существует). Ничего не изменено.
    Conflict,
}

#[async_trait]
pub trait SeatStore: Send + Sync {
    /// Согласованный снимок всех мест, упорядоченный по (ряд, номер).
    async fn snapshot(&self) -> Result<Vec<Seat>, StoreError>;

    /// Занять ровно `keys` за `user_id`, только если все они сейчас свободны.
    /// Всё или ничего.
    async fn commit(&self, keys: &[SeatKey], user_id: UserId) -> Result<CommitOutcome, StoreError>;

    /// Освободить все места пользователя. Возвращает освобождённые места по порядку.
    async fn release(&self, user_id: UserId) -> Result<Vec<Seat>, StoreError>;
}
