//! coordinator.rs
//!
//! Координатор бронирования: связывает снимок хранилища, алгоритм выбора мест
//! и атомарный коммит.
//!
//! Жизненный цикл запроса: `Pending -> {Granted, Rejected, Retry}`.
//! При конфликте коммита (кто-то успел занять место между снимком и коммитом)
//! запрос повторяется на свежем снимке, но не больше `max_attempts` раз.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::allocation::{self, Placement};
use crate::models::{Seat, SeatKey, UserId};
use crate::store::{CommitOutcome, SeatStore, StoreError};

/// Максимум мест в одном запросе.
pub const MAX_SEATS_PER_REQUEST: u32 = 7;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("seat count must be between 1 and 7, got {0}")]
    InvalidCount(u32),
    #[error("not enough available seats: requested {requested}, available {available}")]
    NotEnoughSeats { requested: u32, available: usize },
    #[error("seats kept being taken concurrently, gave up after {attempts} attempts")]
    Contention { attempts: u32 },
    #[error("seat store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Успешное бронирование.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Granted {
    pub seats: Vec<Seat>,
    pub placement: Placement,
    pub attempts: u32,
}

/// Исход одной попытки.
enum Attempt {
    Granted(Granted),
    Retry,
}

#[derive(Clone)]
pub struct ReservationCoordinator {
    store: Arc<dyn SeatStore>,
    max_attempts: u32,
}

impl ReservationCoordinator {
    pub fn new(store: Arc<dyn SeatStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Забронировать `requested` мест для пользователя.
    pub async fn reserve(&self, user_id: UserId, requested: u32) -> Result<Granted, ReservationError> {
        if !(1..=MAX_SEATS_PER_REQUEST).contains(&requested) {
            info!("user {} rejected: invalid seat count {}", user_id, requested);
            return Err(ReservationError::InvalidCount(requested));
        }

        for attempt in 1..=self.max_attempts {
            match self.try_reserve(user_id, requested, attempt).await? {
                Attempt::Granted(granted) => {
                    info!(
                        "user {} granted {} seats ({:?}) on attempt {}",
                        user_id,
                        granted.seats.len(),
                        granted.placement,
                        attempt
                    );
                    return Ok(granted);
                }
                Attempt::Retry => {
                    debug!("user {} commit conflict on attempt {}, retrying", user_id, attempt);
                    tokio::task::yield_now().await;
                }
            }
        }

        warn!(
            "user {} gave up after {} conflicting commits",
            user_id, self.max_attempts
        );
        Err(ReservationError::Contention {
            attempts: self.max_attempts,
        })
    }

    async fn try_reserve(
        &self,
        user_id: UserId,
        requested: u32,
        attempt: u32,
    ) -> Result<Attempt, ReservationError> {
        let snapshot = self.store.snapshot().await.map_err(|e| {
            error!("snapshot failed for user {}: {}", user_id, e);
            ReservationError::StoreUnavailable(e)
        })?;
        let free: Vec<Seat> = snapshot.into_iter().filter(Seat::is_free).collect();

        let allocation = allocation::allocate(&free, requested as usize).map_err(|e| {
            info!("user {} rejected: {}", user_id, e);
            ReservationError::NotEnoughSeats {
                requested,
                available: e.available,
            }
        })?;

        let keys: Vec<SeatKey> = allocation.seats.iter().map(Seat::key).collect();
        let outcome = self.store.commit(&keys, user_id).await.map_err(|e| {
            error!("commit failed for user {}: {}", user_id, e);
            ReservationError::StoreUnavailable(e)
        })?;

        Ok(match outcome {
            CommitOutcome::Conflict => Attempt::Retry,
            CommitOutcome::Committed => Attempt::Granted(Granted {
                seats: allocation
                    .seats
                    .into_iter()
                    .map(|seat| Seat {
                        reserved_by: Some(user_id),
                        ..seat
                    })
                    .collect(),
                placement: allocation.placement,
                attempts: attempt,
            }),
        })
    }

    /// Снять все брони пользователя. Повторный вызов безопасен и вернёт пустой список.
    pub async fn cancel(&self, user_id: UserId) -> Result<Vec<Seat>, ReservationError> {
        let released = self.store.release(user_id).await.map_err(|e| {
            error!("release failed for user {}: {}", user_id, e);
            ReservationError::StoreUnavailable(e)
        })?;
        info!("user {} released {} seats", user_id, released.len());
        Ok(released)
    }

    pub async fn list_seats(&self) -> Result<Vec<Seat>, ReservationError> {
        Ok(self.store.snapshot().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySeatStore;
    use crate::venue::SeatMap;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn coordinator() -> ReservationCoordinator {
        let store = Arc::new(InMemorySeatStore::new(&SeatMap::standard()));
        ReservationCoordinator::new(store, DEFAULT_MAX_ATTEMPTS)
    }

    fn keys(seats: &[Seat]) -> Vec<(i32, i32)> {
        seats.iter().map(|s| (s.row, s.seat_number)).collect()
    }

    #[tokio::test]
    async fn rejects_counts_outside_range() {
        let c = coordinator();
        for n in [0, 8, 100] {
            let err = c.reserve(UserId(1), n).await.unwrap_err();
            assert!(matches!(err, ReservationError::InvalidCount(got) if got == n));
        }
        assert!(c.list_seats().await.unwrap().iter().all(Seat::is_free));
    }

    #[tokio::test]
    async fn follows_contiguous_then_next_row() {
        let c = coordinator();
        let first = c.reserve(UserId(1), 5).await.unwrap();
        assert_eq!(keys(&first.seats), vec![(1, 1), (1, 2), (1, 3), (1, 4), (1, 5)]);
        assert!(first.seats.iter().all(|s| s.reserved_by == Some(UserId(1))));
        assert_eq!(first.attempts, 1);

        // в ряду 1 осталось два места - три места уходят во второй ряд
        let second = c.reserve(UserId(2), 3).await.unwrap();
        assert_eq!(keys(&second.seats), vec![(2, 1), (2, 2), (2, 3)]);
        assert_eq!(second.placement, Placement::Contiguous { row: 2 });
    }

    #[tokio::test]
    async fn not_enough_seats_leaves_state_unchanged() {
        let store = Arc::new(InMemorySeatStore::new(&SeatMap::from_row_sizes(&[3, 2]).unwrap()));
        let c = ReservationCoordinator::new(store, DEFAULT_MAX_ATTEMPTS);
        c.reserve(UserId(1), 3).await.unwrap();

        let before = c.list_seats().await.unwrap();
        let err = c.reserve(UserId(2), 3).await.unwrap_err();
        assert!(matches!(
            err,
            ReservationError::NotEnoughSeats { requested: 3, available: 2 }
        ));
        assert_eq!(c.list_seats().await.unwrap(), before);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let c = coordinator();
        c.reserve(UserId(7), 4).await.unwrap();

        let released = c.cancel(UserId(7)).await.unwrap();
        assert_eq!(released.len(), 4);
        assert!(c.cancel(UserId(7)).await.unwrap().is_empty());
        assert!(c.list_seats().await.unwrap().iter().all(Seat::is_free));
    }

    /// Хранилище, которое первые `conflicts` коммитов отвечает конфликтом.
    struct FlakyStore {
        inner: InMemorySeatStore,
        conflicts: AtomicU32,
    }

    #[async_trait]
    impl SeatStore for FlakyStore {
        async fn snapshot(&self) -> Result<Vec<Seat>, StoreError> {
            self.inner.snapshot().await
        }

        async fn commit(&self, keys: &[SeatKey], user_id: UserId) -> Result<CommitOutcome, StoreError> {
            let left = self.conflicts.load(Ordering::SeqCst);
            if left > 0 {
                self.conflicts.store(left - 1, Ordering::SeqCst);
                return Ok(CommitOutcome::Conflict);
            }
            self.inner.commit(keys, user_id).await
        }

        async fn release(&self, user_id: UserId) -> Result<Vec<Seat>, StoreError> {
            self.inner.release(user_id).await
        }
    }

    fn flaky(conflicts: u32) -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: InMemorySeatStore::new(&SeatMap::standard()),
            conflicts: AtomicU32::new(conflicts),
        })
    }

    #[tokio::test]
    async fn retries_conflicts_within_budget() {
        let c = ReservationCoordinator::new(flaky(2), 3);
        let granted = c.reserve(UserId(1), 2).await.unwrap();
        assert_eq!(granted.attempts, 3);
        assert_eq!(keys(&granted.seats), vec![(1, 1), (1, 2)]);
    }

    #[tokio::test]
    async fn surfaces_contention_when_budget_exhausted() {
        let store = flaky(10);
        let c = ReservationCoordinator::new(store.clone(), 3);
        let err = c.reserve(UserId(1), 2).await.unwrap_err();
        assert!(matches!(err, ReservationError::Contention { attempts: 3 }));
        assert!(store.snapshot().await.unwrap().iter().all(Seat::is_free));
    }

    struct BrokenStore;

    #[async_trait]
    impl SeatStore for BrokenStore {
        async fn snapshot(&self) -> Result<Vec<Seat>, StoreError> {
            Err(StoreError::Poisoned)
        }

        async fn commit(&self, _: &[SeatKey], _: UserId) -> Result<CommitOutcome, StoreError> {
            Err(StoreError::Poisoned)
        }

        async fn release(&self, _: UserId) -> Result<Vec<Seat>, StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[tokio::test]
    async fn store_failures_are_not_retried() {
        let c = ReservationCoordinator::new(Arc::new(BrokenStore), 5);
        assert!(matches!(
            c.reserve(UserId(1), 1).await,
            Err(ReservationError::StoreUnavailable(_))
        ));
        assert!(matches!(
            c.cancel(UserId(1)).await,
            Err(ReservationError::StoreUnavailable(_))
        ));
    }
}
