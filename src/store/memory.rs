use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

use super::{CommitOutcome, SeatStore, StoreError};
use crate::models::{Seat, SeatKey, UserId};
use crate::venue::SeatMap;

/// Хранилище в памяти. Одна блокировка на весь зал: проверка и запись в
/// `commit` выполняются под одной write-блокировкой.
#[derive(Debug)]
pub struct InMemorySeatStore {
    seats: RwLock<BTreeMap<SeatKey, Option<UserId>>>,
}

impl InMemorySeatStore {
    pub fn new(map: &SeatMap) -> Self {
        let seats = map.keys().map(|key| (key, None)).collect();
        Self { seats: RwLock::new(seats) }
    }
}

#[async_trait]
impl SeatStore for InMemorySeatStore {
    async fn snapshot(&self) -> Result<Vec<Seat>, StoreError> {
        let seats = self.seats.read().map_err(|_| StoreError::Poisoned)?;
        Ok(seats
            .iter()
            .map(|(key, owner)| Seat {
                row: key.row,
                seat_number: key.seat_number,
                reserved_by: *owner,
            })
            .collect())
    }

    async fn commit(&self, keys: &[SeatKey], user_id: UserId) -> Result<CommitOutcome, StoreError> {
        let mut seats = self.seats.write().map_err(|_| StoreError::Poisoned)?;

        if let Some(taken) = keys
            .iter()
            .find(|key| !matches!(seats.get(*key), Some(None)))
        {
            debug!("commit for user {} conflicts on seat {}", user_id, taken);
            return Ok(CommitOutcome::Conflict);
        }

        for key in keys {
            seats.insert(*key, Some(user_id));
        }
        Ok(CommitOutcome::Committed)
    }

    async fn release(&self, user_id: UserId) -> Result<Vec<Seat>, StoreError> {
        let mut seats = self.seats.write().map_err(|_| StoreError::Poisoned)?;

        let mut released = Vec::new();
        for (key, owner) in seats.iter_mut() {
            if *owner == Some(user_id) {
                *owner = None;
                released.push(Seat::free(*key));
            }
        }
        Ok(released)
    }
}
