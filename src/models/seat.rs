use serde::{Deserialize, Serialize};
use std::fmt;

use super::UserId;

/// Каноничный ключ места: (ряд, номер в ряду). Порядок сортировки совпадает с порядком обхода зала.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatKey {
    pub row: i32,
    pub seat_number: i32,
}

impl SeatKey {
    pub fn new(row: i32, seat_number: i32) -> Self {
        Self { row, seat_number }
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.seat_number)
    }
}

/// Место и его состояние брони.
///
/// Флаг `is_reserved` не хранится отдельно: место занято тогда и только тогда,
/// когда у него есть владелец.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub row: i32,
    pub seat_number: i32,
    pub reserved_by: Option<UserId>,
}

impl Seat {
    pub fn free(key: SeatKey) -> Self {
        Self { row: key.row, seat_number: key.seat_number, reserved_by: None }
    }

    pub fn key(&self) -> SeatKey {
        SeatKey::new(self.row, self.seat_number)
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved_by.is_some()
    }

    pub fn is_free(&self) -> bool {
        self.reserved_by.is_none()
    }
}
