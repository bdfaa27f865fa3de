//! allocation.rs
//!
//! Выбор мест под запрос на N мест. Чистая функция над снимком свободных мест,
//! блокировки не нужны.
//!
//! Политика:
//! 1.  Ряды просматриваются по порядку. Свободные места одного ряда образуют
//!     один отрезок. Первый ряд, в котором свободно не меньше N мест, отдаёт
//!     свои первые N мест (по возрастанию номера).
//! 2.  Если такого ряда нет, но всего свободно не меньше N, берутся первые N
//!     свободных мест в порядке (ряд, номер), без учёта соседства.
//! 3.  Иначе - `Insufficient`.
//!
//! Смежность внутри ряда не проверяется: "отрезок" - это все свободные места
//! ряда, даже если между ними есть занятые.

use serde::Serialize;
use thiserror::Error;

use crate::models::Seat;

/// Каким путём были выбраны места.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Placement {
    /// Все места в одном ряду.
    Contiguous { row: i32 },
    /// Места набраны подряд по залу, возможно из разных рядов.
    Scattered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub seats: Vec<Seat>,
    pub placement: Placement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("insufficient seats: requested {requested}, available {available}")]
pub struct Insufficient {
    pub requested: usize,
    pub available: usize,
}

/// Подбирает `requested` мест из `free_seats`.
///
/// `free_seats` - только свободные места, отсортированные по (ряд, номер),
/// как их отдаёт `SeatStore::snapshot` после фильтрации.
pub fn allocate(free_seats: &[Seat], requested: usize) -> Result<Allocation, Insufficient> {
    debug_assert!(free_seats.iter().all(Seat::is_free));
    debug_assert!(free_seats.windows(2).all(|w| w[0].key() < w[1].key()));

    if requested > 0 {
        // Свёртка по рядам: проверяется отрезок каждого ряда, включая последний.
        let contiguous = free_seats
            .chunk_by(|a, b| a.row == b.row)
            .find(|run| run.len() >= requested);

        if let Some(run) = contiguous {
            return Ok(Allocation {
                seats: run[..requested].to_vec(),
                placement: Placement::Contiguous { row: run[0].row },
            });
        }
    }

    if free_seats.len() < requested {
        return Err(Insufficient {
            requested,
            available: free_seats.len(),
        });
    }

    Ok(Allocation {
        seats: free_seats[..requested].to_vec(),
        placement: Placement::Scattered,
    })
}
