//! Геометрия зала: ряды и количество мест в каждом.
//!
//! Геометрия - это данные. Алгоритм распределения и координатор работают
//! только через `layout()`, поэтому смена схемы зала не требует правок логики.

use serde::Serialize;
use thiserror::Error;

use crate::models::SeatKey;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeatMapError {
    #[error("venue must have at least one row")]
    Empty,
    #[error("row {row} must have at least one seat")]
    EmptyRow { row: i32 },
    #[error("invalid venue layout `{0}`")]
    Malformed(String),
}

/// Один ряд схемы.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSpec {
    pub row: i32,
    pub seat_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatMap {
    rows: Vec<RowSpec>,
}

impl SeatMap {
    pub const STANDARD_ROWS: i32 = 12;
    pub const SEATS_PER_ROW: i32 = 7;
    pub const LAST_ROW_SEATS: i32 = 3;

    /// Стандартный зал: 11 рядов по 7 мест и последний ряд на 3 места.
    pub fn standard() -> Self {
        let rows = (1..=Self::STANDARD_ROWS)
            .map(|row| RowSpec {
                row,
                seat_count: if row == Self::STANDARD_ROWS {
                    Self::LAST_ROW_SEATS
                } else {
                    Self::SEATS_PER_ROW
                },
            })
            .collect();
        Self { rows }
    }

    /// Схема из списка размеров рядов; ряды нумеруются с 1.
    pub fn from_row_sizes(sizes: &[i32]) -> Result<Self, SeatMapError> {
        if sizes.is_empty() {
            return Err(SeatMapError::Empty);
        }

        let mut rows = Vec::with_capacity(sizes.len());
        for (row, &seat_count) in (1..).zip(sizes) {
            if seat_count < 1 {
                return Err(SeatMapError::EmptyRow { row });
            }
            rows.push(RowSpec { row, seat_count });
        }
        Ok(Self { rows })
    }

    /// Разбор строки вида `7,7,7,3` (формат переменной `VENUE_LAYOUT`).
    pub fn parse(layout: &str) -> Result<Self, SeatMapError> {
        let sizes = layout
            .split(',')
            .map(|part| part.trim().parse::<i32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| SeatMapError::Malformed(layout.to_string()))?;
        Self::from_row_sizes(&sizes)
    }

    pub fn layout(&self) -> &[RowSpec] {
        &self.rows
    }

    pub fn capacity(&self) -> usize {
        self.rows.iter().map(|r| r.seat_count as usize).sum()
    }

    /// Все места зала в порядке (ряд, номер).
    pub fn keys(&self) -> impl Iterator<Item = SeatKey> + '_ {
        self.rows
            .iter()
            .flat_map(|r| (1..=r.seat_count).map(move |n| SeatKey::new(r.row, n)))
    }

    pub fn contains(&self, key: SeatKey) -> bool {
        self.row(key.row)
            .is_some_and(|r| (1..=r.seat_count).contains(&key.seat_number))
    }

    /// Сквозной номер места для отображения: места всех предыдущих рядов плюс номер в ряду.
    pub fn global_number(&self, key: SeatKey) -> Option<u32> {
        if !self.contains(key) {
            return None;
        }
        let before: i32 = self
            .rows
            .iter()
            .take_while(|r| r.row < key.row)
            .map(|r| r.seat_count)
            .sum();
        u32::try_from(before + key.seat_number).ok()
    }

    fn row(&self, row: i32) -> Option<&RowSpec> {
        // ряды идут подряд с 1
        usize::try_from(row - 1).ok().and_then(|idx| self.rows.get(idx))
    }
}

impl Default for SeatMap {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_map_has_80_seats_with_short_last_row() {
        let map = SeatMap::standard();
        assert_eq!(map.layout().len(), 12);
        assert_eq!(map.capacity(), 80);
        assert!(map.layout()[..11].iter().all(|r| r.seat_count == 7));
        assert_eq!(map.layout()[11], RowSpec { row: 12, seat_count: 3 });
    }

    #[test]
    fn keys_are_ordered_by_row_then_seat() {
        let map = SeatMap::standard();
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys.len(), 80);
        assert_eq!(keys.first(), Some(&SeatKey::new(1, 1)));
        assert_eq!(keys.last(), Some(&SeatKey::new(12, 3)));
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn global_number_matches_row_major_numbering() {
        let map = SeatMap::standard();
        assert_eq!(map.global_number(SeatKey::new(1, 1)), Some(1));
        assert_eq!(map.global_number(SeatKey::new(2, 3)), Some(10));
        assert_eq!(map.global_number(SeatKey::new(12, 3)), Some(80));
        for key in map.keys() {
            let expected = (key.row - 1) * 7 + key.seat_number;
            assert_eq!(map.global_number(key), Some(expected as u32));
        }
    }

    #[test]
    fn unknown_seats_are_rejected() {
        let map = SeatMap::standard();
        assert!(!map.contains(SeatKey::new(12, 4)));
        assert!(!map.contains(SeatKey::new(0, 1)));
        assert!(!map.contains(SeatKey::new(13, 1)));
        assert_eq!(map.global_number(SeatKey::new(1, 8)), None);
    }

    #[test]
    fn parse_layout() {
        let map = SeatMap::parse("2, 3,1").unwrap();
        assert_eq!(map.capacity(), 6);
        assert_eq!(map.global_number(SeatKey::new(3, 1)), Some(6));

        assert_eq!(SeatMap::parse("7,x"), Err(SeatMapError::Malformed("7,x".into())));
        assert_eq!(SeatMap::parse("7,0"), Err(SeatMapError::EmptyRow { row: 2 }));
        assert_eq!(SeatMap::from_row_sizes(&[]), Err(SeatMapError::Empty));
    }
}
