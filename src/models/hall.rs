use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::seat::{row_label, SeatClass};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cinema {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCinema {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
}

/// Зал с фиксированной сеткой мест. Не меняется после создания.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Hall {
    pub id: i64,
    pub cinema_id: i64,
    pub name: String,
    pub total_seats: i32,
    pub rows: i32,
    pub cols: i32,
}

#[derive(Debug, Clone)]
pub struct NewHall {
    pub cinema_id: i64,
    pub name: String,
    pub rows: i32,
    pub cols: i32,
}

impl NewHall {
    pub fn total_seats(&self) -> i32 {
        self.rows * self.cols
    }

    /// Seat grid in row-major order: A1, A2, ..., B1, ...
    pub fn seat_layout(&self) -> Vec<(String, i32, SeatClass)> {
        (0..self.rows)
            .flat_map(|row| {
                (1..=self.cols).map(move |col| (row_label(row), col, SeatClass::Regular))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_row_major() {
        let hall = NewHall { cinema_id: 1, name: "1".into(), rows: 2, cols: 3 };
        let labels: Vec<String> = hall
            .seat_layout()
            .into_iter()
            .map(|(row, col, _)| format!("{}{}", row, col))
            .collect();

        assert_eq!(labels, ["A1", "A2", "A3", "B1", "B2", "B3"]);
        assert_eq!(hall.total_seats(), 6);
    }
}
