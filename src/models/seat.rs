use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "seat_class", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SeatClass {
    Regular,
    Vip,
    Disabled,
}

impl SeatClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SeatClass::Regular => "regular",
            SeatClass::Vip => "vip",
            SeatClass::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub hall_id: i64,
    pub seat_row: String,
    pub seat_col: i32,
    pub class: SeatClass,
}

impl Seat {
    pub fn label(&self) -> String {
        format!("{}{}", self.seat_row, self.seat_col)
    }
}

/// Row letters: 0 -> "A", 25 -> "Z", 26 -> "AA".
pub fn row_label(index: i32) -> String {
    let mut n = index.max(0) as u32;
    let mut label = Vec::new();
    loop {
        label.push(char::from(b'A' + (n % 26) as u8));
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    label.iter().rev().collect()
}

/// Hall ordering: row (shorter labels first, so Z comes before AA), then column.
pub fn sort_for_display(seats: &mut [Seat]) {
    seats.sort_by(|a, b| {
        (a.seat_row.len(), &a.seat_row, a.seat_col).cmp(&(b.seat_row.len(), &b.seat_row, b.seat_col))
    });
}
