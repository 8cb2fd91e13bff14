use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{BookingError, BookingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
    /// Reserved for post-show bookkeeping; never assigned by the ledger.
    Completed,
}

impl OrderStatus {
    /// Statuses whose seats count as occupied.
    pub const HOLDING: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Paid];

    pub fn holds_seats(self) -> bool {
        Self::HOLDING.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub screening_id: i64,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub order_time: NaiveDateTime,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
}

/// A validated booking request, ready for the store.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: i64,
    pub screening_id: i64,
    /// Distinct, non-empty.
    pub seat_ids: Vec<i64>,
}

impl OrderDraft {
    pub fn ensure_distinct_seats(&self) -> BookingResult<()> {
        ensure_distinct_seats(&self.seat_ids)
    }
}

/// A seat listed twice would be charged twice and counted twice.
pub fn ensure_distinct_seats(seat_ids: &[i64]) -> BookingResult<()> {
    let mut seen = BTreeSet::new();
    match seat_ids.iter().find(|id| !seen.insert(**id)) {
        Some(id) => Err(BookingError::validation(format!("Seat {} selected twice", id))),
        None => Ok(()),
    }
}

pub fn order_total(price: Decimal, seat_count: usize) -> Decimal {
    price * Decimal::from(seat_count as u64)
}

/// Payment metadata written by the payment stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStamp {
    pub method: String,
    pub transaction_id: String,
}

impl PaymentStamp {
    pub fn online(order_id: i64, now: NaiveDateTime) -> Self {
        PaymentStamp {
            method: "online".to_string(),
            transaction_id: format!("TX{}{}", now.format("%Y%m%d%H%M%S"), order_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn total_is_price_times_seats() {
        let price = Decimal::new(5000, 2);
        assert_eq!(order_total(price, 1), Decimal::new(5000, 2));
        assert_eq!(order_total(price, 2), Decimal::new(10000, 2));
        assert_eq!(order_total(Decimal::new(3350, 2), 3), Decimal::new(10050, 2));
    }

    #[test]
    fn transaction_id_format() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(7, 5, 1))
            .unwrap();
        let stamp = PaymentStamp::online(42, now);
        assert_eq!(stamp.method, "online");
        assert_eq!(stamp.transaction_id, "TX2024030907050142");
    }

    #[test]
    fn repeated_seat_is_named() {
        assert!(ensure_distinct_seats(&[1, 2, 3]).is_ok());
        let err = ensure_distinct_seats(&[4, 9, 4]).unwrap_err();
        assert_eq!(err.to_string(), "Seat 4 selected twice");
    }

    #[test]
    fn only_pending_and_paid_hold_seats() {
        assert!(OrderStatus::Pending.holds_seats());
        assert!(OrderStatus::Paid.holds_seats());
        assert!(!OrderStatus::Cancelled.holds_seats());
        assert!(!OrderStatus::Completed.holds_seats());
    }
}
