use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codes;

/// Booking status in the lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// Payment status tracked alongside the booking status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

/// A user's seat selection and payment outcome for one showtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub showtime_id: Uuid,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Sum of detail prices, minor currency units.
    pub total_amount: i32,
    pub booking_code: String,
    pub created_at: DateTime<Utc>,
    pub details: Vec<BookingDetail>,
}

impl Booking {
    pub fn new(user_id: Uuid, showtime_id: Uuid) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            user_id,
            showtime_id,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount: 0,
            booking_code: codes::booking_code(&id),
            created_at: Utc::now(),
            details: Vec::new(),
        }
    }

    /// Add a seat at the given price and keep the total in sync.
    pub fn add_seat(&mut self, seat_id: Uuid, price: i32) {
        self.details.push(BookingDetail::new(self.id, seat_id, price));
        self.total_amount += price;
    }

    pub fn seat_ids(&self) -> Vec<Uuid> {
        self.details.iter().map(|d| d.seat_id).collect()
    }

    pub fn holds_seat(&self, seat_id: Uuid) -> bool {
        self.details.iter().any(|d| d.seat_id == seat_id)
    }

    pub fn is_pending(&self) -> bool {
        self.status == BookingStatus::Pending
    }

    /// Transition: pending → confirmed (terminal success).
    pub fn confirm(&mut self) -> Result<(), BookingError> {
        if self.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: self.status.as_str(),
                to: "confirmed",
            });
        }
        self.status = BookingStatus::Confirmed;
        self.payment_status = PaymentStatus::Completed;
        Ok(())
    }

    /// Transition: pending → cancelled (terminal).
    pub fn cancel(&mut self, payment_status: PaymentStatus) -> Result<(), BookingError> {
        if self.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: self.status.as_str(),
                to: "cancelled",
            });
        }
        self.status = BookingStatus::Cancelled;
        self.payment_status = payment_status;
        Ok(())
    }
}

/// Links a booking to one seat, carrying the price charged and the ticket
/// code assigned at confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDetail {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub seat_id: Uuid,
    pub price: i32,
    pub ticket_code: Option<String>,
}

impl BookingDetail {
    pub fn new(booking_id: Uuid, seat_id: Uuid, price: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            seat_id,
            price,
            ticket_code: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid booking transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_totals() {
        let mut booking = Booking::new(Uuid::new_v4(), Uuid::new_v4());
        let seat_a = Uuid::new_v4();
        let seat_b = Uuid::new_v4();

        booking.add_seat(seat_a, 9000);
        booking.add_seat(seat_b, 15000);

        assert_eq!(booking.total_amount, 24000);
        assert_eq!(booking.seat_ids(), vec![seat_a, seat_b]);
        assert!(booking.holds_seat(seat_b));
        assert!(!booking.holds_seat(Uuid::new_v4()));
    }

    #[test]
    fn test_confirm_lifecycle() {
        let mut booking = Booking::new(Uuid::new_v4(), Uuid::new_v4());
        assert!(booking.is_pending());

        booking.confirm().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Completed);

        // Confirmed is terminal
        assert!(booking.confirm().is_err());
        assert!(booking.cancel(PaymentStatus::Cancelled).is_err());
    }

    #[test]
    fn test_cancel_records_payment_outcome() {
        let mut booking = Booking::new(Uuid::new_v4(), Uuid::new_v4());

        booking.cancel(PaymentStatus::Failed).unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert_eq!(booking.payment_status, PaymentStatus::Failed);

        assert!(booking.confirm().is_err());
    }
}
