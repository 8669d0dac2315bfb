use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::jobs::ReleaseJob;
use marquee_booking::{Booking, BookingDetail};
use marquee_catalog::{SeatAvailability, ShowtimeSummary};

/// Outcome of a transactional seat-set change on a pending booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatUpdateOutcome {
    Applied,
    /// A seat to be added was no longer available; the transaction rolled back.
    SeatsUnavailable(Vec<Uuid>),
    /// A seat to be dropped was not in held status; the transaction rolled back.
    SeatsNotHeld(Vec<Uuid>),
}

/// Durable store port for showtimes, seats, and bookings.
///
/// Every mutating operation is a single transaction against the store.
/// Seat status flips are conditioned on the current status; a zero-row
/// conditional update aborts the whole operation instead of being ignored.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn find_showtime(
        &self,
        showtime_id: Uuid,
    ) -> Result<Option<ShowtimeSummary>, Box<dyn std::error::Error + Send + Sync>>;

    /// Per-seat state for one showtime, ordered by row and seat number.
    async fn seats_for_showtime(
        &self,
        showtime_id: Uuid,
    ) -> Result<Vec<SeatAvailability>, Box<dyn std::error::Error + Send + Sync>>;

    async fn find_pending_booking(
        &self,
        user_id: Uuid,
        showtime_id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    async fn find_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    /// Insert the booking with its details and claim every seat by flipping
    /// it to held, conditioned on it still being available. Returns false
    /// (and rolls back) when any claim loses the race.
    async fn create_pending_booking(
        &self,
        booking: &Booking,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Add and drop seats on a pending booking in one transaction.
    /// Added seats are claimed conditionally; dropped seats revert to
    /// available conditioned on being held.
    async fn update_booking_seats(
        &self,
        booking_id: Uuid,
        add: &[BookingDetail],
        drop: &[Uuid],
        new_total: i32,
    ) -> Result<SeatUpdateOutcome, Box<dyn std::error::Error + Send + Sync>>;

    /// Revert the booking's held seats to available, then delete its
    /// details and the booking row itself.
    async fn delete_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Finalize payment: booking confirmed, payment completed, every seat
    /// booked, ticket codes written onto the details.
    async fn confirm_booking(
        &self,
        booking_id: Uuid,
        ticket_codes: &[(Uuid, String)],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Record a failed payment: booking cancelled, payment failed. Seats
    /// are left held for the expiry backstop.
    async fn fail_payment(
        &self,
        booking_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Expiry backstop: revert the booking's still-held seats to available
    /// and cancel the booking if it is still pending. Returns true when
    /// any row changed, false when there was nothing left to do.
    async fn expire_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}

/// Fast ownership arbitration for in-flight holds.
///
/// The cache is an optimization, never the source of truth: a claim only
/// stands once the store's conditional update commits. Entries carry the
/// hold TTL so abandoned records vanish on their own.
#[async_trait]
pub trait OwnershipCache: Send + Sync {
    /// SET-if-absent with TTL. False means another hold owns the seat.
    async fn acquire(
        &self,
        showtime_id: Uuid,
        seat_id: Uuid,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    async fn owner(
        &self,
        showtime_id: Uuid,
        seat_id: Uuid,
    ) -> Result<Option<Uuid>, Box<dyn std::error::Error + Send + Sync>>;

    /// Unconditional SET with TTL, used to re-stamp a record the caller
    /// already owns.
    async fn refresh(
        &self,
        showtime_id: Uuid,
        seat_id: Uuid,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn release(
        &self,
        showtime_id: Uuid,
        seat_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Delayed-job port for hold expiry.
///
/// Delivery is at-least-once; cancellation after delivery is a no-op, and
/// the release handler tolerates both.
#[async_trait]
pub trait ExpiryScheduler: Send + Sync {
    async fn schedule(
        &self,
        job: ReleaseJob,
        delay: Duration,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn cancel(
        &self,
        booking_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
