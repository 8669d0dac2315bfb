use serde::Serialize;
use uuid::Uuid;

/// Why a set of held seats went back to available.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseReason {
    Cancelled,
    Replaced,
    SeatRemoved,
    Expired,
}

/// Domain events broadcast by the engine, best-effort.
///
/// Consumers subscribe via `ReservationEngine::subscribe`; a lagging or
/// absent subscriber never blocks an operation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationEvent {
    SeatsHeld {
        booking_id: Uuid,
        showtime_id: Uuid,
        seat_ids: Vec<Uuid>,
        held_at: i64,
    },
    SeatsReleased {
        booking_id: Uuid,
        showtime_id: Uuid,
        seat_ids: Vec<Uuid>,
        reason: ReleaseReason,
    },
    BookingConfirmed {
        booking_id: Uuid,
        showtime_id: Uuid,
    },
}
