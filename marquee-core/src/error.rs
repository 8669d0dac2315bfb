use uuid::Uuid;

/// Errors surfaced by the reservation engine to its callers.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Showtime not found: {0}")]
    ShowtimeNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Seat not found: {0}")]
    SeatNotFound(Uuid),

    #[error("Seats no longer available: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not owned by caller: {0}")]
    Unauthorized(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl ReservationError {
    pub fn store(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Store(err.to_string())
    }

    pub fn cache(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Cache(err.to_string())
    }

    /// True for the errors a caller can recover from by picking other seats.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;
