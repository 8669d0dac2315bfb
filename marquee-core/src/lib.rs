pub mod error;
pub mod jobs;
pub mod repository;

pub use error::{ReservationError, ReservationResult};
pub use jobs::ReleaseJob;
pub use repository::{ExpiryScheduler, OwnershipCache, ReservationStore, SeatUpdateOutcome};
