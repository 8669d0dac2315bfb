pub mod codes;
pub mod models;

pub use codes::{booking_code, ticket_code};
pub use models::{Booking, BookingDetail, BookingError, BookingStatus, PaymentStatus};
