pub mod room;
pub mod seatmap;
pub mod showtime;

pub use room::{Room, Seat, SeatClass};
pub use seatmap::{SeatAvailability, SeatMap, SeatRow, SeatView};
pub use showtime::{SeatStatus, Showtime, ShowtimeSeat, ShowtimeSummary};
