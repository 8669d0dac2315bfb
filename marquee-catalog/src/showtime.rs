use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::{Room, Seat};

/// A scheduled screening of a movie in a specific room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Showtime {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub movie_title: String,
    pub room_id: Uuid,
    pub show_date: NaiveDate,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Base price in minor currency units.
    pub base_price: i32,
}

/// A showtime joined with its room, the shape read-side callers need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowtimeSummary {
    pub showtime: Showtime,
    pub room: Room,
}

/// Per-showtime seat status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Held,
    Booked,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "available",
            SeatStatus::Held => "held",
            SeatStatus::Booked => "booked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(SeatStatus::Available),
            "held" => Some(SeatStatus::Held),
            "booked" => Some(SeatStatus::Booked),
            _ => None,
        }
    }
}

/// The status record for one seat within one showtime.
///
/// The same physical seat is independently available across showtimes;
/// exactly one status exists per (showtime, seat) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowtimeSeat {
    pub showtime_id: Uuid,
    pub seat_id: Uuid,
    pub status: SeatStatus,
}

impl ShowtimeSeat {
    /// Seed one available seat record per seat in the room, done when a
    /// showtime is scheduled.
    pub fn seed_for_room(showtime_id: Uuid, seats: &[Seat]) -> Vec<ShowtimeSeat> {
        seats
            .iter()
            .map(|seat| ShowtimeSeat {
                showtime_id,
                seat_id: seat.id,
                status: SeatStatus::Available,
            })
            .collect()
    }

    /// Transition: available → held.
    pub fn hold(&mut self) -> Result<(), SeatTransitionError> {
        self.transition(SeatStatus::Available, SeatStatus::Held)
    }

    /// Transition: held → available (cancel or expiry).
    pub fn release(&mut self) -> Result<(), SeatTransitionError> {
        self.transition(SeatStatus::Held, SeatStatus::Available)
    }

    /// Transition: held → booked. Booked is terminal for the showtime.
    pub fn book(&mut self) -> Result<(), SeatTransitionError> {
        self.transition(SeatStatus::Held, SeatStatus::Booked)
    }

    fn transition(&mut self, from: SeatStatus, to: SeatStatus) -> Result<(), SeatTransitionError> {
        if self.status != from {
            return Err(SeatTransitionError::InvalidTransition {
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        self.status = to;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SeatTransitionError {
    #[error("Invalid seat transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::SeatClass;

    fn seat(room_id: Uuid, row: &str, number: i32) -> Seat {
        Seat::new(room_id, row.to_string(), number, SeatClass::Standard, 9000)
    }

    #[test]
    fn test_seed_for_room() {
        let room_id = Uuid::new_v4();
        let showtime_id = Uuid::new_v4();
        let seats = vec![seat(room_id, "A", 1), seat(room_id, "A", 2), seat(room_id, "B", 1)];

        let seeded = ShowtimeSeat::seed_for_room(showtime_id, &seats);

        assert_eq!(seeded.len(), 3);
        assert!(seeded.iter().all(|s| s.status == SeatStatus::Available));
        assert!(seeded.iter().all(|s| s.showtime_id == showtime_id));
    }

    #[test]
    fn test_seat_lifecycle() {
        let mut record = ShowtimeSeat {
            showtime_id: Uuid::new_v4(),
            seat_id: Uuid::new_v4(),
            status: SeatStatus::Available,
        };

        record.hold().unwrap();
        assert_eq!(record.status, SeatStatus::Held);

        record.book().unwrap();
        assert_eq!(record.status, SeatStatus::Booked);

        // Booked is terminal
        assert!(record.release().is_err());
        assert!(record.hold().is_err());
    }

    #[test]
    fn test_release_returns_to_available() {
        let mut record = ShowtimeSeat {
            showtime_id: Uuid::new_v4(),
            seat_id: Uuid::new_v4(),
            status: SeatStatus::Held,
        };

        record.release().unwrap();
        assert_eq!(record.status, SeatStatus::Available);

        // Cannot book a seat that was never re-held
        assert!(record.book().is_err());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [SeatStatus::Available, SeatStatus::Held, SeatStatus::Booked] {
            assert_eq!(SeatStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SeatStatus::parse("pending"), None);
    }
}
