use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A screening room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
}

impl Room {
    pub fn new(name: String, capacity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            capacity,
        }
    }
}

/// Seat class, which drives the seat's price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatClass {
    Standard,
    Vip,
    Couple,
}

impl SeatClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatClass::Standard => "standard",
            SeatClass::Vip => "vip",
            SeatClass::Couple => "couple",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(SeatClass::Standard),
            "vip" => Some(SeatClass::Vip),
            "couple" => Some(SeatClass::Couple),
            _ => None,
        }
    }
}

/// A physical seat in a room. Immutable after creation; per-showtime
/// state lives on `ShowtimeSeat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub room_id: Uuid,
    pub row: String,
    pub seat_number: i32,
    pub seat_class: SeatClass,
    /// Price in minor currency units.
    pub price: i32,
}

impl Seat {
    pub fn new(room_id: Uuid, row: String, seat_number: i32, seat_class: SeatClass, price: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            row,
            seat_number,
            seat_class,
            price,
        }
    }
}
