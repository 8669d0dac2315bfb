use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::SeatClass;
use crate::showtime::{SeatStatus, ShowtimeSummary};

/// One seat joined with its per-showtime status, as read from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatAvailability {
    pub seat_id: Uuid,
    pub row: String,
    pub seat_number: i32,
    pub seat_class: SeatClass,
    pub price: i32,
    pub status: SeatStatus,
}

/// A seat as presented to a viewer.
///
/// Seats in the viewer's own pending booking are reported as available
/// with `selected_by_me` set, so their UI can keep them toggleable while
/// everyone else sees them held.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatView {
    pub id: Uuid,
    pub seat_number: i32,
    pub seat_class: SeatClass,
    pub price: i32,
    pub status: SeatStatus,
    pub selected_by_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatRow {
    pub row: String,
    pub seats: Vec<SeatView>,
}

/// The full seat map for one showtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatMap {
    pub showtime: ShowtimeSummary,
    pub rows: Vec<SeatRow>,
}

impl SeatMap {
    pub fn build(
        showtime: ShowtimeSummary,
        seats: Vec<SeatAvailability>,
        viewer_seats: &HashSet<Uuid>,
    ) -> Self {
        // BTreeMap keeps rows in label order; seats arrive ordered by
        // (row, seat_number) from the store.
        let mut rows: BTreeMap<String, Vec<SeatView>> = BTreeMap::new();

        for seat in seats {
            let selected_by_me = viewer_seats.contains(&seat.seat_id);
            let status = if selected_by_me && seat.status == SeatStatus::Held {
                SeatStatus::Available
            } else {
                seat.status
            };

            rows.entry(seat.row).or_default().push(SeatView {
                id: seat.seat_id,
                seat_number: seat.seat_number,
                seat_class: seat.seat_class,
                price: seat.price,
                status,
                selected_by_me,
            });
        }

        SeatMap {
            showtime,
            rows: rows
                .into_iter()
                .map(|(row, seats)| SeatRow { row, seats })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::Room;
    use crate::showtime::Showtime;
    use chrono::{TimeZone, Utc};

    fn summary() -> ShowtimeSummary {
        let room = Room::new("Room 1".to_string(), 4);
        let starts = Utc.with_ymd_and_hms(2026, 8, 7, 19, 0, 0).unwrap();
        ShowtimeSummary {
            showtime: Showtime {
                id: Uuid::new_v4(),
                movie_id: Uuid::new_v4(),
                movie_title: "Example".to_string(),
                room_id: room.id,
                show_date: starts.date_naive(),
                starts_at: starts,
                ends_at: starts + chrono::Duration::minutes(120),
                base_price: 9000,
            },
            room,
        }
    }

    fn availability(row: &str, number: i32, status: SeatStatus) -> SeatAvailability {
        SeatAvailability {
            seat_id: Uuid::new_v4(),
            row: row.to_string(),
            seat_number: number,
            seat_class: SeatClass::Standard,
            price: 9000,
            status,
        }
    }

    #[test]
    fn test_groups_by_row() {
        let seats = vec![
            availability("A", 1, SeatStatus::Available),
            availability("A", 2, SeatStatus::Booked),
            availability("B", 1, SeatStatus::Held),
        ];

        let map = SeatMap::build(summary(), seats, &HashSet::new());

        assert_eq!(map.rows.len(), 2);
        assert_eq!(map.rows[0].row, "A");
        assert_eq!(map.rows[0].seats.len(), 2);
        assert_eq!(map.rows[1].row, "B");
        assert_eq!(map.rows[1].seats[0].status, SeatStatus::Held);
    }

    #[test]
    fn test_own_held_seats_read_as_available() {
        let mine = availability("A", 1, SeatStatus::Held);
        let theirs = availability("A", 2, SeatStatus::Held);
        let viewer_seats: HashSet<Uuid> = [mine.seat_id].into_iter().collect();

        let map = SeatMap::build(summary(), vec![mine, theirs], &viewer_seats);
        let row = &map.rows[0];

        assert_eq!(row.seats[0].status, SeatStatus::Available);
        assert!(row.seats[0].selected_by_me);
        assert_eq!(row.seats[1].status, SeatStatus::Held);
        assert!(!row.seats[1].selected_by_me);
    }
}
