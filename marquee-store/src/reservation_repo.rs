use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use marquee_booking::{Booking, BookingDetail, BookingStatus, PaymentStatus};
use marquee_catalog::{
    Room, Seat, SeatAvailability, SeatClass, SeatStatus, Showtime, ShowtimeSeat, ShowtimeSummary,
};
use marquee_core::{ReservationStore, SeatUpdateOutcome};

/// Postgres implementation of the durable reservation store.
///
/// Every mutating method is one transaction; every seat status flip is a
/// conditional UPDATE with `rows_affected()` checked, so a lost race rolls
/// the whole operation back instead of writing partial state.
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the showtime's seat records, one available row per seat in
    /// the room. Done when a showtime is scheduled.
    pub async fn seed_showtime_seats(
        &self,
        showtime_id: Uuid,
        seats: &[Seat],
    ) -> Result<(), sqlx::Error> {
        let records = ShowtimeSeat::seed_for_room(showtime_id, seats);
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                "INSERT INTO showtime_seats (showtime_id, seat_id, status) VALUES ($1, $2, $3)",
            )
            .bind(record.showtime_id)
            .bind(record.seat_id)
            .bind(record.status.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct ShowtimeRow {
    id: Uuid,
    movie_id: Uuid,
    movie_title: String,
    room_id: Uuid,
    show_date: chrono::NaiveDate,
    starts_at: chrono::DateTime<chrono::Utc>,
    ends_at: chrono::DateTime<chrono::Utc>,
    base_price: i32,
    room_name: String,
    room_capacity: i32,
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    seat_id: Uuid,
    row_label: String,
    seat_number: i32,
    seat_class: String,
    price: i32,
    status: String,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    showtime_id: Uuid,
    status: String,
    payment_status: String,
    total_amount: i32,
    booking_code: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct BookingDetailRow {
    id: Uuid,
    booking_id: Uuid,
    seat_id: Uuid,
    price: i32,
    ticket_code: Option<String>,
}

const BOOKING_COLUMNS: &str =
    "id, user_id, showtime_id, status, payment_status, total_amount, booking_code, created_at";

fn parse_field<T>(
    parsed: Option<T>,
    field: &str,
    value: &str,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
    parsed.ok_or_else(|| format!("unknown {} value in store: {}", field, value).into())
}

impl PgReservationStore {
    async fn load_details(
        &self,
        booking_id: Uuid,
    ) -> Result<Vec<BookingDetail>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<BookingDetailRow> = sqlx::query_as(
            "SELECT id, booking_id, seat_id, price, ticket_code \
             FROM booking_details WHERE booking_id = $1 ORDER BY id",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| BookingDetail {
                id: r.id,
                booking_id: r.booking_id,
                seat_id: r.seat_id,
                price: r.price,
                ticket_code: r.ticket_code,
            })
            .collect())
    }

    async fn assemble_booking(
        &self,
        row: BookingRow,
    ) -> Result<Booking, Box<dyn std::error::Error + Send + Sync>> {
        let status = parse_field(BookingStatus::parse(&row.status), "booking status", &row.status)?;
        let payment_status = parse_field(
            PaymentStatus::parse(&row.payment_status),
            "payment status",
            &row.payment_status,
        )?;
        let details = self.load_details(row.id).await?;

        Ok(Booking {
            id: row.id,
            user_id: row.user_id,
            showtime_id: row.showtime_id,
            status,
            payment_status,
            total_amount: row.total_amount,
            booking_code: row.booking_code,
            created_at: row.created_at,
            details,
        })
    }

    /// The booking's showtime id, needed to address `showtime_seats` rows.
    async fn booking_showtime<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query_scalar("SELECT showtime_id FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(executor)
            .await
    }
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn find_showtime(
        &self,
        showtime_id: Uuid,
    ) -> Result<Option<ShowtimeSummary>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<ShowtimeRow> = sqlx::query_as(
            "SELECT st.id, st.movie_id, st.movie_title, st.room_id, st.show_date, \
                    st.starts_at, st.ends_at, st.base_price, \
                    r.name AS room_name, r.capacity AS room_capacity \
             FROM showtimes st \
             JOIN rooms r ON r.id = st.room_id \
             WHERE st.id = $1",
        )
        .bind(showtime_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| ShowtimeSummary {
            showtime: Showtime {
                id: r.id,
                movie_id: r.movie_id,
                movie_title: r.movie_title,
                room_id: r.room_id,
                show_date: r.show_date,
                starts_at: r.starts_at,
                ends_at: r.ends_at,
                base_price: r.base_price,
            },
            room: Room {
                id: r.room_id,
                name: r.room_name,
                capacity: r.room_capacity,
            },
        }))
    }

    async fn seats_for_showtime(
        &self,
        showtime_id: Uuid,
    ) -> Result<Vec<SeatAvailability>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<SeatRow> = sqlx::query_as(
            "SELECT s.id AS seat_id, s.row_label, s.seat_number, s.seat_class, s.price, ss.status \
             FROM showtime_seats ss \
             JOIN seats s ON s.id = ss.seat_id \
             WHERE ss.showtime_id = $1 \
             ORDER BY s.row_label ASC, s.seat_number ASC",
        )
        .bind(showtime_id)
        .fetch_all(&self.pool)
        .await?;

        let mut seats = Vec::with_capacity(rows.len());
        for row in rows {
            seats.push(SeatAvailability {
                seat_id: row.seat_id,
                row: row.row_label,
                seat_number: row.seat_number,
                seat_class: parse_field(
                    SeatClass::parse(&row.seat_class),
                    "seat class",
                    &row.seat_class,
                )?,
                price: row.price,
                status: parse_field(SeatStatus::parse(&row.status), "seat status", &row.status)?,
            });
        }
        Ok(seats)
    }

    async fn find_pending_booking(
        &self,
        user_id: Uuid,
        showtime_id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let query = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE user_id = $1 AND showtime_id = $2 AND status = 'pending'"
        );
        let row: Option<BookingRow> = sqlx::query_as(&query)
            .bind(user_id)
            .bind(showtime_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.assemble_booking(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row: Option<BookingRow> = sqlx::query_as(&query)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.assemble_booking(row).await?)),
            None => Ok(None),
        }
    }

    async fn create_pending_booking(
        &self,
        booking: &Booking,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO bookings \
             (id, user_id, showtime_id, status, payment_status, total_amount, booking_code, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.showtime_id)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.total_amount)
        .bind(&booking.booking_code)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        for detail in &booking.details {
            sqlx::query(
                "INSERT INTO booking_details (id, booking_id, seat_id, price, ticket_code) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(detail.id)
            .bind(detail.booking_id)
            .bind(detail.seat_id)
            .bind(detail.price)
            .bind(&detail.ticket_code)
            .execute(&mut *tx)
            .await?;

            // The claim: conditioned on the seat still being available.
            let claimed = sqlx::query(
                "UPDATE showtime_seats SET status = 'held' \
                 WHERE showtime_id = $1 AND seat_id = $2 AND status = 'available'",
            )
            .bind(booking.showtime_id)
            .bind(detail.seat_id)
            .execute(&mut *tx)
            .await?;

            if claimed.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(false);
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn update_booking_seats(
        &self,
        booking_id: Uuid,
        add: &[BookingDetail],
        drop: &[Uuid],
        new_total: i32,
    ) -> Result<SeatUpdateOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        let showtime_id = self
            .booking_showtime(&mut *tx, booking_id)
            .await?
            .ok_or_else(|| format!("booking {} not found", booking_id))?;

        for seat_id in drop {
            sqlx::query("DELETE FROM booking_details WHERE booking_id = $1 AND seat_id = $2")
                .bind(booking_id)
                .bind(seat_id)
                .execute(&mut *tx)
                .await?;

            let released = sqlx::query(
                "UPDATE showtime_seats SET status = 'available' \
                 WHERE showtime_id = $1 AND seat_id = $2 AND status = 'held'",
            )
            .bind(showtime_id)
            .bind(seat_id)
            .execute(&mut *tx)
            .await?;

            if released.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(SeatUpdateOutcome::SeatsNotHeld(vec![*seat_id]));
            }
        }

        for detail in add {
            sqlx::query(
                "INSERT INTO booking_details (id, booking_id, seat_id, price, ticket_code) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(detail.id)
            .bind(booking_id)
            .bind(detail.seat_id)
            .bind(detail.price)
            .bind(&detail.ticket_code)
            .execute(&mut *tx)
            .await?;

            let claimed = sqlx::query(
                "UPDATE showtime_seats SET status = 'held' \
                 WHERE showtime_id = $1 AND seat_id = $2 AND status = 'available'",
            )
            .bind(showtime_id)
            .bind(detail.seat_id)
            .execute(&mut *tx)
            .await?;

            if claimed.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(SeatUpdateOutcome::SeatsUnavailable(vec![detail.seat_id]));
            }
        }

        sqlx::query("UPDATE bookings SET total_amount = $1 WHERE id = $2")
            .bind(new_total)
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(SeatUpdateOutcome::Applied)
    }

    async fn delete_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        let showtime_id = match self.booking_showtime(&mut *tx, booking_id).await? {
            Some(id) => id,
            // Already gone; deleting twice is not an error.
            None => return Ok(()),
        };

        sqlx::query(
            "UPDATE showtime_seats SET status = 'available' \
             WHERE showtime_id = $1 AND status = 'held' \
               AND seat_id IN (SELECT seat_id FROM booking_details WHERE booking_id = $2)",
        )
        .bind(showtime_id)
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM booking_details WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn confirm_booking(
        &self,
        booking_id: Uuid,
        ticket_codes: &[(Uuid, String)],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        let showtime_id = self
            .booking_showtime(&mut *tx, booking_id)
            .await?
            .ok_or_else(|| format!("booking {} not found", booking_id))?;

        sqlx::query(
            "UPDATE bookings SET status = 'confirmed', payment_status = 'completed' \
             WHERE id = $1",
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

        for (detail_id, code) in ticket_codes {
            sqlx::query("UPDATE booking_details SET ticket_code = $1 WHERE id = $2")
                .bind(code)
                .bind(detail_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "UPDATE showtime_seats SET status = 'booked' \
             WHERE showtime_id = $1 \
               AND seat_id IN (SELECT seat_id FROM booking_details WHERE booking_id = $2)",
        )
        .bind(showtime_id)
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn fail_payment(
        &self,
        booking_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Seats are intentionally untouched; the expiry backstop sweeps
        // them up when the hold window closes.
        sqlx::query(
            "UPDATE bookings SET status = 'cancelled', payment_status = 'failed' \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(booking_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn expire_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        let showtime_id = match self.booking_showtime(&mut *tx, booking_id).await? {
            Some(id) => id,
            None => return Ok(false),
        };

        let seats = sqlx::query(
            "UPDATE showtime_seats SET status = 'available' \
             WHERE showtime_id = $1 AND status = 'held' \
               AND seat_id IN (SELECT seat_id FROM booking_details WHERE booking_id = $2)",
        )
        .bind(showtime_id)
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

        // Conditioned on pending: a cancelled-by-failed-payment booking
        // keeps its recorded payment outcome.
        let booking = sqlx::query(
            "UPDATE bookings SET status = 'cancelled', payment_status = 'cancelled' \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(seats.rows_affected() > 0 || booking.rows_affected() > 0)
    }
}
