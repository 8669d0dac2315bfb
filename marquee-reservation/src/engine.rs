use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use marquee_booking::{codes, Booking, BookingDetail, BookingStatus};
use marquee_catalog::{SeatMap, SeatStatus};
use marquee_core::{
    ExpiryScheduler, OwnershipCache, ReleaseJob, ReservationError, ReservationResult,
    ReservationStore, SeatUpdateOutcome,
};

use crate::events::{ReleaseReason, ReservationEvent};

/// Returned to the caller when a hold is created or reshaped.
#[derive(Debug, Clone, Serialize)]
pub struct HoldReceipt {
    pub booking_id: Uuid,
    pub booking_code: String,
    pub reserved_seats: Vec<Uuid>,
    pub total_amount: i32,
    pub expires_at: DateTime<Utc>,
}

/// The seat reservation state machine.
///
/// Arbitrates concurrent holds through the ownership cache, claims seats
/// through conditional updates on the durable store, and schedules one
/// delayed release job per hold. The store decides every claim; the cache
/// only provides the fast path.
pub struct ReservationEngine {
    store: Arc<dyn ReservationStore>,
    cache: Arc<dyn OwnershipCache>,
    scheduler: Arc<dyn ExpiryScheduler>,
    hold_ttl: Duration,
    events: broadcast::Sender<ReservationEvent>,
}

impl ReservationEngine {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        cache: Arc<dyn OwnershipCache>,
        scheduler: Arc<dyn ExpiryScheduler>,
        hold_ttl: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            store,
            cache,
            scheduler,
            hold_ttl,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReservationEvent> {
        self.events.subscribe()
    }

    pub fn hold_ttl(&self) -> Duration {
        self.hold_ttl
    }

    /// Hold a set of seats for a user during checkout.
    ///
    /// An existing pending booking for the same (user, showtime) is
    /// replaced, never accumulated alongside. The claim itself is one
    /// store transaction; losing any seat loses the whole request.
    pub async fn initiate_booking(
        &self,
        user_id: Uuid,
        showtime_id: Uuid,
        seat_ids: &[Uuid],
    ) -> ReservationResult<HoldReceipt> {
        let seat_ids = dedupe(seat_ids);
        if seat_ids.is_empty() {
            return Err(ReservationError::InvalidState(
                "no seats requested".to_string(),
            ));
        }

        self.store
            .find_showtime(showtime_id)
            .await
            .map_err(ReservationError::store)?
            .ok_or(ReservationError::ShowtimeNotFound(showtime_id))?;

        // At most one pending booking per (user, showtime): replace, not stack.
        if let Some(previous) = self
            .store
            .find_pending_booking(user_id, showtime_id)
            .await
            .map_err(ReservationError::store)?
        {
            info!(
                booking_id = %previous.id,
                "Replacing existing pending booking for user {}",
                user_id
            );
            self.release_hold(&previous, ReleaseReason::Replaced).await?;
        }

        let priced = self.price_available_seats(showtime_id, &seat_ids).await?;
        self.acquire_ownership(showtime_id, user_id, &seat_ids).await?;

        let mut booking = Booking::new(user_id, showtime_id);
        for (seat_id, price) in &priced {
            booking.add_seat(*seat_id, *price);
        }

        let claimed = self
            .store
            .create_pending_booking(&booking)
            .await
            .map_err(ReservationError::store)?;
        if !claimed {
            // Lost the durable race despite winning the cache: back out.
            self.release_ownership(showtime_id, &seat_ids).await;
            return Err(ReservationError::Conflict(join_ids(&seat_ids)));
        }

        let job = ReleaseJob {
            booking_id: booking.id,
            showtime_id,
            seat_ids: booking.seat_ids(),
        };
        if let Err(err) = self.scheduler.schedule(job, self.hold_ttl).await {
            warn!("Failed to schedule expiry for booking {}: {}", booking.id, err);
            self.release_hold(&booking, ReleaseReason::Cancelled).await?;
            return Err(ReservationError::store(err));
        }

        let _ = self.events.send(ReservationEvent::SeatsHeld {
            booking_id: booking.id,
            showtime_id,
            seat_ids: booking.seat_ids(),
            held_at: Utc::now().timestamp(),
        });

        info!(
            booking_id = %booking.id,
            "Held {} seat(s) for showtime {}",
            booking.details.len(),
            showtime_id
        );
        Ok(self.receipt(&booking))
    }

    /// Reshape the caller's pending hold to exactly `new_seat_ids`.
    ///
    /// Dropped seats revert to available, added seats are claimed. The
    /// expiry deadline is anchored to the booking and is NOT rescheduled.
    pub async fn update_selected_seats(
        &self,
        user_id: Uuid,
        showtime_id: Uuid,
        new_seat_ids: &[Uuid],
    ) -> ReservationResult<HoldReceipt> {
        let new_seat_ids = dedupe(new_seat_ids);
        if new_seat_ids.is_empty() {
            return Err(ReservationError::InvalidState(
                "empty seat selection; cancel the booking instead".to_string(),
            ));
        }

        let booking = self.require_pending_booking(user_id, showtime_id).await?;
        let current = booking.seat_ids();
        let (to_add, to_drop) = seat_diff(&current, &new_seat_ids);

        if to_add.is_empty() && to_drop.is_empty() {
            return Ok(self.receipt(&booking));
        }

        let priced = if to_add.is_empty() {
            Vec::new()
        } else {
            self.price_available_seats(showtime_id, &to_add).await?
        };
        self.acquire_ownership(showtime_id, user_id, &to_add).await?;

        let add_details: Vec<BookingDetail> = priced
            .iter()
            .map(|(seat_id, price)| BookingDetail::new(booking.id, *seat_id, *price))
            .collect();

        let kept: i32 = booking
            .details
            .iter()
            .filter(|d| !to_drop.contains(&d.seat_id))
            .map(|d| d.price)
            .sum();
        let added: i32 = priced.iter().map(|(_, price)| price).sum();
        let new_total = kept + added;

        let outcome = self
            .store
            .update_booking_seats(booking.id, &add_details, &to_drop, new_total)
            .await
            .map_err(ReservationError::store)?;
        if let Err(err) = check_outcome(outcome) {
            self.release_ownership(showtime_id, &to_add).await;
            return Err(err);
        }

        self.release_ownership(showtime_id, &to_drop).await;

        if !to_add.is_empty() {
            let _ = self.events.send(ReservationEvent::SeatsHeld {
                booking_id: booking.id,
                showtime_id,
                seat_ids: to_add.clone(),
                held_at: Utc::now().timestamp(),
            });
        }
        if !to_drop.is_empty() {
            let _ = self.events.send(ReservationEvent::SeatsReleased {
                booking_id: booking.id,
                showtime_id,
                seat_ids: to_drop.clone(),
                reason: ReleaseReason::SeatRemoved,
            });
        }

        let mut updated = booking;
        updated.details.retain(|d| !to_drop.contains(&d.seat_id));
        updated.details.extend(add_details);
        updated.total_amount = new_total;
        Ok(self.receipt(&updated))
    }

    /// Drop one seat from the caller's pending hold. Removing the last
    /// seat deletes the booking and cancels its expiry job. Returns the
    /// seats still held.
    pub async fn cancel_seat(
        &self,
        user_id: Uuid,
        showtime_id: Uuid,
        seat_id: Uuid,
    ) -> ReservationResult<Vec<Uuid>> {
        let booking = self.require_pending_booking(user_id, showtime_id).await?;
        if !booking.holds_seat(seat_id) {
            return Err(ReservationError::Unauthorized(format!(
                "seat {} is not part of the caller's booking",
                seat_id
            )));
        }

        let remaining: Vec<Uuid> = booking
            .seat_ids()
            .into_iter()
            .filter(|id| *id != seat_id)
            .collect();

        if remaining.is_empty() {
            self.release_hold(&booking, ReleaseReason::Cancelled).await?;
            return Ok(remaining);
        }

        let new_total: i32 = booking
            .details
            .iter()
            .filter(|d| d.seat_id != seat_id)
            .map(|d| d.price)
            .sum();

        let outcome = self
            .store
            .update_booking_seats(booking.id, &[], &[seat_id], new_total)
            .await
            .map_err(ReservationError::store)?;
        check_outcome(outcome)?;

        self.release_ownership(showtime_id, &[seat_id]).await;
        let _ = self.events.send(ReservationEvent::SeatsReleased {
            booking_id: booking.id,
            showtime_id,
            seat_ids: vec![seat_id],
            reason: ReleaseReason::SeatRemoved,
        });
        Ok(remaining)
    }

    /// Drop the caller's entire pending hold for a showtime.
    pub async fn cancel_booking(&self, user_id: Uuid, showtime_id: Uuid) -> ReservationResult<()> {
        let booking = self.require_pending_booking(user_id, showtime_id).await?;
        self.release_hold(&booking, ReleaseReason::Cancelled).await
    }

    /// Payment collaborator signal: the payment for this booking went
    /// through. Safe to deliver more than once.
    pub async fn on_payment_success(&self, booking_id: Uuid) -> ReservationResult<()> {
        let booking = self.require_booking(booking_id).await?;
        match booking.status {
            BookingStatus::Confirmed => {
                debug!("Payment success for already confirmed booking {}", booking_id);
                return Ok(());
            }
            BookingStatus::Cancelled => {
                warn!("Payment success for cancelled booking {}; ignoring", booking_id);
                return Ok(());
            }
            BookingStatus::Pending => {}
        }

        if let Err(err) = self.scheduler.cancel(booking.id).await {
            warn!("Failed to cancel expiry job for booking {}: {}", booking.id, err);
        }

        let ticket_codes: Vec<(Uuid, String)> = booking
            .details
            .iter()
            .map(|d| (d.id, codes::ticket_code(&d.id)))
            .collect();
        self.store
            .confirm_booking(booking.id, &ticket_codes)
            .await
            .map_err(ReservationError::store)?;

        self.release_ownership(booking.showtime_id, &booking.seat_ids())
            .await;
        let _ = self.events.send(ReservationEvent::BookingConfirmed {
            booking_id: booking.id,
            showtime_id: booking.showtime_id,
        });

        info!(booking_id = %booking.id, "Booking confirmed");
        Ok(())
    }

    /// Payment collaborator signal: the payment failed. The booking is
    /// cancelled but its seats stay held until the hold expires, leaving
    /// the user a retry window. Safe to deliver more than once.
    pub async fn on_payment_failure(&self, booking_id: Uuid) -> ReservationResult<()> {
        let booking = self.require_booking(booking_id).await?;
        if !booking.is_pending() {
            debug!("Payment failure for non-pending booking {}; ignoring", booking_id);
            return Ok(());
        }

        self.store
            .fail_payment(booking.id)
            .await
            .map_err(ReservationError::store)?;

        info!(
            booking_id = %booking.id,
            "Payment failed; seats stay held until the hold expires"
        );
        Ok(())
    }

    /// Seat map for one showtime, grouped by row. Seats in the viewer's
    /// own pending booking read as available with `selected_by_me` set.
    pub async fn seats_for_showtime(
        &self,
        showtime_id: Uuid,
        viewer: Option<Uuid>,
    ) -> ReservationResult<SeatMap> {
        let summary = self
            .store
            .find_showtime(showtime_id)
            .await
            .map_err(ReservationError::store)?
            .ok_or(ReservationError::ShowtimeNotFound(showtime_id))?;

        let seats = self
            .store
            .seats_for_showtime(showtime_id)
            .await
            .map_err(ReservationError::store)?;

        let viewer_seats: HashSet<Uuid> = match viewer {
            Some(user_id) => self
                .store
                .find_pending_booking(user_id, showtime_id)
                .await
                .map_err(ReservationError::store)?
                .map(|b| b.seat_ids().into_iter().collect())
                .unwrap_or_default(),
            None => HashSet::new(),
        };

        Ok(SeatMap::build(summary, seats, &viewer_seats))
    }

    /// Scheduler callback: a hold's delay elapsed without confirmation.
    ///
    /// No-op when the booking is gone or confirmed. Otherwise the store
    /// reverts the still-held seats and cancels a still-pending booking
    /// in one transaction, which also sweeps up seats left held by a
    /// failed payment. Idempotent under duplicate delivery.
    pub async fn handle_expiry(&self, job: ReleaseJob) -> ReservationResult<()> {
        let booking = match self
            .store
            .find_booking(job.booking_id)
            .await
            .map_err(ReservationError::store)?
        {
            Some(b) => b,
            None => {
                debug!("Expiry for missing booking {}; no-op", job.booking_id);
                return Ok(());
            }
        };

        if booking.status == BookingStatus::Confirmed {
            debug!("Expiry for confirmed booking {}; no-op", booking.id);
            return Ok(());
        }

        let applied = self
            .store
            .expire_booking(booking.id)
            .await
            .map_err(ReservationError::store)?;
        self.release_ownership(booking.showtime_id, &booking.seat_ids())
            .await;

        if applied {
            info!(booking_id = %booking.id, "Hold expired, seats released");
            let _ = self.events.send(ReservationEvent::SeatsReleased {
                booking_id: booking.id,
                showtime_id: booking.showtime_id,
                seat_ids: booking.seat_ids(),
                reason: ReleaseReason::Expired,
            });
        }
        Ok(())
    }

    fn receipt(&self, booking: &Booking) -> HoldReceipt {
        let ttl = chrono::Duration::seconds(self.hold_ttl.as_secs() as i64);
        HoldReceipt {
            booking_id: booking.id,
            booking_code: booking.booking_code.clone(),
            reserved_seats: booking.seat_ids(),
            total_amount: booking.total_amount,
            expires_at: booking.created_at + ttl,
        }
    }

    async fn require_pending_booking(
        &self,
        user_id: Uuid,
        showtime_id: Uuid,
    ) -> ReservationResult<Booking> {
        self.store
            .find_pending_booking(user_id, showtime_id)
            .await
            .map_err(ReservationError::store)?
            .ok_or_else(|| {
                ReservationError::BookingNotFound(format!(
                    "no pending booking for user {} and showtime {}",
                    user_id, showtime_id
                ))
            })
    }

    async fn require_booking(&self, booking_id: Uuid) -> ReservationResult<Booking> {
        self.store
            .find_booking(booking_id)
            .await
            .map_err(ReservationError::store)?
            .ok_or_else(|| ReservationError::BookingNotFound(booking_id.to_string()))
    }

    /// Validate that every requested seat exists and is available, and
    /// return it with its current price. The store transaction re-checks
    /// under isolation; this pass gives the caller a precise error.
    async fn price_available_seats(
        &self,
        showtime_id: Uuid,
        seat_ids: &[Uuid],
    ) -> ReservationResult<Vec<(Uuid, i32)>> {
        let seats = self
            .store
            .seats_for_showtime(showtime_id)
            .await
            .map_err(ReservationError::store)?;
        let by_id: HashMap<Uuid, (SeatStatus, i32)> = seats
            .into_iter()
            .map(|s| (s.seat_id, (s.status, s.price)))
            .collect();

        let mut priced = Vec::with_capacity(seat_ids.len());
        let mut unavailable = Vec::new();
        for seat_id in seat_ids {
            match by_id.get(seat_id) {
                None => return Err(ReservationError::SeatNotFound(*seat_id)),
                Some((SeatStatus::Available, price)) => priced.push((*seat_id, *price)),
                Some(_) => unavailable.push(*seat_id),
            }
        }

        if !unavailable.is_empty() {
            return Err(ReservationError::Conflict(join_ids(&unavailable)));
        }
        Ok(priced)
    }

    /// Record ownership for every seat, backing out on the first seat
    /// owned by someone else. A record already owned by this user is
    /// re-stamped with a fresh TTL instead of rejected.
    async fn acquire_ownership(
        &self,
        showtime_id: Uuid,
        user_id: Uuid,
        seat_ids: &[Uuid],
    ) -> ReservationResult<()> {
        for (i, seat_id) in seat_ids.iter().enumerate() {
            let acquired = self
                .cache
                .acquire(showtime_id, *seat_id, user_id, self.hold_ttl)
                .await
                .map_err(ReservationError::cache)?;
            if acquired {
                continue;
            }

            let owner = self
                .cache
                .owner(showtime_id, *seat_id)
                .await
                .map_err(ReservationError::cache)?;
            if owner == Some(user_id) {
                self.cache
                    .refresh(showtime_id, *seat_id, user_id, self.hold_ttl)
                    .await
                    .map_err(ReservationError::cache)?;
                continue;
            }

            self.release_ownership(showtime_id, &seat_ids[..i]).await;
            return Err(ReservationError::Conflict(seat_id.to_string()));
        }
        Ok(())
    }

    /// Best-effort cache cleanup. The cache is not authoritative and the
    /// entries expire on their own TTL, so a failure is logged, not
    /// propagated.
    async fn release_ownership(&self, showtime_id: Uuid, seat_ids: &[Uuid]) {
        for seat_id in seat_ids {
            if let Err(err) = self.cache.release(showtime_id, *seat_id).await {
                warn!(
                    "Failed to release ownership record for seat {} in showtime {}: {}",
                    seat_id, showtime_id, err
                );
            }
        }
    }

    /// End a pending hold early: cancel the expiry job, revert seats and
    /// delete the booking, clear ownership records.
    async fn release_hold(&self, booking: &Booking, reason: ReleaseReason) -> ReservationResult<()> {
        if let Err(err) = self.scheduler.cancel(booking.id).await {
            // A late firing is harmless: the handler finds no booking.
            warn!("Failed to cancel expiry job for booking {}: {}", booking.id, err);
        }

        self.store
            .delete_booking(booking.id)
            .await
            .map_err(ReservationError::store)?;
        self.release_ownership(booking.showtime_id, &booking.seat_ids())
            .await;

        let _ = self.events.send(ReservationEvent::SeatsReleased {
            booking_id: booking.id,
            showtime_id: booking.showtime_id,
            seat_ids: booking.seat_ids(),
            reason,
        });
        Ok(())
    }
}

fn check_outcome(outcome: SeatUpdateOutcome) -> ReservationResult<()> {
    match outcome {
        SeatUpdateOutcome::Applied => Ok(()),
        SeatUpdateOutcome::SeatsUnavailable(seats) => {
            Err(ReservationError::Conflict(join_ids(&seats)))
        }
        SeatUpdateOutcome::SeatsNotHeld(seats) => Err(ReservationError::InvalidState(format!(
            "seats not in held status: {}",
            join_ids(&seats)
        ))),
    }
}

fn join_ids(seat_ids: &[Uuid]) -> String {
    seat_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

fn dedupe(seat_ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    seat_ids
        .iter()
        .filter(|id| seen.insert(**id))
        .copied()
        .collect()
}

/// Set difference in both directions: (requested - current, current - requested).
fn seat_diff(current: &[Uuid], requested: &[Uuid]) -> (Vec<Uuid>, Vec<Uuid>) {
    let current_set: HashSet<Uuid> = current.iter().copied().collect();
    let requested_set: HashSet<Uuid> = requested.iter().copied().collect();

    let to_add = requested
        .iter()
        .filter(|id| !current_set.contains(id))
        .copied()
        .collect();
    let to_drop = current
        .iter()
        .filter(|id| !requested_set.contains(id))
        .copied()
        .collect();
    (to_add, to_drop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_diff() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let (add, drop) = seat_diff(&[a, b], &[b, c]);
        assert_eq!(add, vec![c]);
        assert_eq!(drop, vec![a]);

        let (add, drop) = seat_diff(&[a, b], &[a, b]);
        assert!(add.is_empty());
        assert!(drop.is_empty());
    }

    #[test]
    fn test_dedupe_preserves_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedupe(&[a, b, a, b]), vec![a, b]);
    }
}
