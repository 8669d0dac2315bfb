use uuid::Uuid;

/// Human-readable booking reference.
///
/// Format: BK-{timestamp}-{SHORTID}, unique via the booking's own id.
pub fn booking_code(booking_id: &Uuid) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let short_id = &booking_id.to_string()[..8];
    format!("BK-{}-{}", timestamp, short_id.to_uppercase())
}

/// Ticket code assigned to one booking detail at confirmation.
pub fn ticket_code(detail_id: &Uuid) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let short_id = &detail_id.to_string()[..8];
    format!("TKT-{}-{}", timestamp, short_id.to_uppercase())
}
