use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of a delayed seat-release job.
///
/// One job is outstanding per hold, keyed by the booking id. The handler
/// re-reads the booking before acting, so a late or duplicate delivery is
/// harmless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseJob {
    pub booking_id: Uuid,
    pub showtime_id: Uuid,
    pub seat_ids: Vec<Uuid>,
}
