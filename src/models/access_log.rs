use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Audit record of one successful redemption. Written exactly once per
/// sale, together with the issued→redeemed transition, and never updated
/// or deleted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccessLogEntry {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub staff_id: Uuid,
    pub scanned_at: DateTime<Utc>,
}
