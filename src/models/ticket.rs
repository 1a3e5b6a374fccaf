use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One purchasable tier of an event, e.g. "General" or "VIP".
///
/// `quantity_available` is only ever decremented together with the
/// creation of the corresponding sales, inside one transaction, and the
/// schema rejects negative values outright.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketType {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub total_quantity: i32,
    pub quantity_available: i32,
    pub created_at: DateTime<Utc>,
}
