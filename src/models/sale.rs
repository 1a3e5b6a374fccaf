use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a sold ticket unit.
///
/// `Issued` is the only state a validation can consume; `Redeemed` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sale_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Issued,
    Redeemed,
    Cancelled,
}

impl SaleStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Redeemed | SaleStatus::Cancelled)
    }

    /// Whether a `validate` call may move this sale to `Redeemed`.
    pub fn can_redeem(&self) -> bool {
        matches!(self, SaleStatus::Issued)
    }
}

/// One purchased unit of a ticket type. The `qr_code` is the opaque
/// identifier presented at the entrance; it is generated once at purchase
/// time and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_type_id: Uuid,
    pub purchase_date: DateTime<Utc>,
    pub qr_code: String,
    pub status: SaleStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_issued_can_be_redeemed() {
        assert!(SaleStatus::Issued.can_redeem());
        assert!(!SaleStatus::Redeemed.can_redeem());
        assert!(!SaleStatus::Cancelled.can_redeem());
    }

    #[test]
    fn redeemed_and_cancelled_are_terminal() {
        assert!(!SaleStatus::Issued.is_terminal());
        assert!(SaleStatus::Redeemed.is_terminal());
        assert!(SaleStatus::Cancelled.is_terminal());
    }
}
