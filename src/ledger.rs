//! Inventory-safe ticket issuance.
//!
//! A purchase claims stock and creates its sale rows inside one database
//! transaction. The conditional UPDATE on `quantity_available` is the
//! serialization point: of two purchases racing for the last units,
//! exactly one matches the `WHERE` clause and wins; the other observes
//! the committed remainder and is rejected with the current availability.
//! This holds across server instances because the database row, not any
//! in-process lock, arbitrates the race.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Sale;
use crate::readmodel::{self, SaleWithContext};
use crate::utils::error::AppError;

/// Generates the opaque code presented at the entrance. A v4 UUID carries
/// 122 random bits, so codes are unguessable and collisions are
/// negligible; the unique index on `sales.qr_code` backstops the
/// guarantee.
fn new_redemption_code() -> String {
    Uuid::new_v4().to_string()
}

/// Purchases `quantity` units of a ticket type for `buyer_id`.
///
/// Returns one sale per unit, each with a fresh redemption code, enriched
/// with buyer and ticket/event context. Stock decrement and sale creation
/// commit together or not at all.
pub async fn purchase(
    pool: &PgPool,
    ticket_type_id: Uuid,
    quantity: i32,
    buyer_id: Uuid,
) -> Result<Vec<SaleWithContext>, AppError> {
    if quantity < 1 {
        return Err(AppError::ValidationError(
            "Quantity must be a positive integer".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let claimed = sqlx::query_scalar::<_, i32>(
        "UPDATE ticket_types \
         SET quantity_available = quantity_available - $2 \
         WHERE id = $1 AND quantity_available >= $2 \
         RETURNING quantity_available",
    )
    .bind(ticket_type_id)
    .bind(quantity)
    .fetch_optional(&mut *tx)
    .await?;

    if claimed.is_none() {
        // Either the ticket type is unknown or the stock ran out; read the
        // row to tell the caller which, and how many units remain.
        let available = sqlx::query_scalar::<_, i32>(
            "SELECT quantity_available FROM ticket_types WHERE id = $1",
        )
        .bind(ticket_type_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.rollback().await?;

        return match available {
            None => Err(AppError::NotFound("Ticket type not found".to_string())),
            Some(available) => Err(AppError::InsufficientInventory { available }),
        };
    }

    let mut sales = Vec::with_capacity(quantity as usize);
    for _ in 0..quantity {
        let sale = sqlx::query_as::<_, Sale>(
            "INSERT INTO sales (user_id, ticket_type_id, qr_code) \
             VALUES ($1, $2, $3) \
             RETURNING id, user_id, ticket_type_id, purchase_date, qr_code, status",
        )
        .bind(buyer_id)
        .bind(ticket_type_id)
        .bind(new_redemption_code())
        .fetch_one(&mut *tx)
        .await?;

        sales.push(sale);
    }

    tx.commit().await?;

    tracing::info!(
        ticket_type = %ticket_type_id,
        buyer = %buyer_id,
        quantity,
        "Tickets purchased"
    );

    let sale_ids: Vec<Uuid> = sales.iter().map(|sale| sale.id).collect();
    readmodel::sales_by_ids(pool, &sale_ids).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn redemption_codes_are_distinct() {
        let codes: HashSet<String> = (0..10_000).map(|_| new_redemption_code()).collect();
        assert_eq!(codes.len(), 10_000);
    }

    #[test]
    fn redemption_codes_are_opaque_uuids() {
        let code = new_redemption_code();
        assert!(Uuid::parse_str(&code).is_ok());
    }
}
