//! Entry validation: consumes a redemption code exactly once.
//!
//! The issued→redeemed transition and the access-log insert share one
//! transaction whose first statement is a conditional UPDATE
//! (`WHERE status = 'issued'`). Two scans racing on the same code are
//! serialized by the sale row: one wins and writes the single log entry,
//! the other falls through to the already-redeemed path and is shown the
//! original entry instead of writing a second one.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AccessLogEntry, SaleStatus};
use crate::readmodel::{self, AccessLogWithStaff, SaleWithContext, StaffSummary};
use crate::utils::error::AppError;

/// Outcome of presenting a redemption code at the entrance. The three
/// rejections are distinct on purpose: staff need to see *why* a code is
/// refused, not just that it was.
#[derive(Debug)]
pub enum ValidationOutcome {
    /// First presentation of an issued code: holder admitted, audit entry
    /// written.
    Admitted {
        sale: SaleWithContext,
        access_log: AccessLogWithStaff,
    },
    /// Replay of a consumed code. Carries the original audit entry (who
    /// scanned it, and when); nothing is written.
    AlreadyRedeemed {
        sale: SaleWithContext,
        access_log: Option<AccessLogWithStaff>,
    },
    /// The sale behind the code was cancelled. Nothing is written.
    Cancelled { sale: SaleWithContext },
    /// No sale matches the code.
    UnknownCode,
}

pub async fn validate(
    pool: &PgPool,
    qr_code: &str,
    staff_id: Uuid,
) -> Result<ValidationOutcome, AppError> {
    if qr_code.trim().is_empty() {
        return Err(AppError::ValidationError("QR code is required".to_string()));
    }

    let mut tx = pool.begin().await?;

    let redeemed_sale_id = sqlx::query_scalar::<_, Uuid>(
        "UPDATE sales SET status = 'redeemed' \
         WHERE qr_code = $1 AND status = 'issued' \
         RETURNING id",
    )
    .bind(qr_code)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(sale_id) = redeemed_sale_id else {
        tx.rollback().await?;
        return reject(pool, qr_code).await;
    };

    let entry = sqlx::query_as::<_, AccessLogEntry>(
        "INSERT INTO access_logs (sale_id, staff_id) VALUES ($1, $2) \
         RETURNING id, sale_id, staff_id, scanned_at",
    )
    .bind(sale_id)
    .bind(staff_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(sale = %sale_id, staff = %staff_id, entry = %entry.id, "Ticket redeemed");

    let sale = readmodel::sale_by_code(pool, qr_code)
        .await?
        .ok_or_else(|| {
            AppError::InternalServerError("Redeemed sale disappeared".to_string())
        })?;

    let staff_name = sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE id = $1")
        .bind(staff_id)
        .fetch_one(pool)
        .await?;

    Ok(ValidationOutcome::Admitted {
        sale,
        access_log: AccessLogWithStaff {
            id: entry.id,
            sale_id: entry.sale_id,
            scanned_at: entry.scanned_at,
            staff: StaffSummary {
                id: staff_id,
                name: staff_name,
            },
        },
    })
}

/// The conditional UPDATE matched nothing: the code is unknown, or the
/// sale is already in a terminal state. Decide which, without writing.
async fn reject(pool: &PgPool, qr_code: &str) -> Result<ValidationOutcome, AppError> {
    let Some(sale) = readmodel::sale_by_code(pool, qr_code).await? else {
        return Ok(ValidationOutcome::UnknownCode);
    };

    // A still-redeemable sale should have been claimed by the conditional
    // UPDATE; seeing one here means an out-of-band status rewrite.
    if sale.status.can_redeem() {
        return Err(AppError::InternalServerError(
            "Sale state changed during validation, retry".to_string(),
        ));
    }

    if sale.status == SaleStatus::Cancelled {
        return Ok(ValidationOutcome::Cancelled { sale });
    }

    let access_log = readmodel::access_log_for_sale(pool, sale.id).await?;
    Ok(ValidationOutcome::AlreadyRedeemed { sale, access_log })
}

/// Read-only lookup for `GET /tickets/qr/:qr_code`; never changes state.
pub async fn find_by_code(
    pool: &PgPool,
    qr_code: &str,
) -> Result<SaleWithContext, AppError> {
    readmodel::sale_by_code(pool, qr_code)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))
}
