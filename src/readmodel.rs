//! Read-side projections: explicit JOIN queries that return display-ready
//! shapes in one round trip per collection, instead of walking relations
//! row by row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::SaleStatus;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct BuyerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketSummary {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub event: EventSummary,
}

/// A sale enriched with everything the entrance or the buyer's ticket list
/// needs to display it.
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithContext {
    pub id: Uuid,
    pub purchase_date: DateTime<Utc>,
    pub qr_code: String,
    pub status: SaleStatus,
    pub buyer: BuyerSummary,
    pub ticket: TicketSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaffSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessLogWithStaff {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub scanned_at: DateTime<Utc>,
    pub staff: StaffSummary,
}

#[derive(FromRow)]
struct SaleContextRow {
    sale_id: Uuid,
    purchase_date: DateTime<Utc>,
    qr_code: String,
    status: SaleStatus,
    buyer_id: Uuid,
    buyer_name: String,
    buyer_email: String,
    ticket_type_id: Uuid,
    ticket_name: String,
    ticket_price: Decimal,
    event_id: Uuid,
    event_title: String,
    event_date: DateTime<Utc>,
    event_location: String,
}

impl From<SaleContextRow> for SaleWithContext {
    fn from(row: SaleContextRow) -> Self {
        SaleWithContext {
            id: row.sale_id,
            purchase_date: row.purchase_date,
            qr_code: row.qr_code,
            status: row.status,
            buyer: BuyerSummary {
                id: row.buyer_id,
                name: row.buyer_name,
                email: row.buyer_email,
            },
            ticket: TicketSummary {
                id: row.ticket_type_id,
                name: row.ticket_name,
                price: row.ticket_price,
                event: EventSummary {
                    id: row.event_id,
                    title: row.event_title,
                    date: row.event_date,
                    location: row.event_location,
                },
            },
        }
    }
}

const SALE_CONTEXT_SELECT: &str = "SELECT \
        s.id AS sale_id, s.purchase_date, s.qr_code, s.status, \
        u.id AS buyer_id, u.name AS buyer_name, u.email AS buyer_email, \
        t.id AS ticket_type_id, t.name AS ticket_name, t.price AS ticket_price, \
        e.id AS event_id, e.title AS event_title, e.date AS event_date, \
        e.location AS event_location \
     FROM sales s \
     JOIN users u ON u.id = s.user_id \
     JOIN ticket_types t ON t.id = s.ticket_type_id \
     JOIN events e ON e.id = t.event_id";

pub async fn sales_by_ids(
    pool: &PgPool,
    sale_ids: &[Uuid],
) -> Result<Vec<SaleWithContext>, AppError> {
    let rows = sqlx::query_as::<_, SaleContextRow>(&format!(
        "{SALE_CONTEXT_SELECT} WHERE s.id = ANY($1) ORDER BY s.purchase_date"
    ))
    .bind(sale_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(SaleWithContext::from).collect())
}

pub async fn sale_by_code(
    pool: &PgPool,
    qr_code: &str,
) -> Result<Option<SaleWithContext>, AppError> {
    let row = sqlx::query_as::<_, SaleContextRow>(&format!(
        "{SALE_CONTEXT_SELECT} WHERE s.qr_code = $1"
    ))
    .bind(qr_code)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(SaleWithContext::from))
}

pub async fn sales_by_buyer(
    pool: &PgPool,
    buyer_id: Uuid,
) -> Result<Vec<SaleWithContext>, AppError> {
    let rows = sqlx::query_as::<_, SaleContextRow>(&format!(
        "{SALE_CONTEXT_SELECT} WHERE s.user_id = $1 ORDER BY s.purchase_date DESC"
    ))
    .bind(buyer_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(SaleWithContext::from).collect())
}

pub async fn recent_sales_for_event(
    pool: &PgPool,
    event_id: Uuid,
    limit: i64,
) -> Result<Vec<SaleWithContext>, AppError> {
    let rows = sqlx::query_as::<_, SaleContextRow>(&format!(
        "{SALE_CONTEXT_SELECT} WHERE e.id = $1 ORDER BY s.purchase_date DESC LIMIT $2"
    ))
    .bind(event_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(SaleWithContext::from).collect())
}

#[derive(FromRow)]
struct AccessLogRow {
    id: Uuid,
    sale_id: Uuid,
    scanned_at: DateTime<Utc>,
    staff_id: Uuid,
    staff_name: String,
}

impl From<AccessLogRow> for AccessLogWithStaff {
    fn from(row: AccessLogRow) -> Self {
        AccessLogWithStaff {
            id: row.id,
            sale_id: row.sale_id,
            scanned_at: row.scanned_at,
            staff: StaffSummary {
                id: row.staff_id,
                name: row.staff_name,
            },
        }
    }
}

const ACCESS_LOG_SELECT: &str = "SELECT \
        a.id, a.sale_id, a.scanned_at, u.id AS staff_id, u.name AS staff_name \
     FROM access_logs a \
     JOIN users u ON u.id = a.staff_id";

pub async fn access_log_for_sale(
    pool: &PgPool,
    sale_id: Uuid,
) -> Result<Option<AccessLogWithStaff>, AppError> {
    let row = sqlx::query_as::<_, AccessLogRow>(&format!(
        "{ACCESS_LOG_SELECT} WHERE a.sale_id = $1 ORDER BY a.scanned_at LIMIT 1"
    ))
    .bind(sale_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(AccessLogWithStaff::from))
}

/// One entry of an event's entrance audit trail.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventAccessLog {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub scanned_at: DateTime<Utc>,
    pub staff_name: String,
    pub buyer_name: String,
    pub ticket_name: String,
    pub qr_code: String,
}

pub async fn access_logs_for_event(
    pool: &PgPool,
    event_id: Uuid,
) -> Result<Vec<EventAccessLog>, AppError> {
    let rows = sqlx::query_as::<_, EventAccessLog>(
        "SELECT a.id, a.sale_id, a.scanned_at, \
                staff.name AS staff_name, buyer.name AS buyer_name, \
                t.name AS ticket_name, s.qr_code \
         FROM access_logs a \
         JOIN sales s ON s.id = a.sale_id \
         JOIN users staff ON staff.id = a.staff_id \
         JOIN users buyer ON buyer.id = s.user_id \
         JOIN ticket_types t ON t.id = s.ticket_type_id \
         WHERE t.event_id = $1 \
         ORDER BY a.scanned_at DESC",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
