use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::{self, CurrentUser, Operation};
use crate::models::{Event, Role};
use crate::readmodel::{self, SaleWithContext};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

const RECENT_SALES_LIMIT: i64 = 10;

#[derive(Serialize, FromRow)]
struct SalesTotals {
    total_tickets_sold: i64,
    total_revenue: Decimal,
    tickets_used: i64,
    tickets_pending: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct TicketSalesBreakdown {
    pub ticket_name: String,
    pub sold: i64,
    pub available: i32,
    pub revenue: Decimal,
}

#[derive(Serialize, FromRow)]
struct SalesByDate {
    date: NaiveDate,
    count: i64,
}

#[derive(Serialize)]
struct Statistics {
    total_tickets_sold: i64,
    total_revenue: Decimal,
    tickets_used: i64,
    tickets_pending: i64,
    attendance_rate: f64,
    capacity_usage: f64,
}

#[derive(Serialize)]
struct EventDashboard {
    event: Event,
    statistics: Statistics,
    ticket_sales: Vec<TicketSalesBreakdown>,
    sales_by_date: Vec<SalesByDate>,
    recent_sales: Vec<SaleWithContext>,
}

/// Per-type sales counts and revenue for one event. Revenue is
/// `sold * price`; the LEFT JOIN keeps unsold types in the report, so the
/// aggregate must only count rows that have a matching sale.
pub async fn ticket_sales_breakdown(
    pool: &sqlx::PgPool,
    event_id: Uuid,
) -> Result<Vec<TicketSalesBreakdown>, AppError> {
    let breakdown = sqlx::query_as::<_, TicketSalesBreakdown>(
        "SELECT t.name AS ticket_name, COUNT(s.id) AS sold, \
                t.quantity_available AS available, \
                COUNT(s.id) * t.price AS revenue \
         FROM ticket_types t LEFT JOIN sales s ON s.ticket_type_id = t.id \
         WHERE t.event_id = $1 \
         GROUP BY t.id, t.name, t.quantity_available, t.price \
         ORDER BY t.name",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(breakdown)
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    let rate = part as f64 / whole as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

pub async fn event_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::ViewDashboard)?;

    let event = sqlx::query_as::<_, Event>(
        "SELECT id, organizer_id, title, description, date, location, capacity, \
                image_url, created_at \
         FROM events WHERE id = $1",
    )
    .bind(event_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if user.role == Role::Organizer && event.organizer_id != user.id {
        return Err(AppError::Forbidden(
            "You do not have permission to view this dashboard".to_string(),
        ));
    }

    let totals = sqlx::query_as::<_, SalesTotals>(
        "SELECT COUNT(s.id) AS total_tickets_sold, \
                COALESCE(SUM(t.price), 0) AS total_revenue, \
                COUNT(s.id) FILTER (WHERE s.status = 'redeemed') AS tickets_used, \
                COUNT(s.id) FILTER (WHERE s.status = 'issued') AS tickets_pending \
         FROM sales s JOIN ticket_types t ON t.id = s.ticket_type_id \
         WHERE t.event_id = $1",
    )
    .bind(event_id)
    .fetch_one(&state.pool)
    .await?;

    let ticket_sales = ticket_sales_breakdown(&state.pool, event_id).await?;

    let sales_by_date = sqlx::query_as::<_, SalesByDate>(
        "SELECT DATE(s.purchase_date) AS date, COUNT(*) AS count \
         FROM sales s JOIN ticket_types t ON t.id = s.ticket_type_id \
         WHERE t.event_id = $1 \
         GROUP BY DATE(s.purchase_date) \
         ORDER BY date",
    )
    .bind(event_id)
    .fetch_all(&state.pool)
    .await?;

    let recent_sales =
        readmodel::recent_sales_for_event(&state.pool, event_id, RECENT_SALES_LIMIT).await?;

    let statistics = Statistics {
        attendance_rate: percentage(totals.tickets_used, totals.total_tickets_sold),
        capacity_usage: percentage(totals.total_tickets_sold, event.capacity as i64),
        total_tickets_sold: totals.total_tickets_sold,
        total_revenue: totals.total_revenue,
        tickets_used: totals.tickets_used,
        tickets_pending: totals.tickets_pending,
    };

    let dashboard = EventDashboard {
        event,
        statistics,
        ticket_sales,
        sales_by_date,
        recent_sales,
    };

    Ok(success(dashboard, "Dashboard retrieved").into_response())
}

#[derive(Serialize, FromRow)]
struct EventCounts {
    total_events: i64,
    upcoming_events: i64,
    past_events: i64,
}

#[derive(Serialize)]
struct OrganizerStats {
    total_events: i64,
    upcoming_events: i64,
    past_events: i64,
    total_tickets_sold: i64,
    total_revenue: Decimal,
}

pub async fn organizer_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::ViewDashboard)?;

    // Admins see the whole portfolio, organizers only their own events.
    let scope: Option<Uuid> = (user.role == Role::Organizer).then_some(user.id);

    let counts = sqlx::query_as::<_, EventCounts>(
        "SELECT COUNT(*) AS total_events, \
                COUNT(*) FILTER (WHERE date > now()) AS upcoming_events, \
                COUNT(*) FILTER (WHERE date <= now()) AS past_events \
         FROM events WHERE $1::uuid IS NULL OR organizer_id = $1",
    )
    .bind(scope)
    .fetch_one(&state.pool)
    .await?;

    let (total_tickets_sold, total_revenue) = sqlx::query_as::<_, (i64, Decimal)>(
        "SELECT COUNT(s.id), COALESCE(SUM(t.price), 0) \
         FROM sales s \
         JOIN ticket_types t ON t.id = s.ticket_type_id \
         JOIN events e ON e.id = t.event_id \
         WHERE $1::uuid IS NULL OR e.organizer_id = $1",
    )
    .bind(scope)
    .fetch_one(&state.pool)
    .await?;

    let stats = OrganizerStats {
        total_events: counts.total_events,
        upcoming_events: counts.upcoming_events,
        past_events: counts.past_events,
        total_tickets_sold,
        total_revenue,
    };

    Ok(success(stats, "Statistics retrieved").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_handles_zero_denominator() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 2), 100.0);
    }
}
