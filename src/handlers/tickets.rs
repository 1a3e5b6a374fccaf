use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{self, CurrentUser, Operation};
use crate::ledger;
use crate::models::{Role, TicketType, User};
use crate::readmodel::{self, AccessLogWithStaff, SaleWithContext};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};
use crate::validation::{self, ValidationOutcome};

const TICKET_COLUMNS: &str =
    "id, event_id, name, price, total_quantity, quantity_available, created_at";

#[derive(Deserialize)]
pub struct CreateTicketTypeRequest {
    pub event_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity_available: i32,
}

async fn require_ticket_event_ownership(
    pool: &PgPool,
    user: &User,
    event_id: Uuid,
) -> Result<(), AppError> {
    let organizer_id =
        sqlx::query_scalar::<_, Uuid>("SELECT organizer_id FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    if user.role != Role::Admin && organizer_id != user.id {
        return Err(AppError::Forbidden(
            "You do not have permission to manage tickets for this event".to_string(),
        ));
    }

    Ok(())
}

pub async fn create_ticket_type(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateTicketTypeRequest>,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::ManageTicketTypes)?;
    require_ticket_event_ownership(&state.pool, &user, req.event_id).await?;

    if req.name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Ticket name is required".to_string(),
        ));
    }
    if req.price < Decimal::ZERO {
        return Err(AppError::ValidationError(
            "Price must not be negative".to_string(),
        ));
    }
    if req.quantity_available < 0 {
        return Err(AppError::ValidationError(
            "Quantity must not be negative".to_string(),
        ));
    }

    let ticket = sqlx::query_as::<_, TicketType>(&format!(
        "INSERT INTO ticket_types (event_id, name, price, total_quantity, quantity_available) \
         VALUES ($1, $2, $3, $4, $4) RETURNING {TICKET_COLUMNS}"
    ))
    .bind(req.event_id)
    .bind(req.name.trim())
    .bind(req.price)
    .bind(req.quantity_available)
    .fetch_one(&state.pool)
    .await?;

    Ok(created(ticket, "Ticket type created").into_response())
}

pub async fn list_ticket_types_by_event(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let tickets = sqlx::query_as::<_, TicketType>(&format!(
        "SELECT {TICKET_COLUMNS} FROM ticket_types WHERE event_id = $1 ORDER BY name"
    ))
    .bind(event_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(tickets, "Ticket types retrieved").into_response())
}

#[derive(Deserialize)]
pub struct UpdateTicketTypeRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub quantity_available: Option<i32>,
}

pub async fn update_ticket_type(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTicketTypeRequest>,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::ManageTicketTypes)?;

    let event_id =
        sqlx::query_scalar::<_, Uuid>("SELECT event_id FROM ticket_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket type not found".to_string()))?;

    require_ticket_event_ownership(&state.pool, &user, event_id).await?;

    if let Some(price) = req.price {
        if price < Decimal::ZERO {
            return Err(AppError::ValidationError(
                "Price must not be negative".to_string(),
            ));
        }
    }
    if let Some(quantity) = req.quantity_available {
        if quantity < 0 {
            return Err(AppError::ValidationError(
                "Quantity must not be negative".to_string(),
            ));
        }
    }

    // Restocking adjusts the total capacity by the same delta so the
    // conservation of sold-plus-available units still holds.
    let ticket = sqlx::query_as::<_, TicketType>(&format!(
        "UPDATE ticket_types SET \
            name = COALESCE($2, name), \
            price = COALESCE($3, price), \
            total_quantity = total_quantity + COALESCE($4 - quantity_available, 0), \
            quantity_available = COALESCE($4, quantity_available) \
         WHERE id = $1 RETURNING {TICKET_COLUMNS}"
    ))
    .bind(id)
    .bind(req.name.as_deref())
    .bind(req.price)
    .bind(req.quantity_available)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(ticket, "Ticket type updated").into_response())
}

pub async fn delete_ticket_type(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::ManageTicketTypes)?;

    let event_id =
        sqlx::query_scalar::<_, Uuid>("SELECT event_id FROM ticket_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket type not found".to_string()))?;

    require_ticket_event_ownership(&state.pool, &user, event_id).await?;

    sqlx::query("DELETE FROM ticket_types WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                AppError::Conflict("Ticket type has recorded sales".to_string())
            }
            _ => AppError::from(e),
        })?;

    Ok(empty_success("Ticket type deleted").into_response())
}

#[derive(Deserialize)]
pub struct BuyRequest {
    pub ticket_id: Uuid,
    pub quantity: i32,
}

pub async fn buy_tickets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<BuyRequest>,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::PurchaseTickets)?;

    let sales = ledger::purchase(&state.pool, req.ticket_id, req.quantity, user.id).await?;

    Ok(created(sales, "Purchase completed successfully").into_response())
}

/// Body and statuses mirror what entrance scanners expect: `valid` plus
/// the sale and, where one exists, the audit entry.
#[derive(Serialize)]
struct ValidateResponse {
    valid: bool,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sale: Option<SaleWithContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_log: Option<AccessLogWithStaff>,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub qr_code: String,
}

pub async fn validate_ticket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ValidateRequest>,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::ValidateTickets)?;

    let outcome = validation::validate(&state.pool, &req.qr_code, user.id).await?;

    let (status, body) = match outcome {
        ValidationOutcome::Admitted { sale, access_log } => (
            StatusCode::OK,
            ValidateResponse {
                valid: true,
                message: "Ticket validated successfully",
                sale: Some(sale),
                access_log: Some(access_log),
            },
        ),
        ValidationOutcome::AlreadyRedeemed { sale, access_log } => (
            StatusCode::BAD_REQUEST,
            ValidateResponse {
                valid: false,
                message: "Ticket has already been used",
                sale: Some(sale),
                access_log,
            },
        ),
        ValidationOutcome::Cancelled { sale } => (
            StatusCode::BAD_REQUEST,
            ValidateResponse {
                valid: false,
                message: "Ticket has been cancelled",
                sale: Some(sale),
                access_log: None,
            },
        ),
        ValidationOutcome::UnknownCode => (
            StatusCode::NOT_FOUND,
            ValidateResponse {
                valid: false,
                message: "Ticket not found",
                sale: None,
                access_log: None,
            },
        ),
    };

    Ok((status, Json(body)).into_response())
}

pub async fn my_tickets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let sales = readmodel::sales_by_buyer(&state.pool, user.id).await?;
    Ok(success(sales, "Tickets retrieved").into_response())
}

pub async fn get_ticket_by_qr(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(qr_code): Path<String>,
) -> Result<Response, AppError> {
    let sale = validation::find_by_code(&state.pool, &qr_code).await?;
    Ok(success(sale, "Ticket retrieved").into_response())
}

pub async fn access_logs_by_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::ViewAccessLogs)?;

    // Organizers may only audit their own events.
    if user.role == Role::Organizer {
        require_ticket_event_ownership(&state.pool, &user, event_id).await?;
    } else {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)",
        )
        .bind(event_id)
        .fetch_one(&state.pool)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
    }

    let logs = readmodel::access_logs_for_event(&state.pool, event_id).await?;
    Ok(success(logs, "Access logs retrieved").into_response())
}
