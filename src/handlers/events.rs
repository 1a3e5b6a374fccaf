use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::{self, CurrentUser, Operation};
use crate::models::{Role, TicketType, User};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Debug, Clone, Serialize)]
pub struct OrganizerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Event as listed or fetched: organizer identity and ticket types come
/// along in the same response, loaded with one batched query each.
#[derive(Debug, Serialize)]
pub struct EventWithTickets {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub location: String,
    pub capacity: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub organizer: OrganizerSummary,
    pub tickets: Vec<TicketType>,
}

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    organizer_id: Uuid,
    title: String,
    description: Option<String>,
    date: DateTime<Utc>,
    location: String,
    capacity: i32,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    organizer_name: String,
    organizer_email: String,
}

const EVENT_SELECT: &str = "SELECT \
        e.id, e.organizer_id, e.title, e.description, e.date, e.location, \
        e.capacity, e.image_url, e.created_at, \
        u.name AS organizer_name, u.email AS organizer_email \
     FROM events e JOIN users u ON u.id = e.organizer_id";

async fn attach_tickets(
    pool: &PgPool,
    rows: Vec<EventRow>,
) -> Result<Vec<EventWithTickets>, AppError> {
    let event_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let tickets = sqlx::query_as::<_, TicketType>(
        "SELECT id, event_id, name, price, total_quantity, quantity_available, created_at \
         FROM ticket_types WHERE event_id = ANY($1) ORDER BY name",
    )
    .bind(&event_ids)
    .fetch_all(pool)
    .await?;

    let mut by_event: HashMap<Uuid, Vec<TicketType>> = HashMap::new();
    for ticket in tickets {
        by_event.entry(ticket.event_id).or_default().push(ticket);
    }

    Ok(rows
        .into_iter()
        .map(|row| EventWithTickets {
            tickets: by_event.remove(&row.id).unwrap_or_default(),
            organizer: OrganizerSummary {
                id: row.organizer_id,
                name: row.organizer_name,
                email: row.organizer_email,
            },
            id: row.id,
            title: row.title,
            description: row.description,
            date: row.date,
            location: row.location,
            capacity: row.capacity,
            image_url: row.image_url,
            created_at: row.created_at,
        })
        .collect())
}

pub async fn list_events(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    // Organizers see their own events; everyone else browses the catalog.
    let rows = if user.role == Role::Organizer {
        sqlx::query_as::<_, EventRow>(&format!(
            "{EVENT_SELECT} WHERE e.organizer_id = $1 ORDER BY e.date"
        ))
        .bind(user.id)
        .fetch_all(&state.pool)
        .await?
    } else {
        sqlx::query_as::<_, EventRow>(&format!("{EVENT_SELECT} ORDER BY e.date"))
            .fetch_all(&state.pool)
            .await?
    };

    let events = attach_tickets(&state.pool, rows).await?;
    Ok(success(events, "Events retrieved").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let row = sqlx::query_as::<_, EventRow>(&format!("{EVENT_SELECT} WHERE e.id = $1"))
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

    let mut events = attach_tickets(&state.pool, vec![row]).await?;
    let event = events.pop().ok_or_else(|| {
        AppError::InternalServerError("Event projection failed".to_string())
    })?;

    Ok(success(event, "Event retrieved").into_response())
}

#[derive(Deserialize)]
pub struct InlineTicketType {
    pub name: String,
    pub price: Decimal,
    pub quantity_available: i32,
}

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub location: String,
    pub capacity: i32,
    pub image_url: Option<String>,
    /// Ticket types may be created inline together with the event.
    pub tickets: Option<Vec<InlineTicketType>>,
}

fn validate_event_fields(
    title: &str,
    location: &str,
    capacity: i32,
) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::ValidationError("Title is required".to_string()));
    }
    if location.trim().is_empty() {
        return Err(AppError::ValidationError("Location is required".to_string()));
    }
    if capacity < 1 {
        return Err(AppError::ValidationError(
            "Capacity must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

fn validate_inline_ticket(ticket: &InlineTicketType) -> Result<(), AppError> {
    if ticket.name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Ticket name is required".to_string(),
        ));
    }
    if ticket.price < Decimal::ZERO {
        return Err(AppError::ValidationError(
            "Ticket price must not be negative".to_string(),
        ));
    }
    if ticket.quantity_available < 0 {
        return Err(AppError::ValidationError(
            "Ticket quantity must not be negative".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::CreateEvent)?;
    validate_event_fields(&req.title, &req.location, req.capacity)?;

    let inline_tickets = req.tickets.unwrap_or_default();
    for ticket in &inline_tickets {
        validate_inline_ticket(ticket)?;
    }

    let mut tx = state.pool.begin().await?;

    let event_id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO events (organizer_id, title, description, date, location, capacity, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(user.id)
    .bind(req.title.trim())
    .bind(req.description.as_deref())
    .bind(req.date)
    .bind(req.location.trim())
    .bind(req.capacity)
    .bind(req.image_url.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    for ticket in &inline_tickets {
        sqlx::query(
            "INSERT INTO ticket_types (event_id, name, price, total_quantity, quantity_available) \
             VALUES ($1, $2, $3, $4, $4)",
        )
        .bind(event_id)
        .bind(ticket.name.trim())
        .bind(ticket.price)
        .bind(ticket.quantity_available)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(event = %event_id, organizer = %user.id, "Event created");

    let row = sqlx::query_as::<_, EventRow>(&format!("{EVENT_SELECT} WHERE e.id = $1"))
        .bind(event_id)
        .fetch_one(&state.pool)
        .await?;
    let mut events = attach_tickets(&state.pool, vec![row]).await?;
    let event = events.pop().ok_or_else(|| {
        AppError::InternalServerError("Event projection failed".to_string())
    })?;

    Ok(created(event, "Event created successfully").into_response())
}

/// Admins may touch any event; organizers only their own.
async fn require_event_ownership(
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
            "You do not have permission to modify this event".to_string(),
        ));
    }

    Ok(())
}

#[derive(Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub image_url: Option<String>,
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::UpdateEvent)?;
    require_event_ownership(&state.pool, &user, id).await?;

    if let Some(capacity) = req.capacity {
        if capacity < 1 {
            return Err(AppError::ValidationError(
                "Capacity must be a positive integer".to_string(),
            ));
        }
    }

    sqlx::query(
        "UPDATE events SET \
            title = COALESCE($2, title), \
            description = COALESCE($3, description), \
            date = COALESCE($4, date), \
            location = COALESCE($5, location), \
            capacity = COALESCE($6, capacity), \
            image_url = COALESCE($7, image_url) \
         WHERE id = $1",
    )
    .bind(id)
    .bind(req.title.as_deref())
    .bind(req.description.as_deref())
    .bind(req.date)
    .bind(req.location.as_deref())
    .bind(req.capacity)
    .bind(req.image_url.as_deref())
    .execute(&state.pool)
    .await?;

    let row = sqlx::query_as::<_, EventRow>(&format!("{EVENT_SELECT} WHERE e.id = $1"))
        .bind(id)
        .fetch_one(&state.pool)
        .await?;
    let mut events = attach_tickets(&state.pool, vec![row]).await?;
    let event = events.pop().ok_or_else(|| {
        AppError::InternalServerError("Event projection failed".to_string())
    })?;

    Ok(success(event, "Event updated").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::DeleteEvent)?;
    require_event_ownership(&state.pool, &user, id).await?;

    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                AppError::Conflict("Event has sold tickets on record".to_string())
            }
            _ => AppError::from(e),
        })?;

    Ok(empty_success("Event deleted").into_response())
}
