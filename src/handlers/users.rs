use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{self, password, CurrentUser, Operation};
use crate::models::{PublicUser, Role};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

const PUBLIC_COLUMNS: &str = "id, name, username, email, role, created_at";

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    auth::authorize(user.role, Operation::ListUsers)?;

    let users = sqlx::query_as::<_, PublicUser>(&format!(
        "SELECT {PUBLIC_COLUMNS} FROM users ORDER BY created_at DESC"
    ))
    .fetch_all(&state.pool)
    .await?;

    Ok(success(users, "Users retrieved").into_response())
}

pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    if requester.id != id {
        auth::authorize(requester.role, Operation::ViewUser)?;
    }

    let user = sqlx::query_as::<_, PublicUser>(&format!(
        "SELECT {PUBLIC_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(success(user, "User retrieved").into_response())
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<Response, AppError> {
    auth::authorize(requester.role, Operation::CreateUser)?;

    let role = Role::parse(&req.role)
        .ok_or_else(|| AppError::ValidationError("Invalid role".to_string()))?;

    // Organizers may only provision entrance staff for their events.
    if requester.role == Role::Organizer && role != Role::Staff {
        return Err(AppError::Forbidden(
            "Organizers may only create staff accounts".to_string(),
        ));
    }

    if req.name.trim().is_empty() || req.username.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Name and username are required".to_string(),
        ));
    }
    if req.password.len() < 6 {
        return Err(AppError::ValidationError(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 OR username = $2)",
    )
    .bind(&req.email)
    .bind(&req.username)
    .fetch_one(&state.pool)
    .await?;

    if exists {
        return Err(AppError::Conflict(
            "Email or username is already registered".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = sqlx::query_as::<_, PublicUser>(&format!(
        "INSERT INTO users (name, username, email, password_hash, role) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {PUBLIC_COLUMNS}"
    ))
    .bind(req.name.trim())
    .bind(req.username.trim())
    .bind(&req.email)
    .bind(&password_hash)
    .bind(role)
    .fetch_one(&state.pool)
    .await?;

    Ok(created(user, "User created").into_response())
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Response, AppError> {
    if requester.id != id {
        auth::authorize(requester.role, Operation::UpdateUser)?;
    }

    // Role changes are an admin-only mutation even on one's own account.
    let role = match &req.role {
        None => None,
        Some(value) => {
            if requester.role != Role::Admin {
                return Err(AppError::Forbidden(
                    "You do not have permission to change roles".to_string(),
                ));
            }
            Some(
                Role::parse(value)
                    .ok_or_else(|| AppError::ValidationError("Invalid role".to_string()))?,
            )
        }
    };

    if let Some(email) = &req.email {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2)",
        )
        .bind(email)
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

        if taken {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }
    }

    let password_hash = match &req.password {
        None => None,
        Some(plain) => {
            if plain.len() < 6 {
                return Err(AppError::ValidationError(
                    "Password must be at least 6 characters".to_string(),
                ));
            }
            Some(password::hash_password(plain)?)
        }
    };

    let user = sqlx::query_as::<_, PublicUser>(&format!(
        "UPDATE users SET \
            name = COALESCE($2, name), \
            email = COALESCE($3, email), \
            password_hash = COALESCE($4, password_hash), \
            role = COALESCE($5, role) \
         WHERE id = $1 RETURNING {PUBLIC_COLUMNS}"
    ))
    .bind(id)
    .bind(req.name.as_deref())
    .bind(req.email.as_deref())
    .bind(password_hash.as_deref())
    .bind(role)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(success(user, "User updated").into_response())
}

pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(requester): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    auth::authorize(requester.role, Operation::DeleteUser)?;

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                AppError::Conflict(
                    "User has purchases or validations on record".to_string(),
                )
            }
            _ => AppError::from(e),
        })?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(empty_success("User deleted").into_response())
}
