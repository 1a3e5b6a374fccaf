use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{password, token, CurrentUser};
use crate::models::{PublicUser, Role, User};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Email or username; `email`/`username` kept as aliases for older
    /// clients.
    pub identifier: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: String,
}

#[derive(Serialize)]
struct AuthPayload {
    token: String,
    user: PublicUser,
    role: Role,
}

fn validate_registration(req: &RegisterRequest) -> Result<Role, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::ValidationError("Name is required".to_string()));
    }
    if req.username.trim().len() < 3 || !req.username.chars().all(char::is_alphanumeric) {
        return Err(AppError::ValidationError(
            "Username must be at least 3 alphanumeric characters".to_string(),
        ));
    }
    if !req.email.contains('@') {
        return Err(AppError::ValidationError(
            "A valid email is required".to_string(),
        ));
    }
    if req.password.len() < 6 {
        return Err(AppError::ValidationError(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let role = match req.role.as_deref() {
        None => Role::Attendee,
        Some(value) => Role::parse(value)
            .ok_or_else(|| AppError::ValidationError("Invalid role".to_string()))?,
    };

    // Admin accounts are provisioned by an existing admin, never
    // self-registered.
    if role == Role::Admin {
        return Err(AppError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    Ok(role)
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let role = validate_registration(&req)?;

    let taken = sqlx::query_scalar::<_, String>(
        "SELECT CASE WHEN email = $1 THEN 'email' ELSE 'username' END \
         FROM users WHERE email = $1 OR username = $2 LIMIT 1",
    )
    .bind(&req.email)
    .bind(&req.username)
    .fetch_optional(&state.pool)
    .await?;

    match taken.as_deref() {
        Some("email") => {
            return Err(AppError::Conflict("Email is already registered".to_string()))
        }
        Some(_) => {
            return Err(AppError::Conflict("Username is already taken".to_string()))
        }
        None => {}
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (name, username, email, password_hash, role) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, name, username, email, password_hash, role, created_at",
    )
    .bind(req.name.trim())
    .bind(req.username.trim())
    .bind(&req.email)
    .bind(&password_hash)
    .bind(role)
    .fetch_one(&state.pool)
    .await?;

    let token = token::issue_token(user.id, &user.username, user.role, &state.config.jwt_secret)?;
    let role = user.role;

    Ok(created(
        AuthPayload {
            token,
            user: user.into(),
            role,
        },
        "User registered successfully",
    )
    .into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let identifier = req
        .identifier
        .or(req.email)
        .or(req.username)
        .ok_or_else(|| AppError::ValidationError("Email or username is required".to_string()))?;

    if req.password.is_empty() {
        return Err(AppError::ValidationError("Password is required".to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, username, email, password_hash, role, created_at \
         FROM users WHERE email = $1 OR username = $1",
    )
    .bind(&identifier)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::AuthError("Invalid credentials".to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = token::issue_token(user.id, &user.username, user.role, &state.config.jwt_secret)?;
    let role = user.role;

    Ok(success(
        AuthPayload {
            token,
            user: user.into(),
            role,
        },
        "Login successful",
    )
    .into_response())
}

/// Tokens are stateless; logout exists so clients have a uniform endpoint
/// to call while discarding their copy.
pub async fn logout(_user: CurrentUser) -> Response {
    empty_success("Logged out").into_response()
}

pub async fn me(CurrentUser(user): CurrentUser) -> Response {
    success(PublicUser::from(user), "Authenticated user").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            name: "Ana".to_string(),
            username: "ana42".to_string(),
            email: "ana@example.com".to_string(),
            password: "secret-password".to_string(),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn defaults_to_attendee() {
        assert_eq!(validate_registration(&request(None)).unwrap(), Role::Attendee);
    }

    #[test]
    fn rejects_admin_self_registration() {
        assert!(validate_registration(&request(Some("admin"))).is_err());
    }

    #[test]
    fn accepts_staff_and_organizer() {
        assert_eq!(
            validate_registration(&request(Some("staff"))).unwrap(),
            Role::Staff
        );
        assert_eq!(
            validate_registration(&request(Some("organizer"))).unwrap(),
            Role::Organizer
        );
    }

    #[test]
    fn rejects_short_password_and_bad_username() {
        let mut req = request(None);
        req.password = "12345".to_string();
        assert!(validate_registration(&req).is_err());

        let mut req = request(None);
        req.username = "a!".to_string();
        assert!(validate_registration(&req).is_err());
    }
}
