use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::token;
use crate::models::User;
use crate::state::AppState;
use crate::utils::error::AppError;

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header. The user row is re-read on every request so deleted accounts
/// and role changes take effect immediately.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::AuthError("Malformed authorization header".to_string()))?;

        let claims = token::verify_token(token, &state.config.jwt_secret)?;

        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, username, email, password_hash, role, created_at \
             FROM users WHERE id = $1",
        )
        .bind(claims.sub)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))?;

        Ok(CurrentUser(user))
    }
}
