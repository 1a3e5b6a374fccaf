pub mod auth;
pub mod dashboard;
pub mod events;
pub mod tickets;
pub mod users;

use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::utils::response::success;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn root() -> Response {
    success(
        serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }),
        "Entrada API",
    )
    .into_response()
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "entrada-api",
    };

    success(payload, "Health check successful").into_response()
}
