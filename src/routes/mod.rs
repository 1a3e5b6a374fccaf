use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer};
use crate::handlers::{self, auth, dashboard, events, tickets, users};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let include_hsts = state.config.production;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/events", event_routes())
        .nest("/tickets", ticket_routes())
        .nest("/dashboard", dashboard_routes())
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            apply_security_headers(include_hsts, req, next)
        }))
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route(
            "/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
}

fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(tickets::create_ticket_type))
        .route("/event/:event_id", get(tickets::list_ticket_types_by_event))
        .route("/event/:event_id/logs", get(tickets::access_logs_by_event))
        .route(
            "/:id",
            put(tickets::update_ticket_type).delete(tickets::delete_ticket_type),
        )
        .route("/buy", post(tickets::buy_tickets))
        .route("/validate", post(tickets::validate_ticket))
        .route("/my-tickets", get(tickets::my_tickets))
        // historical alias kept for older clients
        .route("/user", get(tickets::my_tickets))
        .route("/qr/:qr_code", get(tickets::get_ticket_by_qr))
}

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/stats/organizer", get(dashboard::organizer_stats))
        .route("/:event_id", get(dashboard::event_dashboard))
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::config::Config;

    // Router construction panics on overlapping or malformed paths, so
    // assembling the full table (including the `/tickets/user` alias) is
    // itself the assertion. The pool connects lazily; no database needed.
    #[tokio::test]
    async fn route_table_builds() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/entrada")
            .unwrap();
        let config = Config {
            database_url: "postgres://localhost/entrada".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: "test-secret".to_string(),
            max_connections: 1,
            production: false,
        };

        let _router = create_routes(AppState::new(pool, config));
    }
}
