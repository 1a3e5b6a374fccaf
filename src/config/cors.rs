use axum::http::{header, HeaderValue, Method};
use std::env;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEV_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

fn allowed_origins() -> AllowOrigin {
    let configured =
        env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| DEV_ORIGINS.to_string());

    let mut origins = parse_origins(&configured);
    // A wildcard origin is rejected by the CORS layer when credentials are
    // allowed, so an all-invalid list falls back to the dev origins instead.
    if origins.is_empty() {
        tracing::warn!("No valid CORS origins configured, falling back to dev origins");
        origins = parse_origins(DEV_ORIGINS);
    }

    AllowOrigin::list(origins)
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_origins_parse_as_header_values() {
        assert_eq!(parse_origins(DEV_ORIGINS).len(), 2);
    }

    #[test]
    fn invalid_origins_are_dropped() {
        assert!(parse_origins("not a header\u{7f}, ,").is_empty());
        assert_eq!(parse_origins("http://a.example,\u{7f}bad").len(), 1);
    }
}
