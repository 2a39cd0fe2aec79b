use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{entity, root, services};
use crate::middleware::TOTAL_COUNT_HEADER;
use crate::models::{Client, Contact, Service};

use super::AppState;

pub fn router(state: AppState, config: &ApiConfig) -> Router {
    let app = Router::new()
        // Public
        .route("/", get(root::home))
        .route("/health", get(root::health))
        .merge(client_routes())
        .merge(service_routes())
        .merge(contact_routes())
        .fallback(root::not_found)
        .with_state(state)
        .layer(cors_layer(config));

    if config.enable_request_logging {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}

fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(entity::list::<Client>).post(entity::create::<Client>))
        .route(
            "/api/clients/:id",
            get(entity::get::<Client>)
                .put(entity::update::<Client>)
                .patch(entity::update::<Client>)
                .delete(entity::delete::<Client>),
        )
}

fn service_routes() -> Router<AppState> {
    Router::new()
        .route("/api/services", get(entity::list::<Service>).post(entity::create::<Service>))
        .route(
            "/api/services/:id",
            get(entity::get::<Service>)
                .put(entity::update::<Service>)
                .patch(entity::update::<Service>)
                .delete(entity::delete::<Service>),
        )
        .route("/api/services/:id/attach", post(services::attach))
}

fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/api/contacts", get(entity::list::<Contact>).post(entity::create::<Contact>))
        .route(
            "/api/contacts/:id",
            get(entity::get::<Contact>)
                .put(entity::update::<Contact>)
                .patch(entity::update::<Contact>)
                .delete(entity::delete::<Contact>),
        )
}

/// Mirrors the caller's origin unless an explicit list is configured
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origin = if config.cors_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            config
                .cors_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true)
        .expose_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(TOTAL_COUNT_HEADER),
        ])
}
