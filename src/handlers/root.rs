use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::api::AppState;
use crate::error::ApiError;

/// GET / - service description and endpoint map
pub async fn home() -> Json<Value> {
    Json(json!({
        "name": "clientdb",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Client directory API: clients, the services billed to them and their contacts",
        "endpoints": {
            "health": "/health",
            "clients": "/api/clients[/:id]",
            "services": "/api/services[/:id]",
            "attach": "/api/services/:id/attach",
            "contacts": "/api/contacts[/:id]",
        }
    }))
}

/// GET /health - 200 when the store answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let uptime_secs = state.started_at.elapsed().map(|d| d.as_secs()).unwrap_or(0);

    match state.store.ping().await {
        Ok(()) => Ok(Json(json!({
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "uptime_secs": uptime_secs,
            "database": "ok",
        }))),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err(ApiError::service_unavailable("database unavailable"))
        }
    }
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

#[cfg(test)]
mod tests {
    use crate::testing::TestContext;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn home_and_health() {
        let ctx = TestContext::new().await;

        let home = ctx.get("/").await;
        assert_eq!(home.status, StatusCode::OK);
        assert_eq!(home.body["name"], "clientdb");

        let health = ctx.get("/health").await;
        assert_eq!(health.status, StatusCode::OK);
        assert_eq!(health.body["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let ctx = TestContext::new().await;
        let response = ctx.get("/api/nothing-here").await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.text(), "Route not found");
    }
}
