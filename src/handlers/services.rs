use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;

use crate::api::AppState;
use crate::database::RepositoryError;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::{ClientRef, Entity, Service, ServiceResponse};

use super::parse_id;

/// POST /api/services/:id/attach - append a client back-reference.
///
/// The service is looked up before the body is parsed, so an unknown
/// service is a 404 whatever the payload. The append itself is atomic in
/// the store; a service deleted in between still comes back as 404.
pub async fn attach(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ClientRef>, JsonRejection>,
) -> ApiResult<ServiceResponse> {
    let id = parse_id(&id)?;
    let repository = state.repository::<Service>();
    if !repository.exists(id).await? {
        return Err(RepositoryError::NotFound { kind: Service::KIND, id }.into());
    }

    let Json(client) = payload.map_err(|rejection| {
        tracing::warn!(%id, "Invalid client reference: {}", rejection.body_text());
        ApiError::validation_error(format!("Invalid client reference: {}", rejection.body_text()))
    })?;

    let updated = repository.attach_client(id, client).await?;
    Ok(ApiResponse::success(updated))
}
