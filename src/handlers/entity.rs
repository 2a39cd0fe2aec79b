//! CRUD handlers shared by every entity type; routes pick the type with a
//! turbofish, e.g. `entity::list::<Client>`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use crate::api::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::Entity;

use super::{parse_filter, parse_id, ListQuery};

/// GET /api/{collection}[?filter=<json>] - matching entities with
/// relationships, count in `X-Total-Count`
pub async fn list<E: Entity>(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<E::Response>> {
    let filter = parse_filter(query.filter.as_deref())?;
    let items = state.repository::<E>().list(filter).await?;
    Ok(ApiResponse::list(items))
}

/// GET /api/{collection}/:id
pub async fn get<E: Entity>(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<E::Response> {
    let id = parse_id(&id)?;
    let item = state.repository::<E>().get(id).await?;
    Ok(ApiResponse::success(item))
}

/// POST /api/{collection} - 201 with the new identifier as body
pub async fn create<E: Entity>(
    State(state): State<AppState>,
    payload: Result<Json<E>, JsonRejection>,
) -> ApiResult<Uuid> {
    let Json(entity) = payload?;
    let id = state.repository::<E>().create(entity).await?;
    Ok(ApiResponse::created(id))
}

/// PUT|PATCH /api/{collection}/:id - full replace
pub async fn update<E: Entity>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<E>, JsonRejection>,
) -> ApiResult<E::Response> {
    let id = parse_id(&id)?;
    let Json(entity) = payload?;
    let item = state.repository::<E>().update(id, entity).await?;
    Ok(ApiResponse::success(item))
}

/// DELETE /api/{collection}/:id
pub async fn delete<E: Entity>(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<String> {
    let id = parse_id(&id)?;
    state.repository::<E>().delete(id).await?;
    Ok(ApiResponse::success(format!("{} deleted, id: {}", E::KIND, id)))
}
