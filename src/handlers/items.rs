use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};

use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::items::{CreateItemInput, UpdateItemInput};

/// Create an item
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .items
        .create(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(created))
}

/// List items
pub async fn list_items(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (models, total) = state
        .services
        .items
        .list(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        models,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Get an item by id
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let model = state
        .services
        .items
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Item {} not found", id)))?;

    Ok(success_response(model))
}

/// Update an item
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .items
        .update(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(updated))
}

/// Delete an item
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .items
        .delete(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Items at or below their reorder level
pub async fn get_reorder_alerts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .services
        .items
        .reorder_alerts()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(items))
}

/// Cheapest packaging type that fits the item
pub async fn suggest_packaging(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestion = state
        .services
        .items
        .suggest_packaging(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(suggestion))
}
