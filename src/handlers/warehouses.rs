use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::warehouses::{CreateWarehouseInput, UpdateWarehouseInput};

#[derive(Debug, Deserialize, Validate)]
pub struct AllocateMaterialsRequest {
    pub warehouse_id: i64,
    pub material_id: i64,
    pub quantity: Decimal,
}

/// Create a warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    Json(payload): Json<CreateWarehouseInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .warehouses
        .create(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(created))
}

/// List warehouses
pub async fn list_warehouses(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (models, total) = state
        .services
        .warehouses
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

/// Get a warehouse by id
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let model = state
        .services
        .warehouses
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Warehouse {} not found", id)))?;

    Ok(success_response(model))
}

/// Update a warehouse
pub async fn update_warehouse(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateWarehouseInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .warehouses
        .update(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(updated))
}

/// Delete a warehouse
pub async fn delete_warehouse(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .warehouses
        .delete(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Capacity overview across all warehouses
pub async fn get_overview(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let overview = state
        .services
        .warehouses
        .overview()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(
        serde_json::json!({ "warehouses_overview": overview }),
    ))
}

/// Allocate material stock into a warehouse
pub async fn allocate_materials(
    State(state): State<AppState>,
    Json(payload): Json<AllocateMaterialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let outcome = state
        .services
        .warehouses
        .allocate_materials(payload.warehouse_id, payload.material_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "message": "Materials allocated successfully",
        "remaining_material_quantity": outcome.remaining_material_quantity,
        "remaining_warehouse_capacity": outcome.remaining_warehouse_capacity,
    })))
}
