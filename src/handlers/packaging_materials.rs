use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::packaging_materials::{CreateMaterialInput, UpdateMaterialInput};

#[derive(Debug, Deserialize)]
pub struct CostFilterQuery {
    pub min_cost: Option<Decimal>,
    pub max_cost: Option<Decimal>,
}

/// Create a packaging material
pub async fn create_material(
    State(state): State<AppState>,
    Json(payload): Json<CreateMaterialInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .materials
        .create(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(created))
}

/// List packaging materials
pub async fn list_materials(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (models, total) = state
        .services
        .materials
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

/// Get a packaging material by id
pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let model = state
        .services
        .materials
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Packaging material {} not found", id)))?;

    Ok(success_response(model))
}

/// Update a packaging material
pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateMaterialInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .materials
        .update(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(updated))
}

/// Delete a packaging material
pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .materials
        .delete(id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Materials inside a cost band, annotated with remaining stock value
pub async fn filter_by_cost(
    State(state): State<AppState>,
    Query(query): Query<CostFilterQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let materials = state
        .services
        .materials
        .filter_by_cost(query.min_cost, query.max_cost)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(materials))
}

/// Inventory-wide material statistics
pub async fn get_statistics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .services
        .materials
        .statistics()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(stats))
}

/// Per-material usage report
pub async fn get_usage_report(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .materials
        .usage_report()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(report))
}
