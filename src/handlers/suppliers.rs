use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::errors::ApiError;
use crate::handlers::AppState;
use crate::services::suppliers::{CreateSupplierInput, MaterialRequestLine};

#[derive(Debug, Deserialize, Validate)]
pub struct AttachMaterialsRequest {
    pub packaging_material_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MaterialRequestPayload {
    pub material_requests: Vec<MaterialRequestLine>,
}

/// Create a supplier, optionally linked to the materials it provides
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(payload): Json<CreateSupplierInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let created = state
        .services
        .suppliers
        .create(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(created))
}

/// List suppliers
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (models, total) = state
        .services
        .suppliers
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

/// Get a supplier by id
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let model = state
        .services
        .suppliers
        .get(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Supplier {} not found", id)))?;

    Ok(success_response(model))
}

/// Link additional materials to a supplier
pub async fn attach_materials(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AttachMaterialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    state
        .services
        .suppliers
        .attach_materials(id, payload.packaging_material_ids)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "message": "Packaging materials integrated successfully with supplier",
    })))
}

/// Ask a supplier about availability of requested materials
pub async fn request_materials(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<MaterialRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let outcomes = state
        .services
        .suppliers
        .request_materials(id, payload.material_requests)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "message": "Material request processed successfully",
        "data": outcomes,
    })))
}
